//! The capability the facade is built on: one async call per remote
//! operation, plus the error type those calls fail with.

use async_trait::async_trait;
use thiserror::Error;

use super::error::ClientErrorKind;
use super::types::{
  Comment, Issue, IssueCreateInput, IssueFilter, IssueUpdateInput, Team, User, WorkflowState,
};
use crate::resilience::Retryable;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Failure reported by a [`LinearApi`] implementation.
#[derive(Debug, Error)]
pub enum RemoteError {
  /// Non-success HTTP status.
  #[error("HTTP {status}: {message}")]
  Status {
    status: u16,
    message: String,
    /// GraphQL error codes found in the body, when it had any
    codes: Vec<String>,
  },

  /// The GraphQL response carried an `errors` array.
  #[error("Linear API error: {message}")]
  GraphQl {
    message: String,
    /// `extensions.code` / `extensions.type` of each error, when present
    codes: Vec<String>,
  },

  /// A required entity does not exist on the remote side.
  #[error("not found: {0}")]
  NotFound(String),

  /// Transport failure: DNS, connect, TLS, timeout.
  #[error("HTTP error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("serialization error: {0}")]
  Serde(#[from] serde_json::Error),
}

impl RemoteError {
  /// Classify the error as a client-side failure that retrying cannot fix.
  pub fn client_kind(&self) -> Option<ClientErrorKind> {
    match self {
      // Only a 4xx can be a client error; the body text never decides.
      RemoteError::Status { status, codes, .. } => {
        if !(400..500).contains(status) || has_transient_code(codes) {
          return None;
        }
        codes
          .iter()
          .find_map(|code| ClientErrorKind::from_code(code))
          .or_else(|| ClientErrorKind::from_status(*status))
      }
      RemoteError::GraphQl { message, codes } => {
        if has_transient_code(codes) {
          return None;
        }
        codes
          .iter()
          .find_map(|code| ClientErrorKind::from_code(code))
          .or_else(|| ClientErrorKind::from_message(message))
      }
      RemoteError::NotFound(_) => Some(ClientErrorKind::NotFound),
      RemoteError::Http(e) => e.status().and_then(|s| ClientErrorKind::from_status(s.as_u16())),
      RemoteError::Serde(_) => None,
    }
  }

  pub fn is_client_error(&self) -> bool {
    self.client_kind().is_some()
  }
}

fn has_transient_code(codes: &[String]) -> bool {
  codes.iter().any(|code| ClientErrorKind::is_transient_code(code))
}

impl Retryable for RemoteError {
  fn is_retryable(&self) -> bool {
    !self.is_client_error()
  }
}

// ---------------------------------------------------------------------------
// Capability
// ---------------------------------------------------------------------------

pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

/// Raw access to the issue tracker. Implementations perform exactly one
/// remote round trip per call and apply no caching, throttling or retry.
#[async_trait]
pub trait LinearApi: Send + Sync {
  async fn list_teams(&self) -> RemoteResult<Vec<Team>>;

  async fn list_issues(&self, filter: &IssueFilter, limit: u32) -> RemoteResult<Vec<Issue>>;

  async fn get_issue(&self, id: &str) -> RemoteResult<Option<Issue>>;

  async fn create_issue(&self, input: &IssueCreateInput) -> RemoteResult<Option<Issue>>;

  async fn update_issue(&self, id: &str, input: &IssueUpdateInput) -> RemoteResult<Option<Issue>>;

  async fn get_team(&self, id: &str) -> RemoteResult<Option<Team>>;

  async fn list_team_workflow_states(&self, team_id: &str) -> RemoteResult<Vec<WorkflowState>>;

  async fn create_comment(&self, issue_id: &str, body: &str) -> RemoteResult<Option<Comment>>;

  async fn get_current_user(&self) -> RemoteResult<User>;
}

// ---------------------------------------------------------------------------
// Recording mock
// ---------------------------------------------------------------------------

#[cfg(test)]
pub mod mock {
  //! In-memory [`LinearApi`] that counts calls, captures inputs and replays
  //! scripted failures.

  use std::collections::{HashMap, VecDeque};
  use std::sync::Mutex;

  use async_trait::async_trait;
  use chrono::{TimeZone, Utc};
  use tokio::time::Instant;

  use super::*;
  use crate::linear::types::Named;

  #[derive(Default)]
  struct State {
    viewer: Option<User>,
    teams: Vec<Team>,
    issues: HashMap<String, Issue>,
    states: HashMap<String, Vec<WorkflowState>>,
    comments_return_nothing: bool,
    calls: HashMap<&'static str, u32>,
    starts: Vec<Instant>,
    failures: HashMap<&'static str, VecDeque<RemoteError>>,
    searches: Vec<(serde_json::Value, u32)>,
    created: Vec<serde_json::Value>,
    updated: Vec<(String, serde_json::Value)>,
  }

  #[derive(Default)]
  pub struct MockLinear {
    state: Mutex<State>,
  }

  pub fn user(id: &str) -> User {
    User {
      id: id.to_string(),
      name: format!("User {}", id),
      email: format!("{}@example.com", id),
      display_name: None,
    }
  }

  pub fn team(id: &str, key: &str) -> Team {
    Team {
      id: id.to_string(),
      name: format!("Team {}", key),
      key: key.to_string(),
    }
  }

  pub fn issue(id: &str) -> Issue {
    let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    Issue {
      id: id.to_string(),
      identifier: format!("ENG-{}", id),
      title: format!("Issue {}", id),
      description: None,
      priority: 0,
      url: format!("https://linear.app/eng/issue/ENG-{}", id),
      state: Some(Named {
        id: "s-todo".into(),
        name: "Todo".into(),
      }),
      team: None,
      assignee: None,
      created_at: at,
      updated_at: at,
    }
  }

  pub fn workflow_state(id: &str, name: &str) -> WorkflowState {
    WorkflowState {
      id: id.to_string(),
      name: name.to_string(),
      state_type: "unstarted".into(),
      color: None,
      position: None,
    }
  }

  impl MockLinear {
    pub fn new() -> Self {
      Self::default()
    }

    pub fn with_viewer(self, viewer: User) -> Self {
      self.state.lock().unwrap().viewer = Some(viewer);
      self
    }

    pub fn with_teams(self, teams: Vec<Team>) -> Self {
      self.state.lock().unwrap().teams = teams;
      self
    }

    pub fn with_issue(self, issue: Issue) -> Self {
      self
        .state
        .lock()
        .unwrap()
        .issues
        .insert(issue.id.clone(), issue);
      self
    }

    pub fn with_states(self, team_id: &str, states: Vec<WorkflowState>) -> Self {
      self
        .state
        .lock()
        .unwrap()
        .states
        .insert(team_id.to_string(), states);
      self
    }

    pub fn comments_return_nothing(self) -> Self {
      self.state.lock().unwrap().comments_return_nothing = true;
      self
    }

    /// Queue errors for `method`; each call pops one until the queue is empty.
    pub fn fail(&self, method: &'static str, errors: Vec<RemoteError>) {
      self
        .state
        .lock()
        .unwrap()
        .failures
        .entry(method)
        .or_default()
        .extend(errors);
    }

    pub fn calls(&self, method: &str) -> u32 {
      self
        .state
        .lock()
        .unwrap()
        .calls
        .get(method)
        .copied()
        .unwrap_or(0)
    }

    /// Start instants of every call, in order.
    pub fn starts(&self) -> Vec<Instant> {
      self.state.lock().unwrap().starts.clone()
    }

    pub fn searches(&self) -> Vec<(serde_json::Value, u32)> {
      self.state.lock().unwrap().searches.clone()
    }

    pub fn created(&self) -> Vec<serde_json::Value> {
      self.state.lock().unwrap().created.clone()
    }

    pub fn updated(&self) -> Vec<(String, serde_json::Value)> {
      self.state.lock().unwrap().updated.clone()
    }

    fn record(&self, method: &'static str) -> RemoteResult<()> {
      let mut state = self.state.lock().unwrap();
      *state.calls.entry(method).or_insert(0) += 1;
      state.starts.push(Instant::now());
      match state.failures.get_mut(method).and_then(VecDeque::pop_front) {
        Some(e) => Err(e),
        None => Ok(()),
      }
    }
  }

  #[async_trait]
  impl LinearApi for MockLinear {
    async fn list_teams(&self) -> RemoteResult<Vec<Team>> {
      self.record("list_teams")?;
      Ok(self.state.lock().unwrap().teams.clone())
    }

    async fn list_issues(&self, filter: &IssueFilter, limit: u32) -> RemoteResult<Vec<Issue>> {
      self.record("list_issues")?;
      let mut state = self.state.lock().unwrap();
      state.searches.push((serde_json::to_value(filter)?, limit));
      Ok(
        state
          .issues
          .values()
          .take(limit as usize)
          .cloned()
          .collect(),
      )
    }

    async fn get_issue(&self, id: &str) -> RemoteResult<Option<Issue>> {
      self.record("get_issue")?;
      Ok(self.state.lock().unwrap().issues.get(id).cloned())
    }

    async fn create_issue(&self, input: &IssueCreateInput) -> RemoteResult<Option<Issue>> {
      self.record("create_issue")?;
      let mut state = self.state.lock().unwrap();
      state.created.push(serde_json::to_value(input)?);
      let mut created = issue(&format!("new-{}", state.created.len()));
      created.title = input.title.clone();
      Ok(Some(created))
    }

    async fn update_issue(&self, id: &str, input: &IssueUpdateInput) -> RemoteResult<Option<Issue>> {
      self.record("update_issue")?;
      let mut state = self.state.lock().unwrap();
      state
        .updated
        .push((id.to_string(), serde_json::to_value(input)?));
      Ok(state.issues.get(id).cloned())
    }

    async fn get_team(&self, id: &str) -> RemoteResult<Option<Team>> {
      self.record("get_team")?;
      Ok(
        self
          .state
          .lock()
          .unwrap()
          .teams
          .iter()
          .find(|t| t.id == id)
          .cloned(),
      )
    }

    async fn list_team_workflow_states(&self, team_id: &str) -> RemoteResult<Vec<WorkflowState>> {
      self.record("list_team_workflow_states")?;
      Ok(
        self
          .state
          .lock()
          .unwrap()
          .states
          .get(team_id)
          .cloned()
          .unwrap_or_default(),
      )
    }

    async fn create_comment(&self, issue_id: &str, body: &str) -> RemoteResult<Option<Comment>> {
      self.record("create_comment")?;
      let state = self.state.lock().unwrap();
      if state.comments_return_nothing {
        return Ok(None);
      }
      Ok(Some(Comment {
        id: format!("c-{}", issue_id),
        body: body.to_string(),
        created_at: Utc::now(),
        user: None,
      }))
    }

    async fn get_current_user(&self) -> RemoteResult<User> {
      self.record("get_current_user")?;
      self
        .state
        .lock()
        .unwrap()
        .viewer
        .clone()
        .ok_or_else(|| RemoteError::Status {
          status: 401,
          message: "authentication required".into(),
          codes: Vec::new(),
        })
    }
  }
}
