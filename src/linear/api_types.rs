//! Serde-deserializable types matching Linear GraphQL responses.
//!
//! Linear wraps every reply in a `{ data, errors }` envelope and every list in
//! a `{ nodes }` connection. Both are unwrapped here and each node converts
//! into its record in `types`.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::remote::RemoteError;
use super::types::{Comment, Issue, Named, Team, User, WorkflowState};

// ============================================================================
// Envelope
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct GraphQlResponse<T> {
  pub data: Option<T>,
  #[serde(default)]
  pub errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
pub struct GraphQlError {
  pub message: String,
  #[serde(default)]
  pub extensions: Option<GraphQlErrorExtensions>,
}

#[derive(Debug, Deserialize)]
pub struct GraphQlErrorExtensions {
  pub code: Option<String>,
  #[serde(rename = "type")]
  pub error_type: Option<String>,
}

impl<T> GraphQlResponse<T> {
  /// Turn an `errors` array into a [`RemoteError`], or return `data`.
  pub fn into_data(self) -> Result<T, RemoteError> {
    if !self.errors.is_empty() {
      return Err(RemoteError::GraphQl {
        message: error_message(&self.errors),
        codes: error_codes(&self.errors),
      });
    }

    self.data.ok_or_else(|| RemoteError::GraphQl {
      message: "response contained neither data nor errors".into(),
      codes: Vec::new(),
    })
  }
}

/// All error messages, joined with `; `.
pub fn error_message(errors: &[GraphQlError]) -> String {
  errors
    .iter()
    .map(|e| e.message.as_str())
    .collect::<Vec<_>>()
    .join("; ")
}

/// Every `extensions.code` and `extensions.type` present, in order.
pub fn error_codes(errors: &[GraphQlError]) -> Vec<String> {
  errors
    .iter()
    .filter_map(|e| e.extensions.as_ref())
    .flat_map(|ext| [ext.code.clone(), ext.error_type.clone()])
    .flatten()
    .collect()
}

/// `{ nodes: [...] }` connection wrapper.
#[derive(Debug, Deserialize)]
pub struct Connection<T> {
  #[serde(default = "Vec::new")]
  pub nodes: Vec<T>,
}

// ============================================================================
// Nodes
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiUser {
  pub id: String,
  pub name: String,
  #[serde(default)]
  pub email: String,
  pub display_name: Option<String>,
}

impl From<ApiUser> for User {
  fn from(u: ApiUser) -> Self {
    User {
      id: u.id,
      name: u.name,
      email: u.email,
      display_name: u.display_name,
    }
  }
}

#[derive(Debug, Deserialize)]
pub struct ApiTeam {
  pub id: String,
  pub name: String,
  pub key: String,
}

impl From<ApiTeam> for Team {
  fn from(t: ApiTeam) -> Self {
    Team {
      id: t.id,
      name: t.name,
      key: t.key,
    }
  }
}

#[derive(Debug, Deserialize)]
pub struct ApiNamed {
  pub id: String,
  pub name: String,
}

impl From<ApiNamed> for Named {
  fn from(n: ApiNamed) -> Self {
    Named {
      id: n.id,
      name: n.name,
    }
  }
}

#[derive(Debug, Deserialize)]
pub struct ApiWorkflowState {
  pub id: String,
  pub name: String,
  #[serde(rename = "type")]
  pub state_type: String,
  pub color: Option<String>,
  pub position: Option<f64>,
}

impl From<ApiWorkflowState> for WorkflowState {
  fn from(s: ApiWorkflowState) -> Self {
    WorkflowState {
      id: s.id,
      name: s.name,
      state_type: s.state_type,
      color: s.color,
      position: s.position,
    }
  }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiIssue {
  pub id: String,
  pub identifier: String,
  pub title: String,
  pub description: Option<String>,
  // Linear reports priority as a float (0.0 - 4.0)
  #[serde(default)]
  pub priority: f64,
  #[serde(default)]
  pub url: String,
  pub state: Option<ApiNamed>,
  pub team: Option<ApiTeam>,
  pub assignee: Option<ApiNamed>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl From<ApiIssue> for Issue {
  fn from(i: ApiIssue) -> Self {
    Issue {
      id: i.id,
      identifier: i.identifier,
      title: i.title,
      description: i.description,
      priority: i.priority.clamp(0.0, 4.0) as u8,
      url: i.url,
      state: i.state.map(Named::from),
      team: i.team.map(Team::from),
      assignee: i.assignee.map(Named::from),
      created_at: i.created_at,
      updated_at: i.updated_at,
    }
  }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiComment {
  pub id: String,
  pub body: String,
  pub created_at: DateTime<Utc>,
  pub user: Option<ApiNamed>,
}

impl From<ApiComment> for Comment {
  fn from(c: ApiComment) -> Self {
    Comment {
      id: c.id,
      body: c.body,
      created_at: c.created_at,
      user: c.user.map(Named::from),
    }
  }
}

// ============================================================================
// Query / mutation payloads
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ViewerData {
  pub viewer: ApiUser,
}

#[derive(Debug, Deserialize)]
pub struct TeamsData {
  pub teams: Connection<ApiTeam>,
}

#[derive(Debug, Deserialize)]
pub struct TeamData {
  pub team: Option<ApiTeam>,
}

#[derive(Debug, Deserialize)]
pub struct TeamStatesData {
  pub team: Option<TeamWithStates>,
}

#[derive(Debug, Deserialize)]
pub struct TeamWithStates {
  pub states: Connection<ApiWorkflowState>,
}

#[derive(Debug, Deserialize)]
pub struct IssuesData {
  pub issues: Connection<ApiIssue>,
}

#[derive(Debug, Deserialize)]
pub struct IssueData {
  pub issue: Option<ApiIssue>,
}

#[derive(Debug, Deserialize)]
pub struct IssuePayload {
  pub issue: Option<ApiIssue>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueCreateData {
  pub issue_create: IssuePayload,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueUpdateData {
  pub issue_update: IssuePayload,
}

#[derive(Debug, Deserialize)]
pub struct CommentPayload {
  pub comment: Option<ApiComment>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentCreateData {
  pub comment_create: CommentPayload,
}
