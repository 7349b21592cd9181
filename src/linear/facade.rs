//! Resilient client facade over a [`LinearApi`].
//!
//! Read paths go through a shared rate limiter and the retry policy; team
//! lists, workflow states and the current user are cached with per-entity
//! TTLs. The handle is cheap to clone and all clones share state.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, warn};

use crate::cache::{TtlCache, TtlCell};
use crate::config::Config;
use crate::resilience::{RateLimitConfig, RateLimiter, RetryPolicy};

use super::client::LinearClient;
use super::error::{FacadeError, Result};
use super::remote::{LinearApi, RemoteError, RemoteResult};
use super::types::{
  Assignee, Comment, HealthState, HealthStatus, Issue, IssueChanges, IssueCreateInput,
  IssueFilter, IssueUpdateInput, NewIssue, SearchParams, Team, User, WorkflowState,
};

pub const DEFAULT_SEARCH_LIMIT: u32 = 50;
pub const MAX_SEARCH_LIMIT: u32 = 250;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTtls {
  pub viewer: Duration,
  pub teams: Duration,
  pub workflow_states: Duration,
}

impl Default for CacheTtls {
  fn default() -> Self {
    Self {
      viewer: Duration::from_secs(5 * 60),
      teams: Duration::from_secs(10 * 60),
      workflow_states: Duration::from_secs(15 * 60),
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FacadeConfig {
  pub rate_limit: RateLimitConfig,
  /// Also throttle issue mutations and viewer lookups, not only reads.
  pub limit_all_calls: bool,
  pub retry: RetryPolicy,
  pub ttls: CacheTtls,
}

impl Default for FacadeConfig {
  fn default() -> Self {
    Self {
      rate_limit: RateLimitConfig::default(),
      limit_all_calls: true,
      retry: RetryPolicy::default(),
      ttls: CacheTtls::default(),
    }
  }
}

/// Which limiter policy applies to a call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Throttle {
  /// Read endpoints, comments and health checks
  Always,
  /// Issue mutations and viewer lookups, throttled when `limit_all_calls`
  Uniform,
}

struct Inner {
  remote: Arc<dyn LinearApi>,
  config: FacadeConfig,
  limiter: RateLimiter,
  viewer: TtlCell<User>,
  teams: TtlCell<Vec<Team>>,
  workflow_states: TtlCache<String, Vec<WorkflowState>>,
}

/// Shared entry point for every tracker operation.
#[derive(Clone)]
pub struct ResilientClient {
  inner: Arc<Inner>,
}

impl ResilientClient {
  pub fn new(remote: Arc<dyn LinearApi>, config: FacadeConfig) -> Self {
    let limiter = RateLimiter::new(config.rate_limit);
    Self {
      inner: Arc::new(Inner {
        remote,
        config,
        limiter,
        viewer: TtlCell::new(),
        teams: TtlCell::new(),
        workflow_states: TtlCache::new(),
      }),
    }
  }

  /// Build a facade over the Linear GraphQL API described by `config`.
  pub fn from_config(config: &Config, api_key: &str) -> RemoteResult<Self> {
    let remote = LinearClient::new(config.api_url.clone(), api_key)?;
    Ok(Self::new(Arc::new(remote), config.facade_config()))
  }

  /// Forget every cached entity. Limiter history is kept.
  pub fn reset(&self) {
    self.inner.viewer.clear();
    self.inner.teams.clear();
    self.inner.workflow_states.clear();
    debug!("caches cleared");
  }

  /// Rate-limit (per `throttle`), then run `op` under the retry policy and
  /// wrap any failure with `context`.
  async fn call<T, F, Fut>(&self, context: &str, throttle: Throttle, op: F) -> Result<T>
  where
    F: FnMut() -> Fut,
    Fut: Future<Output = RemoteResult<T>>,
  {
    let limited = match throttle {
      Throttle::Always => true,
      Throttle::Uniform => self.inner.config.limit_all_calls,
    };
    if limited {
      self.inner.limiter.acquire().await;
    }

    self
      .inner
      .config
      .retry
      .run(context, op)
      .await
      .map_err(|e| FacadeError::from_remote(context, e))
  }

  fn remote(&self) -> &dyn LinearApi {
    self.inner.remote.as_ref()
  }

  // -- cached reference data ----------------------------------------------

  /// The owner of the API credential.
  pub async fn get_viewer(&self) -> Result<User> {
    if let Some(viewer) = self.inner.viewer.get() {
      debug!("viewer cache hit");
      return Ok(viewer);
    }

    debug!("viewer cache miss");
    let viewer = self
      .call("Failed to get current user", Throttle::Uniform, move || {
        self.remote().get_current_user()
      })
      .await?;
    self
      .inner
      .viewer
      .put(viewer.clone(), self.inner.config.ttls.viewer);
    Ok(viewer)
  }

  pub async fn get_teams(&self) -> Result<Vec<Team>> {
    if let Some(teams) = self.inner.teams.get() {
      debug!(count = teams.len(), "teams cache hit");
      return Ok(teams);
    }

    debug!("teams cache miss");
    let teams = self
      .call("Failed to list teams", Throttle::Always, move || {
        self.remote().list_teams()
      })
      .await?;
    self
      .inner
      .teams
      .put(teams.clone(), self.inner.config.ttls.teams);
    Ok(teams)
  }

  /// Workflow states of one team, cached per team.
  pub async fn get_workflow_states(&self, team_id: &str) -> Result<Vec<WorkflowState>> {
    let key = team_id.to_string();
    if let Some(states) = self.inner.workflow_states.get(&key) {
      debug!(team_id, "workflow states cache hit");
      return Ok(states);
    }

    debug!(team_id, "workflow states cache miss");
    let context = format!("Failed to get workflow states for team {}", team_id);
    let states = self
      .call(&context, Throttle::Always, move || async move {
        if self.remote().get_team(team_id).await?.is_none() {
          return Err(RemoteError::NotFound(format!("team {}", team_id)));
        }
        self.remote().list_team_workflow_states(team_id).await
      })
      .await?;
    self
      .inner
      .workflow_states
      .put(key, states.clone(), self.inner.config.ttls.workflow_states);
    Ok(states)
  }

  /// Map an assignee argument onto the request field: `None` leaves the
  /// field out, `Some(None)` clears it.
  async fn resolve_assignee(&self, assignee: &Assignee) -> Result<Option<Option<String>>> {
    Ok(match assignee {
      Assignee::CurrentUser => Some(Some(self.get_viewer().await?.id)),
      Assignee::ById(id) => Some(Some(id.clone())),
      Assignee::Unassign => Some(None),
      Assignee::Unchanged => None,
    })
  }

  // -- issues -------------------------------------------------------------

  pub async fn search_issues(&self, params: &SearchParams) -> Result<Vec<Issue>> {
    let limit = params
      .limit
      .unwrap_or(DEFAULT_SEARCH_LIMIT)
      .min(MAX_SEARCH_LIMIT);

    let mut filter = IssueFilter::default();
    if let Some(team_id) = &params.team_id {
      filter = filter.team(team_id.as_str());
    }
    if let Some(status) = &params.status {
      filter = filter.state_name(status.as_str());
    }
    if let Some(Some(user_id)) = self.resolve_assignee(&params.assignee).await? {
      filter = filter.assignee(user_id);
    }
    let query = params.query.trim();
    if !query.is_empty() {
      filter = filter.title_contains(query);
    }

    let context = format!(
      "Failed to search issues (query: {:?}, team: {}, status: {})",
      query,
      params.team_id.as_deref().unwrap_or("any"),
      params.status.as_deref().unwrap_or("any"),
    );
    let filter = &filter;
    self
      .call(&context, Throttle::Always, move || {
        self.remote().list_issues(filter, limit)
      })
      .await
  }

  pub async fn get_issue(&self, issue_id: &str) -> Result<Issue> {
    let context = format!("Failed to get issue {}", issue_id);
    self
      .call(&context, Throttle::Always, move || self.remote().get_issue(issue_id))
      .await?
      .ok_or_else(|| {
        FacadeError::from_remote(&context, RemoteError::NotFound(format!("issue {}", issue_id)))
      })
  }

  pub async fn create_issue(&self, new_issue: &NewIssue) -> Result<Issue> {
    let input = IssueCreateInput {
      team_id: new_issue.team_id.clone(),
      title: new_issue.title.clone(),
      description: new_issue.description.clone(),
      assignee_id: self.resolve_assignee(&new_issue.assignee).await?,
      priority: new_issue.priority,
    };

    let context = format!("Failed to create issue in team {}", new_issue.team_id);
    let input = &input;
    self
      .call(&context, Throttle::Uniform, move || self.remote().create_issue(input))
      .await?
      .ok_or_else(|| FacadeError::empty(&context, "no issue returned"))
  }

  pub async fn update_issue(&self, issue_id: &str, changes: &IssueChanges) -> Result<Issue> {
    let input = IssueUpdateInput {
      title: changes.title.clone(),
      description: changes.description.clone(),
      assignee_id: self.resolve_assignee(&changes.assignee).await?,
      priority: changes.priority,
      state_id: changes.state_id.clone(),
    };

    let context = format!("Failed to update issue {}", issue_id);
    let input = &input;
    self
      .call(&context, Throttle::Uniform, move || {
        self.remote().update_issue(issue_id, input)
      })
      .await?
      .ok_or_else(|| FacadeError::empty(&context, "no issue returned"))
  }

  pub async fn add_comment(&self, issue_id: &str, body: &str) -> Result<Comment> {
    let context = format!("Failed to add comment to issue {}", issue_id);
    self
      .call(&context, Throttle::Always, move || {
        self.remote().create_comment(issue_id, body)
      })
      .await?
      .ok_or_else(|| FacadeError::empty(&context, "no comment returned"))
  }

  // -- health -------------------------------------------------------------

  /// Probe the API with an uncached viewer lookup. Never fails; errors are
  /// reported in the returned status.
  pub async fn health_check(&self) -> HealthStatus {
    let result = self
      .call("Health check failed", Throttle::Always, move || {
        self.remote().get_current_user()
      })
      .await;

    match result {
      Ok(viewer) => HealthStatus {
        status: HealthState::Healthy,
        api_connected: true,
        viewer: Some(viewer),
        error: None,
        checked_at: Utc::now(),
      },
      Err(e) => {
        warn!(error = %e, "health check failed");
        HealthStatus {
          status: HealthState::Unhealthy,
          api_connected: false,
          viewer: None,
          error: Some(e.to_string()),
          checked_at: Utc::now(),
        }
      }
    }
  }
}
