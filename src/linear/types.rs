use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Owner of the API credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
  pub id: String,
  pub name: String,
  pub email: String,
  pub display_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
  pub id: String,
  pub name: String,
  pub key: String,
}

/// A column of a team's workflow ("Todo", "In Progress", ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowState {
  pub id: String,
  pub name: String,
  /// backlog, unstarted, started, completed or canceled
  #[serde(rename = "type")]
  pub state_type: String,
  pub color: Option<String>,
  pub position: Option<f64>,
}

/// Compact reference to a related entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Named {
  pub id: String,
  pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
  pub id: String,
  /// Human-facing key such as `ENG-42`
  pub identifier: String,
  pub title: String,
  pub description: Option<String>,
  /// 0 = none, 1 = urgent .. 4 = low
  pub priority: u8,
  pub url: String,
  pub state: Option<Named>,
  pub team: Option<Team>,
  pub assignee: Option<Named>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
  pub id: String,
  pub body: String,
  pub created_at: DateTime<Utc>,
  pub user: Option<Named>,
}

// ============================================================================
// Assignee
// ============================================================================

/// How an assignee field should be written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Assignee {
  /// The owner of the API credential
  CurrentUser,
  ById(String),
  /// Clear the assignee
  Unassign,
  /// Leave the field out of the request
  #[default]
  Unchanged,
}

impl Assignee {
  /// Interpret a loosely-typed assignee argument: `"me"` is the current
  /// user, an empty string clears the field, anything else is a user id.
  pub fn parse(raw: &str) -> Self {
    match raw.trim() {
      "me" => Self::CurrentUser,
      "" => Self::Unassign,
      id => Self::ById(id.to_string()),
    }
  }

  /// `None` maps to `Unchanged`.
  pub fn from_optional(raw: Option<&str>) -> Self {
    raw.map(Self::parse).unwrap_or_default()
  }
}

// ============================================================================
// Search
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchParams {
  /// Case-insensitive title substring; ignored when blank
  pub query: String,
  pub team_id: Option<String>,
  /// Workflow state name, matched exactly
  pub status: Option<String>,
  /// `Unchanged` and `Unassign` apply no assignee filter
  pub assignee: Assignee,
  pub limit: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EqFilter {
  pub eq: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdFilter {
  pub id: EqFilter,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NameFilter {
  pub name: EqFilter,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainsFilter {
  pub contains_ignore_case: String,
}

/// Structured issue filter; absent criteria are left out of the request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IssueFilter {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub team: Option<IdFilter>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub state: Option<NameFilter>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub assignee: Option<IdFilter>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub title: Option<ContainsFilter>,
}

impl IssueFilter {
  pub fn team(mut self, team_id: impl Into<String>) -> Self {
    self.team = Some(IdFilter {
      id: EqFilter { eq: team_id.into() },
    });
    self
  }

  pub fn state_name(mut self, name: impl Into<String>) -> Self {
    self.state = Some(NameFilter {
      name: EqFilter { eq: name.into() },
    });
    self
  }

  pub fn assignee(mut self, user_id: impl Into<String>) -> Self {
    self.assignee = Some(IdFilter {
      id: EqFilter { eq: user_id.into() },
    });
    self
  }

  pub fn title_contains(mut self, text: impl Into<String>) -> Self {
    self.title = Some(ContainsFilter {
      contains_ignore_case: text.into(),
    });
    self
  }
}

// ============================================================================
// Mutations
// ============================================================================

/// Body of an issue-create request.
///
/// Optional fields are omitted when `None`. `assignee_id: Some(None)` is sent
/// as an explicit `null`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueCreateInput {
  pub team_id: String,
  pub title: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub assignee_id: Option<Option<String>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub priority: Option<u8>,
}

/// Body of an issue-update request; same omission rules as
/// [`IssueCreateInput`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueUpdateInput {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub title: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub assignee_id: Option<Option<String>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub priority: Option<u8>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub state_id: Option<String>,
}

/// Caller-facing request to create an issue.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewIssue {
  pub team_id: String,
  pub title: String,
  pub description: Option<String>,
  pub assignee: Assignee,
  pub priority: Option<u8>,
}

impl NewIssue {
  pub fn new(team_id: impl Into<String>, title: impl Into<String>) -> Self {
    Self {
      team_id: team_id.into(),
      title: title.into(),
      ..Self::default()
    }
  }
}

/// Caller-facing partial update of an issue.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssueChanges {
  pub title: Option<String>,
  pub description: Option<String>,
  pub assignee: Assignee,
  pub priority: Option<u8>,
  pub state_id: Option<String>,
}

// ============================================================================
// Health
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
  Healthy,
  Unhealthy,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
  pub status: HealthState,
  pub api_connected: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub viewer: Option<User>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
  pub checked_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_assignee_parse() {
    assert_eq!(Assignee::parse("me"), Assignee::CurrentUser);
    assert_eq!(Assignee::parse(""), Assignee::Unassign);
    assert_eq!(Assignee::parse("  "), Assignee::Unassign);
    assert_eq!(Assignee::parse("user-7"), Assignee::ById("user-7".into()));
    assert_eq!(Assignee::from_optional(None), Assignee::Unchanged);
  }

  #[test]
  fn test_empty_filter_serializes_to_empty_object() {
    let value = serde_json::to_value(IssueFilter::default()).unwrap();
    assert_eq!(value, json!({}));
  }

  #[test]
  fn test_filter_shape() {
    let filter = IssueFilter::default()
      .team("T1")
      .state_name("In Progress")
      .assignee("U1")
      .title_contains("crash");

    assert_eq!(
      serde_json::to_value(filter).unwrap(),
      json!({
        "team": { "id": { "eq": "T1" } },
        "state": { "name": { "eq": "In Progress" } },
        "assignee": { "id": { "eq": "U1" } },
        "title": { "containsIgnoreCase": "crash" },
      })
    );
  }

  #[test]
  fn test_update_input_explicit_null_assignee() {
    let input = IssueUpdateInput {
      assignee_id: Some(None),
      ..Default::default()
    };
    assert_eq!(
      serde_json::to_value(input).unwrap(),
      json!({ "assigneeId": null })
    );
  }

  #[test]
  fn test_unhealthy_status_shape() {
    let status = HealthStatus {
      status: HealthState::Unhealthy,
      api_connected: false,
      viewer: None,
      error: Some("boom".into()),
      checked_at: Utc::now(),
    };
    let value = serde_json::to_value(status).unwrap();
    assert_eq!(value["status"], "unhealthy");
    assert_eq!(value["apiConnected"], false);
    assert_eq!(value["error"], "boom");
    assert!(value.get("viewer").is_none());
  }
}
