use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::debug;
use url::Url;

use super::api_types::{
  error_codes, error_message, CommentCreateData, GraphQlResponse, IssueCreateData, IssueData, IssueUpdateData, IssuesData,
  TeamData, TeamStatesData, TeamsData, ViewerData,
};
use super::remote::{LinearApi, RemoteError, RemoteResult};
use super::types::{
  Comment, Issue, IssueCreateInput, IssueFilter, IssueUpdateInput, Team, User, WorkflowState,
};

pub const DEFAULT_API_URL: &str = "https://api.linear.app/graphql";

const ISSUE_FIELDS: &str = r#"
  id identifier title description priority url createdAt updatedAt
  state { id name }
  team { id name key }
  assignee { id name }
"#;

/// Linear GraphQL API client.
#[derive(Clone)]
pub struct LinearClient {
  http: reqwest::Client,
  endpoint: Url,
  api_key: String,
}

impl std::fmt::Debug for LinearClient {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("LinearClient")
      .field("endpoint", &self.endpoint.as_str())
      .finish_non_exhaustive()
  }
}

impl LinearClient {
  pub fn new(endpoint: Url, api_key: impl Into<String>) -> RemoteResult<Self> {
    let http = reqwest::Client::builder()
      .user_agent(concat!("linear-facade/", env!("CARGO_PKG_VERSION")))
      .build()?;

    Ok(Self {
      http,
      endpoint,
      api_key: api_key.into(),
    })
  }

  /// POST a GraphQL document and decode `data` into `T`.
  async fn graphql<T: DeserializeOwned>(&self, query: &str, variables: Value) -> RemoteResult<T> {
    let response = self
      .http
      .post(self.endpoint.clone())
      .header(reqwest::header::AUTHORIZATION, &self.api_key)
      .json(&json!({ "query": query, "variables": variables }))
      .send()
      .await?;

    let status = response.status();
    let body = response.text().await?;
    debug!(%status, bytes = body.len(), "graphql response");

    if !status.is_success() {
      return Err(status_error(status.as_u16(), body));
    }

    serde_json::from_str::<GraphQlResponse<T>>(&body)?.into_data()
  }
}

#[async_trait]
impl LinearApi for LinearClient {
  async fn list_teams(&self) -> RemoteResult<Vec<Team>> {
    let data: TeamsData = self
      .graphql("query { teams { nodes { id name key } } }", json!({}))
      .await?;
    Ok(data.teams.nodes.into_iter().map(Team::from).collect())
  }

  async fn list_issues(&self, filter: &IssueFilter, limit: u32) -> RemoteResult<Vec<Issue>> {
    let query = format!(
      "query($filter: IssueFilter, $first: Int) {{ issues(filter: $filter, first: $first) {{ nodes {{ {} }} }} }}",
      ISSUE_FIELDS
    );
    let data: IssuesData = self
      .graphql(&query, json!({ "filter": filter, "first": limit }))
      .await?;
    Ok(data.issues.nodes.into_iter().map(Issue::from).collect())
  }

  async fn get_issue(&self, id: &str) -> RemoteResult<Option<Issue>> {
    let query = format!("query($id: String!) {{ issue(id: $id) {{ {} }} }}", ISSUE_FIELDS);
    let data: IssueData = self.graphql(&query, json!({ "id": id })).await?;
    Ok(data.issue.map(Issue::from))
  }

  async fn create_issue(&self, input: &IssueCreateInput) -> RemoteResult<Option<Issue>> {
    let query = format!(
      "mutation($input: IssueCreateInput!) {{ issueCreate(input: $input) {{ issue {{ {} }} }} }}",
      ISSUE_FIELDS
    );
    let data: IssueCreateData = self.graphql(&query, json!({ "input": input })).await?;
    Ok(data.issue_create.issue.map(Issue::from))
  }

  async fn update_issue(&self, id: &str, input: &IssueUpdateInput) -> RemoteResult<Option<Issue>> {
    let query = format!(
      "mutation($id: String!, $input: IssueUpdateInput!) {{ issueUpdate(id: $id, input: $input) {{ issue {{ {} }} }} }}",
      ISSUE_FIELDS
    );
    let data: IssueUpdateData = self
      .graphql(&query, json!({ "id": id, "input": input }))
      .await?;
    Ok(data.issue_update.issue.map(Issue::from))
  }

  async fn get_team(&self, id: &str) -> RemoteResult<Option<Team>> {
    let data: TeamData = self
      .graphql(
        "query($id: String!) { team(id: $id) { id name key } }",
        json!({ "id": id }),
      )
      .await?;
    Ok(data.team.map(Team::from))
  }

  async fn list_team_workflow_states(&self, team_id: &str) -> RemoteResult<Vec<WorkflowState>> {
    let data: TeamStatesData = self
      .graphql(
        "query($id: String!) { team(id: $id) { states { nodes { id name type color position } } } }",
        json!({ "id": team_id }),
      )
      .await?;
    let team = data
      .team
      .ok_or_else(|| RemoteError::NotFound(format!("team {}", team_id)))?;
    Ok(team.states.nodes.into_iter().map(WorkflowState::from).collect())
  }

  async fn create_comment(&self, issue_id: &str, body: &str) -> RemoteResult<Option<Comment>> {
    let data: CommentCreateData = self
      .graphql(
        "mutation($input: CommentCreateInput!) { commentCreate(input: $input) { comment { id body createdAt user { id name } } } }",
        json!({ "input": { "issueId": issue_id, "body": body } }),
      )
      .await?;
    Ok(data.comment_create.comment.map(Comment::from))
  }

  async fn get_current_user(&self) -> RemoteResult<User> {
    let data: ViewerData = self
      .graphql(
        "query { viewer { id name email displayName } }",
        json!({}),
      )
      .await?;
    Ok(data.viewer.into())
  }
}

/// Build the error for a non-success reply. Linear still sends a GraphQL
/// `errors` array on most of these, and its codes outrank the status.
fn status_error(status: u16, body: String) -> RemoteError {
  match serde_json::from_str::<GraphQlResponse<Value>>(&body) {
    Ok(response) if !response.errors.is_empty() => RemoteError::Status {
      status,
      message: error_message(&response.errors),
      codes: error_codes(&response.errors),
    },
    _ => RemoteError::Status {
      status,
      message: body,
      codes: Vec::new(),
    },
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_debug_hides_api_key() {
    let client = LinearClient::new(Url::parse(DEFAULT_API_URL).unwrap(), "lin_api_secret").unwrap();
    let printed = format!("{:?}", client);
    assert!(printed.contains("api.linear.app"));
    assert!(!printed.contains("lin_api_secret"));
  }

  #[test]
  fn test_status_error_keeps_error_codes() {
    let body = json!({
      "errors": [{ "message": "Rate limit exceeded", "extensions": { "code": "RATELIMITED" } }]
    })
    .to_string();

    let err = status_error(400, body);
    assert_eq!(err.to_string(), "HTTP 400: Rate limit exceeded");
    match &err {
      RemoteError::Status { codes, .. } => assert_eq!(codes, &vec!["RATELIMITED".to_string()]),
      other => panic!("unexpected: {:?}", other),
    }
    assert!(!err.is_client_error());
  }

  #[test]
  fn test_status_error_plain_body() {
    let err = status_error(502, "<html>Bad Gateway</html>".into());
    assert_eq!(err.to_string(), "HTTP 502: <html>Bad Gateway</html>");
    assert!(!err.is_client_error());
  }
}
