use std::fmt;
use thiserror::Error;

use super::remote::RemoteError;

/// Client-side failure classes. These are never retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientErrorKind {
  BadRequest,
  NotFound,
}

impl ClientErrorKind {
  pub fn from_status(status: u16) -> Option<Self> {
    match status {
      400 => Some(Self::BadRequest),
      404 => Some(Self::NotFound),
      _ => None,
    }
  }

  /// Map a GraphQL `extensions.code` / `extensions.type` value.
  pub fn from_code(code: &str) -> Option<Self> {
    match code.to_ascii_uppercase().replace(' ', "_").as_str() {
      "INPUT_ERROR" | "INVALID_INPUT" | "BAD_USER_INPUT" | "GRAPHQL_VALIDATION_FAILED" => {
        Some(Self::BadRequest)
      }
      "NOT_FOUND" | "ENTITY_NOT_FOUND" => Some(Self::NotFound),
      _ => None,
    }
  }

  /// Linear codes that mean "try again later", whatever status came with them.
  pub fn is_transient_code(code: &str) -> bool {
    matches!(
      code.to_ascii_uppercase().replace(' ', "_").as_str(),
      "RATELIMITED" | "RATE_LIMITED" | "INTERNAL_SERVER_ERROR" | "SERVICE_UNAVAILABLE"
    )
  }

  /// Fallback for GraphQL errors that only carry text. Status numbers must
  /// stand alone, so "retry after 4000ms" is not a 400.
  pub fn from_message(message: &str) -> Option<Self> {
    let lower = message.to_lowercase();
    let has_word = |word: &str| {
      lower
        .split(|c: char| !c.is_ascii_alphanumeric())
        .any(|w| w == word)
    };
    if has_word("404") || lower.contains("not found") {
      Some(Self::NotFound)
    } else if has_word("400") || lower.contains("bad request") {
      Some(Self::BadRequest)
    } else {
      None
    }
  }
}

impl fmt::Display for ClientErrorKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ClientErrorKind::BadRequest => write!(f, "bad request"),
      ClientErrorKind::NotFound => write!(f, "not found"),
    }
  }
}

/// Errors leaving the facade. Every variant carries a context string naming
/// the operation and its key arguments.
#[derive(Debug, Error)]
pub enum FacadeError {
  /// The request was invalid or its target does not exist.
  #[error("{context}: {source}")]
  Client {
    context: String,
    kind: ClientErrorKind,
    #[source]
    source: RemoteError,
  },

  /// The remote kept failing after every retry.
  #[error("{context}: {source}")]
  Transient {
    context: String,
    #[source]
    source: RemoteError,
  },

  /// The remote accepted the call but returned no entity.
  #[error("{context}: {message}")]
  EmptyResult { context: String, message: String },
}

impl FacadeError {
  /// Wrap a remote failure, keeping its classification.
  pub fn from_remote(context: impl Into<String>, source: RemoteError) -> Self {
    let context = context.into();
    match source.client_kind() {
      Some(kind) => FacadeError::Client {
        context,
        kind,
        source,
      },
      None => FacadeError::Transient { context, source },
    }
  }

  pub fn empty(context: impl Into<String>, message: impl Into<String>) -> Self {
    FacadeError::EmptyResult {
      context: context.into(),
      message: message.into(),
    }
  }

  pub fn client_kind(&self) -> Option<ClientErrorKind> {
    match self {
      FacadeError::Client { kind, .. } => Some(*kind),
      _ => None,
    }
  }

  pub fn is_not_found(&self) -> bool {
    self.client_kind() == Some(ClientErrorKind::NotFound)
  }
}

pub type Result<T> = std::result::Result<T, FacadeError>;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_from_remote_keeps_classification() {
    let err = FacadeError::from_remote(
      "Failed to get issue ENG-1",
      RemoteError::NotFound("issue ENG-1".into()),
    );
    assert!(err.is_not_found());
    assert_eq!(
      err.to_string(),
      "Failed to get issue ENG-1: not found: issue ENG-1"
    );
  }

  #[test]
  fn test_transient_wraps_context() {
    let err = FacadeError::from_remote(
      "Failed to list teams",
      RemoteError::Status {
        status: 502,
        message: "bad gateway".into(),
        codes: vec![],
      },
    );
    assert!(matches!(err, FacadeError::Transient { .. }));
    assert_eq!(err.to_string(), "Failed to list teams: HTTP 502: bad gateway");
  }

  #[test]
  fn test_code_normalization() {
    assert_eq!(
      ClientErrorKind::from_code("invalid input"),
      Some(ClientErrorKind::BadRequest)
    );
    assert_eq!(ClientErrorKind::from_code("AUTHENTICATION_ERROR"), None);
  }
}
