//! Action error types.

use serde::{Deserialize, Serialize};

/// Classification of an action failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionErrorKind {
  /// Credentials were rejected or missing.
  Auth,
  /// Network or storage hiccup; the same request may succeed later.
  TransientIo,
  /// The query itself is invalid.
  QuerySyntax,
  Unknown,
}

impl ActionErrorKind {
  /// Whether a retry within the same tick can help.
  pub fn is_retryable(self) -> bool {
    matches!(self, ActionErrorKind::TransientIo)
  }

  pub fn as_str(self) -> &'static str {
    match self {
      ActionErrorKind::Auth => "auth",
      ActionErrorKind::TransientIo => "transient_io",
      ActionErrorKind::QuerySyntax => "query_syntax",
      ActionErrorKind::Unknown => "unknown",
    }
  }
}

impl std::fmt::Display for ActionErrorKind {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Error returned by [`crate::Action::execute`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} error: {message}")]
pub struct ActionError {
  pub kind: ActionErrorKind,
  pub message: String,
}

impl ActionError {
  pub fn new(kind: ActionErrorKind, message: impl Into<String>) -> Self {
    Self {
      kind,
      message: message.into(),
    }
  }

  pub fn auth(message: impl Into<String>) -> Self {
    Self::new(ActionErrorKind::Auth, message)
  }

  pub fn transient_io(message: impl Into<String>) -> Self {
    Self::new(ActionErrorKind::TransientIo, message)
  }

  pub fn query_syntax(message: impl Into<String>) -> Self {
    Self::new(ActionErrorKind::QuerySyntax, message)
  }

  pub fn unknown(message: impl Into<String>) -> Self {
    Self::new(ActionErrorKind::Unknown, message)
  }

  pub fn is_retryable(&self) -> bool {
    self.kind.is_retryable()
  }
}

impl From<sluice_artifact::Error> for ActionError {
  fn from(e: sluice_artifact::Error) -> Self {
    match e {
      sluice_artifact::Error::Io(_) | sluice_artifact::Error::NotFound(_) => {
        ActionError::transient_io(format!("storage: {e}"))
      }
      sluice_artifact::Error::InvalidKey(_) => ActionError::unknown(format!("storage: {e}")),
    }
  }
}
