//! Trigger error types.

use sluice_action::{ActionError, FetchMode};

/// Errors that abort a tick. No envelope is produced.
#[derive(Debug, thiserror::Error)]
pub enum TriggerError {
  /// The action failed.
  #[error("action failed for trigger '{trigger_id}'")]
  Action {
    trigger_id: String,
    #[source]
    source: ActionError,
  },

  /// The action returned data that does not fit the configured fetch mode.
  #[error("trigger '{trigger_id}' expected a '{fetch_mode}' result: {message}")]
  ResultMismatch {
    trigger_id: String,
    fetch_mode: FetchMode,
    message: String,
  },

  /// The trigger configuration is unusable.
  #[error("invalid trigger configuration: {message}")]
  InvalidConfig { message: String },

  /// The tick was cancelled before the action returned.
  #[error("tick cancelled")]
  Cancelled,
}

impl TriggerError {
  /// The wrapped action error, if this tick failed inside the action.
  pub fn action_error(&self) -> Option<&ActionError> {
    match self {
      TriggerError::Action { source, .. } => Some(source),
      _ => None,
    }
  }

  /// Whether a host-level retry of this tick could succeed.
  pub fn is_retryable(&self) -> bool {
    self.action_error().is_some_and(ActionError::is_retryable)
  }
}
