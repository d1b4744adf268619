use thiserror::Error;

/// Errors raised while loading or resolving a trigger definition.
#[derive(Debug, Error)]
pub enum ConfigError {
  /// The definition is not valid JSON or does not match the schema.
  #[error("failed to parse trigger definition: {0}")]
  Parse(#[from] serde_json::Error),

  /// A required field is missing or empty.
  #[error("trigger definition is missing required field '{field}'")]
  MissingField { field: &'static str },

  /// The poll interval must be strictly positive.
  #[error("trigger '{trigger_id}' has a zero poll interval")]
  ZeroInterval { trigger_id: String },

  /// The retry policy is unusable.
  #[error("invalid retry policy for trigger '{trigger_id}': {message}")]
  InvalidRetry { trigger_id: String, message: String },

  /// A templated parameter failed to render.
  #[error("failed to resolve parameter '{key}': {message}")]
  Template { key: String, message: String },
}
