use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::enums::{FetchMode, RetryBackoff};
use crate::error::ConfigError;

/// Opaque, string-keyed parameters forwarded to an action.
pub type Parameters = BTreeMap<String, String>;

/// Poll interval used when a definition does not set one.
pub const DEFAULT_INTERVAL_MS: u64 = 60_000;

/// OAuth scope requested when a definition does not set any.
pub const DEFAULT_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

/// Well-known parameter keys written by [`TriggerDef::action_parameters`].
pub mod param_keys {
  pub const SQL: &str = "sql";
  pub const LEGACY_SQL: &str = "legacy_sql";
  pub const PROJECT_ID: &str = "project_id";
  pub const SERVICE_ACCOUNT: &str = "service_account";
  /// Comma separated list of scopes.
  pub const SCOPES: &str = "scopes";
  /// Key prefix under which stored results are written.
  pub const STORE_PREFIX: &str = "store_prefix";
}

/// A polling trigger as declared in a workflow definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerDef {
  /// Trigger id, unique within its flow (e.g. "watch")
  pub trigger_id: String,

  /// Namespace of the owning flow
  pub namespace: String,

  /// Id of the owning flow
  pub flow_id: String,

  #[serde(default)]
  pub flow_revision: u32,

  /// Poll period in milliseconds
  #[serde(default = "default_interval_ms")]
  pub interval_ms: u64,

  /// Query to run on each tick. May reference `namespace`, `flow_id`,
  /// `flow_revision` and `trigger_id` as template variables.
  pub sql: String,

  #[serde(default)]
  pub legacy_sql: bool,

  #[serde(default)]
  pub fetch_mode: FetchMode,

  #[serde(skip_serializing_if = "Option::is_none")]
  pub project_id: Option<String>,

  #[serde(skip_serializing_if = "Option::is_none")]
  pub service_account: Option<String>,

  #[serde(default = "default_scopes")]
  pub scopes: Vec<String>,

  /// Extra action specific parameters (e.g. `source` for file backed sources)
  #[serde(default)]
  pub parameters: Parameters,

  /// Upper bound on a single tick, enforced by the host
  #[serde(skip_serializing_if = "Option::is_none")]
  pub timeout_ms: Option<u64>,

  /// Retry policy for transient action failures, applied by the host
  #[serde(skip_serializing_if = "Option::is_none")]
  pub retry: Option<RetryDef>,
}

/// Host-level retry policy for transient failures within one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryDef {
  #[serde(default = "default_max_attempts")]
  pub max_attempts: u32,
  #[serde(default)]
  pub backoff: RetryBackoff,
  #[serde(default = "default_base_delay_ms")]
  pub base_delay_ms: u64,
}

impl Default for RetryDef {
  fn default() -> Self {
    Self {
      max_attempts: default_max_attempts(),
      backoff: RetryBackoff::default(),
      base_delay_ms: default_base_delay_ms(),
    }
  }
}

impl RetryDef {
  pub fn base_delay(&self) -> Duration {
    Duration::from_millis(self.base_delay_ms)
  }
}

fn default_interval_ms() -> u64 {
  DEFAULT_INTERVAL_MS
}

fn default_scopes() -> Vec<String> {
  vec![DEFAULT_SCOPE.to_string()]
}

fn default_max_attempts() -> u32 {
  3
}

fn default_base_delay_ms() -> u64 {
  1_000
}

impl TriggerDef {
  /// Parse and validate a definition from JSON.
  pub fn from_json(content: &str) -> Result<Self, ConfigError> {
    let def: TriggerDef = serde_json::from_str(content)?;
    def.validate()?;
    Ok(def)
  }

  /// Check the invariants serde cannot express.
  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.trigger_id.trim().is_empty() {
      return Err(ConfigError::MissingField {
        field: "trigger_id",
      });
    }
    if self.namespace.trim().is_empty() {
      return Err(ConfigError::MissingField { field: "namespace" });
    }
    if self.flow_id.trim().is_empty() {
      return Err(ConfigError::MissingField { field: "flow_id" });
    }
    if self.sql.trim().is_empty() {
      return Err(ConfigError::MissingField { field: "sql" });
    }
    if self.interval_ms == 0 {
      return Err(ConfigError::ZeroInterval {
        trigger_id: self.trigger_id.clone(),
      });
    }
    if self.retry.is_some_and(|retry| retry.max_attempts == 0) {
      return Err(ConfigError::InvalidRetry {
        trigger_id: self.trigger_id.clone(),
        message: "max_attempts must be at least 1".to_string(),
      });
    }
    Ok(())
  }

  pub fn interval(&self) -> Duration {
    Duration::from_millis(self.interval_ms)
  }

  pub fn timeout(&self) -> Option<Duration> {
    self.timeout_ms.map(Duration::from_millis)
  }

  /// Flatten the query options into the parameter map handed to the action.
  ///
  /// Values are still unresolved templates; see [`crate::resolve_parameters`].
  /// Explicit entries in `parameters` win over the derived ones.
  pub fn action_parameters(&self) -> Parameters {
    let mut params = Parameters::new();
    params.insert(param_keys::SQL.to_string(), self.sql.clone());
    params.insert(
      param_keys::LEGACY_SQL.to_string(),
      self.legacy_sql.to_string(),
    );
    if let Some(project_id) = &self.project_id {
      params.insert(param_keys::PROJECT_ID.to_string(), project_id.clone());
    }
    if let Some(service_account) = &self.service_account {
      params.insert(
        param_keys::SERVICE_ACCOUNT.to_string(),
        service_account.clone(),
      );
    }
    params.insert(param_keys::SCOPES.to_string(), self.scopes.join(","));
    params.insert(
      param_keys::STORE_PREFIX.to_string(),
      "{{ namespace }}/{{ flow_id }}/{{ trigger_id }}".to_string(),
    );

    for (key, value) in &self.parameters {
      params.insert(key.clone(), value.clone());
    }
    params
  }
}
