//! Polling trigger evaluation.

use std::time::Duration;

use sluice_action::{Action, ActionParameters, FetchMode};
use sluice_config::{ConfigError, TriggerDef, param_keys, resolve_parameters};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use crate::context::TriggerContext;
use crate::envelope::ExecutionEnvelope;
use crate::error::TriggerError;

/// Immutable configuration of one trigger registration.
///
/// Parameters are already resolved; templating happens once when the
/// configuration is built from a [`TriggerDef`].
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerConfig {
  interval: Duration,
  parameters: ActionParameters,
  fetch_mode: FetchMode,
}

impl TriggerConfig {
  pub fn new(
    interval: Duration,
    parameters: ActionParameters,
    fetch_mode: FetchMode,
  ) -> Result<Self, TriggerError> {
    if interval.is_zero() {
      return Err(TriggerError::InvalidConfig {
        message: "poll interval must be greater than zero".to_string(),
      });
    }
    Ok(Self {
      interval,
      parameters,
      fetch_mode,
    })
  }

  /// Validate a definition and render its parameters against the
  /// coordinates of the flow it is declared in.
  pub fn from_def(def: &TriggerDef) -> Result<Self, ConfigError> {
    def.validate()?;
    let parameters = resolve_parameters(&def.action_parameters(), &TriggerContext::for_def(def))?;
    Ok(Self {
      interval: def.interval(),
      parameters,
      fetch_mode: def.fetch_mode,
    })
  }

  pub fn interval(&self) -> Duration {
    self.interval
  }

  pub fn parameters(&self) -> &ActionParameters {
    &self.parameters
  }

  pub fn fetch_mode(&self) -> FetchMode {
    self.fetch_mode
  }
}

/// Fires an execution whenever its action matches at least one record.
pub struct PollingTrigger<A> {
  config: TriggerConfig,
  action: A,
}

impl<A: Action> PollingTrigger<A> {
  pub fn new(config: TriggerConfig, action: A) -> Self {
    Self { config, action }
  }

  pub fn config(&self) -> &TriggerConfig {
    &self.config
  }

  /// Run one tick.
  ///
  /// Returns `Ok(None)` when nothing matched, `Ok(Some(envelope))` when at
  /// least one record matched, and `Err` when the action failed. The firing
  /// decision only looks at the match count, never at how many rows came
  /// back inline.
  #[instrument(
    name = "trigger_evaluate",
    skip(self, ctx),
    fields(
      namespace = %ctx.namespace,
      flow_id = %ctx.flow_id,
      trigger_id = %ctx.trigger_id,
      fetch_mode = %self.config.fetch_mode,
    )
  )]
  pub async fn evaluate(
    &self,
    ctx: &TriggerContext,
  ) -> Result<Option<ExecutionEnvelope>, TriggerError> {
    let fetch_mode = self.config.fetch_mode;
    let result = self
      .action
      .execute(&self.config.parameters, fetch_mode)
      .await
      .map_err(|source| TriggerError::Action {
        trigger_id: ctx.trigger_id.clone(),
        source,
      })?;

    debug!(
      record_count = result.record_count(),
      sql = self
        .config
        .parameters
        .get(param_keys::SQL)
        .map(String::as_str)
        .unwrap_or_default(),
      "found rows"
    );

    // Nothing matched: never an error, whatever data came with it.
    if result.record_count() == 0 {
      return Ok(None);
    }

    if !result.matches_mode(fetch_mode) {
      return Err(TriggerError::ResultMismatch {
        trigger_id: ctx.trigger_id.clone(),
        fetch_mode,
        message: format!("action returned {:?}", result.data()),
      });
    }

    let envelope = ExecutionEnvelope::new(ctx, result);
    debug!(execution_id = %envelope.id(), "trigger fired");
    Ok(Some(envelope))
  }

  /// Run one tick, giving up as soon as `cancel` fires.
  ///
  /// A cancelled tick drops the in-flight action and yields
  /// [`TriggerError::Cancelled`]; no envelope is ever partially built.
  pub async fn evaluate_with_cancel(
    &self,
    ctx: &TriggerContext,
    cancel: &CancellationToken,
  ) -> Result<Option<ExecutionEnvelope>, TriggerError> {
    if cancel.is_cancelled() {
      return Err(TriggerError::Cancelled);
    }

    tokio::select! {
      biased;
      _ = cancel.cancelled() => Err(TriggerError::Cancelled),
      result = self.evaluate(ctx) => result,
    }
  }
}
