//! Host-level retry for transient action failures.

use std::time::Duration;

use async_trait::async_trait;
use sluice_config::{FetchMode, RetryBackoff, RetryDef};
use tracing::warn;

use crate::action::{Action, ActionParameters};
use crate::error::ActionError;
use crate::result::ActionResult;

/// How many times, and how far apart, to attempt an action within one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
  /// Total attempts including the first one.
  pub max_attempts: u32,
  pub backoff: RetryBackoff,
  pub base_delay: Duration,
}

impl RetryPolicy {
  /// A policy that makes exactly one attempt.
  pub fn none() -> Self {
    Self {
      max_attempts: 1,
      backoff: RetryBackoff::Constant,
      base_delay: Duration::ZERO,
    }
  }
}

impl From<RetryDef> for RetryPolicy {
  fn from(def: RetryDef) -> Self {
    Self {
      max_attempts: def.max_attempts.max(1),
      backoff: def.backoff,
      base_delay: def.base_delay(),
    }
  }
}

/// Retries the wrapped action on `TransientIo` failures only.
///
/// Auth, query syntax and unknown failures are returned on the first
/// occurrence; they would fail the same way again.
pub struct RetryingAction<A> {
  inner: A,
  policy: RetryPolicy,
}

impl<A: Action> RetryingAction<A> {
  pub fn new(inner: A, policy: RetryPolicy) -> Self {
    Self { inner, policy }
  }

  pub fn inner(&self) -> &A {
    &self.inner
  }
}

#[async_trait]
impl<A: Action> Action for RetryingAction<A> {
  async fn execute(
    &self,
    parameters: &ActionParameters,
    fetch_mode: FetchMode,
  ) -> Result<ActionResult, ActionError> {
    let mut attempt = 1;
    loop {
      match self.inner.execute(parameters, fetch_mode).await {
        Ok(result) => return Ok(result),
        Err(e) if e.is_retryable() && attempt < self.policy.max_attempts => {
          let delay = self.policy.backoff.delay(self.policy.base_delay, attempt);
          warn!(
            attempt,
            max_attempts = self.policy.max_attempts,
            delay_ms = delay.as_millis() as u64,
            error = %e,
            "transient action failure, retrying"
          );
          tokio::time::sleep(delay).await;
          attempt += 1;
        }
        Err(e) => return Err(e),
      }
    }
  }
}
