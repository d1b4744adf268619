use std::sync::Arc;

use async_trait::async_trait;
use sluice_config::{FetchMode, Parameters};

use crate::error::ActionError;
use crate::result::ActionResult;

/// Already-resolved, string-keyed parameters for an action.
pub type ActionParameters = Parameters;

/// One request against an external data source.
///
/// Implementations make exactly one external request per call. With
/// [`FetchMode::Store`] they also make exactly one durable write, and only
/// report the stored reference once that write has succeeded.
#[async_trait]
pub trait Action: Send + Sync {
  async fn execute(
    &self,
    parameters: &ActionParameters,
    fetch_mode: FetchMode,
  ) -> Result<ActionResult, ActionError>;
}

#[async_trait]
impl<A: Action + ?Sized> Action for Arc<A> {
  async fn execute(
    &self,
    parameters: &ActionParameters,
    fetch_mode: FetchMode,
  ) -> Result<ActionResult, ActionError> {
    (**self).execute(parameters, fetch_mode).await
  }
}

#[async_trait]
impl<A: Action + ?Sized> Action for Box<A> {
  async fn execute(
    &self,
    parameters: &ActionParameters,
    fetch_mode: FetchMode,
  ) -> Result<ActionResult, ActionError> {
    (**self).execute(parameters, fetch_mode).await
  }
}
