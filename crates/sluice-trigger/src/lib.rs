//! Sluice Trigger
//!
//! Per-tick evaluation logic of a polling trigger. On each tick the host calls
//! [`PollingTrigger::evaluate`] with a fresh [`TriggerContext`]; the trigger
//! runs its action once and, if the action matched at least one record,
//! returns a new [`ExecutionEnvelope`] for the host to enqueue.
//!
//! ```text
//! TriggerContext ──► PollingTrigger::evaluate ──► Action::execute
//!                          │
//!                          ├── record_count == 0 ──► Ok(None)
//!                          ├── record_count  > 0 ──► Ok(Some(ExecutionEnvelope))
//!                          └── ActionError       ──► Err(TriggerError::Action)
//! ```
//!
//! The trigger has no background task and no state shared between ticks beyond
//! its immutable [`TriggerConfig`]. Scheduling, single-flight and queueing are
//! the host's job (see `sluice-scheduler`).

mod context;
mod envelope;
mod error;
mod polling;

pub use context::TriggerContext;
pub use envelope::{ExecutionEnvelope, ExecutionState, ExecutionTrigger, TriggerPayload};
pub use error::TriggerError;
pub use polling::{PollingTrigger, TriggerConfig};
