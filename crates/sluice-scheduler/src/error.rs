//! Scheduler error types.

use std::time::Duration;

use sluice_config::ConfigError;
use sluice_trigger::TriggerError;

/// Failure to hand an envelope to the execution queue.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
  /// The consumer side of the queue is gone.
  #[error("execution queue closed")]
  Closed,
}

/// Errors surfaced by the scheduler.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
  #[error("trigger '{trigger_id}' is not registered")]
  UnknownTrigger { trigger_id: String },

  #[error("trigger '{trigger_id}' is already registered")]
  DuplicateTrigger { trigger_id: String },

  /// A tick was requested while the previous tick of the same trigger
  /// was still running.
  #[error("trigger '{trigger_id}' already has a tick in flight")]
  TickInFlight { trigger_id: String },

  /// The tick exceeded the configured timeout.
  #[error("tick of trigger '{trigger_id}' timed out after {timeout:?}")]
  TimedOut {
    trigger_id: String,
    timeout: Duration,
  },

  /// The trigger evaluation failed.
  #[error("tick of trigger '{trigger_id}' failed")]
  Trigger {
    trigger_id: String,
    #[source]
    source: TriggerError,
  },

  /// The envelope could not be enqueued.
  #[error("failed to enqueue execution '{execution_id}'")]
  Queue {
    execution_id: String,
    #[source]
    source: QueueError,
  },

  #[error("invalid trigger definition: {0}")]
  Config(#[from] ConfigError),
}
