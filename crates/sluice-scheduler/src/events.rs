//! Tick events and notifiers for observability.
//!
//! The scheduler reports every tick outcome here, so failures are visible
//! without the tick's error stopping the trigger.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Events emitted while driving triggers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TriggerEvent {
  /// A tick has started.
  TickStarted { trigger_id: String },

  /// The tick matched records and an execution was enqueued.
  Fired {
    trigger_id: String,
    execution_id: String,
    record_count: u64,
  },

  /// The tick matched nothing.
  NothingToDo { trigger_id: String },

  /// The tick failed. The trigger stays registered.
  TickFailed {
    trigger_id: String,
    error: String,
    retryable: bool,
  },

  /// A tick was refused because the previous one is still running.
  TickSkipped { trigger_id: String },
}

/// Trait for receiving tick events.
pub trait TriggerNotifier: Send + Sync {
  fn notify(&self, event: TriggerEvent);
}

/// Discards all events.
#[derive(Debug, Clone, Default)]
pub struct NoopNotifier;

impl TriggerNotifier for NoopNotifier {
  fn notify(&self, _event: TriggerEvent) {}
}

/// Sends events to an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
  // Unbounded so a slow consumer never delays a tick; volume is a handful
  // of events per tick.
  sender: mpsc::UnboundedSender<TriggerEvent>,
}

impl ChannelNotifier {
  pub fn new(sender: mpsc::UnboundedSender<TriggerEvent>) -> Self {
    Self { sender }
  }
}

impl TriggerNotifier for ChannelNotifier {
  fn notify(&self, event: TriggerEvent) {
    // Receiver may have been dropped
    let _ = self.sender.send(event);
  }
}

/// Writes events to `tracing`.
#[derive(Debug, Clone, Default)]
pub struct TracingNotifier;

impl TriggerNotifier for TracingNotifier {
  fn notify(&self, event: TriggerEvent) {
    match event {
      TriggerEvent::TickStarted { trigger_id } => {
        debug!(trigger_id = %trigger_id, "tick_started");
      }
      TriggerEvent::Fired {
        trigger_id,
        execution_id,
        record_count,
      } => {
        info!(
          trigger_id = %trigger_id,
          execution_id = %execution_id,
          record_count,
          "trigger_fired"
        );
      }
      TriggerEvent::NothingToDo { trigger_id } => {
        debug!(trigger_id = %trigger_id, "nothing_to_do");
      }
      TriggerEvent::TickFailed {
        trigger_id,
        error,
        retryable,
      } => {
        error!(
          trigger_id = %trigger_id,
          error = %error,
          retryable,
          "tick_failed"
        );
      }
      TriggerEvent::TickSkipped { trigger_id } => {
        warn!(trigger_id = %trigger_id, "tick_skipped");
      }
    }
  }
}
