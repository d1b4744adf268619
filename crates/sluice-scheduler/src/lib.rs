//! Sluice Scheduler
//!
//! The host side of a polling trigger. The [`Scheduler`] owns every trigger
//! registration, decides when each one ticks, and routes the outcome:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Scheduler                           │
//! │  - register / unregister triggers by instance id            │
//! │  - run(cancel): one driver task per trigger, on its interval│
//! │  - tick(id): single-flight evaluation of one trigger        │
//! └─────────────────────────────────────────────────────────────┘
//!                │                                │
//!                ▼                                ▼
//! ┌───────────────────────────┐    ┌────────────────────────────┐
//! │     ExecutionQueue        │    │      TriggerNotifier       │
//! │  fired envelopes          │    │  tick events, failures     │
//! └───────────────────────────┘    └────────────────────────────┘
//! ```
//!
//! A failing tick is reported to the notifier and never disables its trigger;
//! the next interval simply ticks again.
//!
//! # Usage
//!
//! ```ignore
//! let (queue, mut executions) = ChannelQueue::new(100);
//! let scheduler = Arc::new(Scheduler::new(Arc::new(queue), Arc::new(TracingNotifier)));
//! scheduler.register_def(&def, action)?;
//!
//! let cancel = CancellationToken::new();
//! tokio::spawn(scheduler.clone().run(cancel.clone()));
//!
//! while let Some(envelope) = executions.recv().await {
//!     // hand off to the execution pipeline
//! }
//! ```

mod error;
mod events;
mod flight;
mod queue;
mod scheduler;

pub use error::{QueueError, SchedulerError};
pub use events::{ChannelNotifier, NoopNotifier, TracingNotifier, TriggerEvent, TriggerNotifier};
pub use queue::{ChannelQueue, ExecutionQueue, MemoryQueue};
pub use scheduler::{Scheduler, TickOutcome};
