//! Execution queue sinks for fired envelopes.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use sluice_trigger::ExecutionEnvelope;
use tokio::sync::mpsc;

use crate::error::QueueError;

/// Destination for envelopes produced by firing ticks.
///
/// Ownership of the envelope moves into the queue; the scheduler keeps no
/// reference after `enqueue` returns.
#[async_trait]
pub trait ExecutionQueue: Send + Sync {
  async fn enqueue(&self, envelope: ExecutionEnvelope) -> Result<(), QueueError>;
}

/// A queue backed by a bounded tokio channel.
///
/// A full channel makes `enqueue` wait, which holds the trigger's tick (and
/// therefore its single-flight slot) until the consumer catches up.
#[derive(Debug, Clone)]
pub struct ChannelQueue {
  sender: mpsc::Sender<ExecutionEnvelope>,
}

impl ChannelQueue {
  /// Create a queue and the receiver the execution pipeline reads from.
  pub fn new(buffer_size: usize) -> (Self, mpsc::Receiver<ExecutionEnvelope>) {
    let (sender, receiver) = mpsc::channel(buffer_size);
    (Self { sender }, receiver)
  }
}

#[async_trait]
impl ExecutionQueue for ChannelQueue {
  async fn enqueue(&self, envelope: ExecutionEnvelope) -> Result<(), QueueError> {
    self
      .sender
      .send(envelope)
      .await
      .map_err(|_| QueueError::Closed)
  }
}

/// A queue that keeps every envelope in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryQueue {
  items: Arc<Mutex<Vec<ExecutionEnvelope>>>,
}

impl MemoryQueue {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn len(&self) -> usize {
    self.items.lock().unwrap_or_else(PoisonError::into_inner).len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Remove and return everything enqueued so far.
  pub fn drain(&self) -> Vec<ExecutionEnvelope> {
    std::mem::take(&mut *self.items.lock().unwrap_or_else(PoisonError::into_inner))
  }
}

#[async_trait]
impl ExecutionQueue for MemoryQueue {
  async fn enqueue(&self, envelope: ExecutionEnvelope) -> Result<(), QueueError> {
    self
      .items
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .push(envelope);
    Ok(())
  }
}
