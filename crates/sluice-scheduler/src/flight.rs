//! Single-flight bookkeeping: at most one tick per trigger at a time.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug, Clone, Default)]
pub(crate) struct InFlight {
  ids: Arc<Mutex<HashSet<String>>>,
}

impl InFlight {
  /// Claim the slot for `id`, or `None` if a tick already holds it.
  pub(crate) fn try_acquire(&self, id: &str) -> Option<FlightGuard> {
    let mut ids = self.ids.lock().unwrap_or_else(PoisonError::into_inner);
    if !ids.insert(id.to_string()) {
      return None;
    }
    Some(FlightGuard {
      ids: self.ids.clone(),
      id: id.to_string(),
    })
  }

  pub(crate) fn contains(&self, id: &str) -> bool {
    self
      .ids
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .contains(id)
  }
}

/// Releases the slot when dropped, including when the tick's future is
/// dropped mid-flight.
#[derive(Debug)]
pub(crate) struct FlightGuard {
  ids: Arc<Mutex<HashSet<String>>>,
  id: String,
}

impl Drop for FlightGuard {
  fn drop(&mut self) {
    self
      .ids
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .remove(&self.id);
  }
}
