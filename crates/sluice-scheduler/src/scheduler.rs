//! Trigger registrations and their tick loop.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use sluice_action::{Action, RetryPolicy, RetryingAction};
use sluice_config::TriggerDef;
use sluice_trigger::{PollingTrigger, TriggerConfig, TriggerContext};
use tokio::sync::Notify;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use crate::error::SchedulerError;
use crate::events::{TriggerEvent, TriggerNotifier};
use crate::flight::InFlight;
use crate::queue::ExecutionQueue;

/// What a completed tick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
  /// An execution was enqueued.
  Fired {
    execution_id: String,
    record_count: u64,
  },
  /// Nothing matched.
  NothingToDo,
}

/// A registered trigger instance.
struct Registration {
  /// Distinguishes a re-registration under the same id from the original.
  generation: u64,
  context: TriggerContext,
  trigger: PollingTrigger<Arc<dyn Action>>,
  timeout: Option<Duration>,
  /// Cancelled on unregister; aborts the in-flight tick.
  cancel: CancellationToken,
}

/// Drives polling triggers: interval ticking, single-flight, queueing.
pub struct Scheduler {
  registrations: RwLock<HashMap<String, Arc<Registration>>>,
  in_flight: InFlight,
  queue: Arc<dyn ExecutionQueue>,
  notifier: Arc<dyn TriggerNotifier>,
  changed: Notify,
  generation: AtomicU64,
}

impl Scheduler {
  pub fn new(queue: Arc<dyn ExecutionQueue>, notifier: Arc<dyn TriggerNotifier>) -> Self {
    Self {
      registrations: RwLock::new(HashMap::new()),
      in_flight: InFlight::default(),
      queue,
      notifier,
      changed: Notify::new(),
      generation: AtomicU64::new(0),
    }
  }

  /// Register a trigger instance. Returns its instance id.
  pub fn register(
    &self,
    context: TriggerContext,
    config: TriggerConfig,
    action: Arc<dyn Action>,
    timeout: Option<Duration>,
  ) -> Result<String, SchedulerError> {
    let id = context.instance_id();
    let registration = Arc::new(Registration {
      generation: self.generation.fetch_add(1, Ordering::Relaxed),
      context,
      trigger: PollingTrigger::new(config, action),
      timeout,
      cancel: CancellationToken::new(),
    });

    {
      let mut registrations = self
        .registrations
        .write()
        .unwrap_or_else(PoisonError::into_inner);
      if registrations.contains_key(&id) {
        return Err(SchedulerError::DuplicateTrigger { trigger_id: id });
      }
      registrations.insert(id.clone(), registration);
    }

    info!(trigger_id = %id, "trigger registered");
    self.changed.notify_one();
    Ok(id)
  }

  /// Register a trigger from its definition.
  ///
  /// Parameters are resolved against the flow coordinates, and the action is
  /// wrapped in a [`RetryingAction`] when the definition carries a retry
  /// policy.
  pub fn register_def(
    &self,
    def: &TriggerDef,
    action: Arc<dyn Action>,
  ) -> Result<String, SchedulerError> {
    let config = TriggerConfig::from_def(def)?;
    let action: Arc<dyn Action> = match def.retry {
      Some(retry) => Arc::new(RetryingAction::new(action, RetryPolicy::from(retry))),
      None => action,
    };
    self.register(TriggerContext::for_def(def), config, action, def.timeout())
  }

  /// Remove a trigger. Its in-flight tick, if any, is cancelled and
  /// produces no execution.
  pub fn unregister(&self, trigger_id: &str) -> Result<(), SchedulerError> {
    let removed = self
      .registrations
      .write()
      .unwrap_or_else(PoisonError::into_inner)
      .remove(trigger_id)
      .ok_or_else(|| SchedulerError::UnknownTrigger {
        trigger_id: trigger_id.to_string(),
      })?;

    removed.cancel.cancel();
    info!(trigger_id = %trigger_id, "trigger unregistered");
    self.changed.notify_one();
    Ok(())
  }

  /// Ids of every registered trigger, sorted.
  pub fn trigger_ids(&self) -> Vec<String> {
    let mut ids: Vec<String> = self
      .registrations
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .keys()
      .cloned()
      .collect();
    ids.sort();
    ids
  }

  /// Whether a tick of `trigger_id` is currently running.
  pub fn is_in_flight(&self, trigger_id: &str) -> bool {
    self.in_flight.contains(trigger_id)
  }

  fn registration(&self, trigger_id: &str) -> Result<Arc<Registration>, SchedulerError> {
    self
      .registrations
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .get(trigger_id)
      .cloned()
      .ok_or_else(|| SchedulerError::UnknownTrigger {
        trigger_id: trigger_id.to_string(),
      })
  }

  fn snapshot(&self) -> Vec<(String, Arc<Registration>)> {
    self
      .registrations
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .iter()
      .map(|(id, registration)| (id.clone(), registration.clone()))
      .collect()
  }

  /// Run one tick of `trigger_id` now.
  ///
  /// Refused with [`SchedulerError::TickInFlight`] if the previous tick of
  /// the same trigger has not returned. Every outcome, including failures,
  /// is reported to the notifier; a failure never unregisters the trigger.
  pub async fn tick(&self, trigger_id: &str) -> Result<TickOutcome, SchedulerError> {
    let registration = self.registration(trigger_id)?;
    self.tick_registration(trigger_id, &registration).await
  }

  #[instrument(name = "trigger_tick", skip(self, registration), fields(trigger_id = %trigger_id))]
  async fn tick_registration(
    &self,
    trigger_id: &str,
    registration: &Registration,
  ) -> Result<TickOutcome, SchedulerError> {
    let Some(_guard) = self.in_flight.try_acquire(trigger_id) else {
      self.notifier.notify(TriggerEvent::TickSkipped {
        trigger_id: trigger_id.to_string(),
      });
      return Err(SchedulerError::TickInFlight {
        trigger_id: trigger_id.to_string(),
      });
    };

    self.notifier.notify(TriggerEvent::TickStarted {
      trigger_id: trigger_id.to_string(),
    });

    let result = self.evaluate(trigger_id, registration).await;

    match &result {
      Ok(TickOutcome::Fired {
        execution_id,
        record_count,
      }) => self.notifier.notify(TriggerEvent::Fired {
        trigger_id: trigger_id.to_string(),
        execution_id: execution_id.clone(),
        record_count: *record_count,
      }),
      Ok(TickOutcome::NothingToDo) => self.notifier.notify(TriggerEvent::NothingToDo {
        trigger_id: trigger_id.to_string(),
      }),
      Err(e) => self.notifier.notify(TriggerEvent::TickFailed {
        trigger_id: trigger_id.to_string(),
        error: error_chain(e),
        retryable: is_retryable(e),
      }),
    }

    result
  }

  async fn evaluate(
    &self,
    trigger_id: &str,
    registration: &Registration,
  ) -> Result<TickOutcome, SchedulerError> {
    // A fresh context per tick; the registration's copy is never handed out.
    let ctx = registration.context.clone();
    let evaluation = registration
      .trigger
      .evaluate_with_cancel(&ctx, &registration.cancel);

    let evaluated = match registration.timeout {
      Some(timeout) => tokio::time::timeout(timeout, evaluation)
        .await
        .map_err(|_| SchedulerError::TimedOut {
          trigger_id: trigger_id.to_string(),
          timeout,
        })?,
      None => evaluation.await,
    };

    let envelope = evaluated.map_err(|source| SchedulerError::Trigger {
      trigger_id: trigger_id.to_string(),
      source,
    })?;

    let Some(envelope) = envelope else {
      return Ok(TickOutcome::NothingToDo);
    };

    let execution_id = envelope.id().to_string();
    let record_count = envelope.payload().record_count();
    self
      .queue
      .enqueue(envelope)
      .await
      .map_err(|source| SchedulerError::Queue {
        execution_id: execution_id.clone(),
        source,
      })?;

    Ok(TickOutcome::Fired {
      execution_id,
      record_count,
    })
  }

  /// Drive every registered trigger on its interval until `cancel` fires.
  ///
  /// Each trigger gets its own task, so a slow action only delays its own
  /// trigger. Triggers registered while running are picked up; unregistered
  /// ones stop. Ticks never overlap for one trigger and never come faster
  /// than its interval; a tick that overruns makes the driver skip the
  /// missed slots instead of bursting.
  pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
    info!(triggers = self.trigger_ids().len(), "scheduler started");

    let mut drivers = JoinSet::new();
    let mut driven: HashMap<String, u64> = HashMap::new();

    loop {
      let registrations = self.snapshot();
      driven.retain(|id, generation| {
        registrations
          .iter()
          .any(|(other, r)| other == id && r.generation == *generation)
      });
      for (id, registration) in registrations {
        if driven.get(&id) == Some(&registration.generation) {
          continue;
        }
        driven.insert(id.clone(), registration.generation);
        drivers.spawn(self.clone().drive(id, registration, cancel.child_token()));
      }

      tokio::select! {
        _ = cancel.cancelled() => break,
        _ = self.changed.notified() => {}
        Some(_) = drivers.join_next(), if !drivers.is_empty() => {}
      }
    }

    while drivers.join_next().await.is_some() {}
    info!("scheduler stopped");
  }

  async fn drive(
    self: Arc<Self>,
    trigger_id: String,
    registration: Arc<Registration>,
    cancel: CancellationToken,
  ) {
    let mut interval = tokio::time::interval(registration.trigger.config().interval());
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
      tokio::select! {
        _ = cancel.cancelled() => break,
        _ = registration.cancel.cancelled() => break,
        _ = interval.tick() => {}
      }

      // Dropping the tick on shutdown drops the action with it.
      tokio::select! {
        _ = cancel.cancelled() => break,
        // Failures were already reported to the notifier.
        _ = self.tick_registration(&trigger_id, &registration) => {}
      }
    }
  }
}

fn is_retryable(e: &SchedulerError) -> bool {
  match e {
    SchedulerError::Trigger { source, .. } => source.is_retryable(),
    SchedulerError::TimedOut { .. } => true,
    _ => false,
  }
}

/// Render an error with its sources: `outer: inner: innermost`.
fn error_chain(e: &dyn std::error::Error) -> String {
  let mut message = e.to_string();
  let mut source = e.source();
  while let Some(inner) = source {
    message.push_str(": ");
    message.push_str(&inner.to_string());
    source = inner.source();
  }
  message
}
