//! Behavioural tests for PollingTrigger::evaluate.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use sluice_action::{Action, ActionError, ActionErrorKind, ActionParameters, ActionResult, FetchMode};
use sluice_trigger::{ExecutionState, PollingTrigger, TriggerConfig, TriggerContext, TriggerError};
use tokio_util::sync::CancellationToken;

/// Returns the same outcome on every call and counts invocations.
struct FakeAction {
  outcome: Result<ActionResult, ActionError>,
  calls: AtomicUsize,
}

impl FakeAction {
  fn ok(result: ActionResult) -> Arc<Self> {
    Arc::new(Self {
      outcome: Ok(result),
      calls: AtomicUsize::new(0),
    })
  }

  fn err(error: ActionError) -> Arc<Self> {
    Arc::new(Self {
      outcome: Err(error),
      calls: AtomicUsize::new(0),
    })
  }

  fn calls(&self) -> usize {
    self.calls.load(Ordering::SeqCst)
  }
}

#[async_trait]
impl Action for FakeAction {
  async fn execute(
    &self,
    _parameters: &ActionParameters,
    _fetch_mode: FetchMode,
  ) -> Result<ActionResult, ActionError> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    self.outcome.clone()
  }
}

/// Never completes; used to exercise cancellation.
struct HangingAction;

#[async_trait]
impl Action for HangingAction {
  async fn execute(
    &self,
    _parameters: &ActionParameters,
    _fetch_mode: FetchMode,
  ) -> Result<ActionResult, ActionError> {
    std::future::pending().await
  }
}

fn config(fetch_mode: FetchMode) -> TriggerConfig {
  let mut params = ActionParameters::new();
  params.insert(
    "sql".to_string(),
    "SELECT * FROM `project.dataset.table`".to_string(),
  );
  TriggerConfig::new(Duration::from_secs(5 * 60), params, fetch_mode).expect("valid config")
}

fn ctx() -> TriggerContext {
  TriggerContext::new("io.sluice.tests", "table-listen", 1, "watch")
}

fn empty_result(mode: FetchMode) -> ActionResult {
  match mode {
    FetchMode::None => ActionResult::none(0),
    FetchMode::FetchAll | FetchMode::FetchOne => ActionResult::inline(0, vec![]),
    FetchMode::Store => ActionResult::stored(0, "sluice://results/empty.jsonl"),
  }
}

const ALL_MODES: [FetchMode; 4] = [
  FetchMode::None,
  FetchMode::FetchAll,
  FetchMode::FetchOne,
  FetchMode::Store,
];

#[tokio::test]
async fn test_zero_records_never_fires() {
  for mode in ALL_MODES {
    let action = FakeAction::ok(empty_result(mode));
    let trigger = PollingTrigger::new(config(mode), action.clone());

    let result = trigger.evaluate(&ctx()).await.expect("zero rows is not an error");
    assert!(result.is_none(), "fetch mode {mode} fired on zero records");
    assert_eq!(action.calls(), 1);
  }
}

#[tokio::test]
async fn test_zero_count_ignores_data_variant() {
  for mode in [FetchMode::FetchAll, FetchMode::FetchOne, FetchMode::Store] {
    let trigger = PollingTrigger::new(config(mode), FakeAction::ok(ActionResult::none(0)));

    let result = trigger.evaluate(&ctx()).await.expect("zero rows is not an error");
    assert!(result.is_none(), "fetch mode {mode} fired on zero records");
  }
}

#[tokio::test]
async fn test_positive_count_without_inline_rows_is_rejected() {
  for mode in [FetchMode::FetchAll, FetchMode::FetchOne] {
    let action = FakeAction::ok(ActionResult::inline(3, vec![]));
    let trigger = PollingTrigger::new(config(mode), action);

    let err = trigger.evaluate(&ctx()).await.unwrap_err();
    assert!(
      matches!(err, TriggerError::ResultMismatch { .. }),
      "fetch mode {mode}: {err:?}"
    );
  }
}

#[tokio::test]
async fn test_fetch_all_end_to_end() {
  let rows = vec![json!({"number": 1}), json!({"number": 2})];
  let action = FakeAction::ok(ActionResult::inline(2, rows.clone()));
  let trigger = PollingTrigger::new(config(FetchMode::FetchAll), action);

  let envelope = trigger
    .evaluate(&ctx())
    .await
    .unwrap()
    .expect("two rows must fire");

  assert_eq!(envelope.namespace(), "io.sluice.tests");
  assert_eq!(envelope.flow_id(), "table-listen");
  assert_eq!(envelope.flow_revision(), 1);
  assert_eq!(envelope.state(), ExecutionState::Created);
  assert_eq!(envelope.trigger().trigger_id, "watch");
  assert_eq!(envelope.payload().record_count(), 2);
  assert_eq!(envelope.payload().records(), Some(rows.as_slice()));
  assert_eq!(envelope.payload().storage_reference(), None);
}

#[tokio::test]
async fn test_fetch_all_end_to_end_empty() {
  let action = FakeAction::ok(ActionResult::inline(0, vec![]));
  let trigger = PollingTrigger::new(config(FetchMode::FetchAll), action);

  assert!(trigger.evaluate(&ctx()).await.unwrap().is_none());
}

#[tokio::test]
async fn test_payload_count_matches_result_count() {
  for count in [1u64, 2, 17, 10_000] {
    let trigger = PollingTrigger::new(config(FetchMode::None), FakeAction::ok(ActionResult::none(count)));
    let envelope = trigger.evaluate(&ctx()).await.unwrap().unwrap();
    assert_eq!(envelope.payload().record_count(), count);
  }
}

#[tokio::test]
async fn test_successive_fires_have_distinct_ids() {
  let action = FakeAction::ok(ActionResult::inline(1, vec![json!({"id": "same"})]));
  let trigger = PollingTrigger::new(config(FetchMode::FetchAll), action);

  let first = trigger.evaluate(&ctx()).await.unwrap().unwrap();
  let second = trigger.evaluate(&ctx()).await.unwrap().unwrap();

  assert_ne!(first.id(), second.id());
  assert_eq!(first.payload(), second.payload());
}

#[tokio::test]
async fn test_fetch_one_truncation_keeps_full_count() {
  let action = FakeAction::ok(ActionResult::inline(2, vec![json!({"number": 1})]));
  let trigger = PollingTrigger::new(config(FetchMode::FetchOne), action);

  let envelope = trigger.evaluate(&ctx()).await.unwrap().unwrap();
  let records = envelope.payload().records().expect("fetch_one carries rows");
  assert!(records.len() <= 1);
  assert_eq!(envelope.payload().record_count(), 2);
}

#[tokio::test]
async fn test_fetch_none_fires_on_count_alone() {
  let trigger = PollingTrigger::new(config(FetchMode::None), FakeAction::ok(ActionResult::none(3)));

  let envelope = trigger.evaluate(&ctx()).await.unwrap().unwrap();
  assert_eq!(envelope.payload().record_count(), 3);
  assert_eq!(envelope.payload().records(), None);
  assert_eq!(envelope.payload().storage_reference(), None);
}

#[tokio::test]
async fn test_store_carries_reference_only() {
  let trigger = PollingTrigger::new(
    config(FetchMode::Store),
    FakeAction::ok(ActionResult::stored(2, "sluice://ns/flow/watch/a.jsonl")),
  );

  let envelope = trigger.evaluate(&ctx()).await.unwrap().unwrap();
  assert_eq!(
    envelope.payload().storage_reference(),
    Some("sluice://ns/flow/watch/a.jsonl")
  );
  assert_eq!(envelope.payload().records(), None);
}

#[tokio::test]
async fn test_auth_error_wrapped_without_envelope() {
  let trigger = PollingTrigger::new(
    config(FetchMode::FetchAll),
    FakeAction::err(ActionError::auth("invalid service account")),
  );

  let err = trigger.evaluate(&ctx()).await.unwrap_err();
  match &err {
    TriggerError::Action { trigger_id, source } => {
      assert_eq!(trigger_id, "watch");
      assert_eq!(source.kind, ActionErrorKind::Auth);
    }
    other => panic!("expected action error, got {other:?}"),
  }
  assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_query_syntax_error_wrapped() {
  let trigger = PollingTrigger::new(
    config(FetchMode::None),
    FakeAction::err(ActionError::query_syntax("Syntax error: Unexpected end of script")),
  );

  let err = trigger.evaluate(&ctx()).await.unwrap_err();
  assert_eq!(
    err.action_error().map(|e| e.kind),
    Some(ActionErrorKind::QuerySyntax)
  );
}

#[tokio::test]
async fn test_failed_tick_does_not_poison_trigger() {
  let trigger = PollingTrigger::new(
    config(FetchMode::None),
    FakeAction::err(ActionError::auth("denied")),
  );

  for _ in 0..3 {
    assert!(trigger.evaluate(&ctx()).await.is_err());
  }
}

#[tokio::test]
async fn test_cancel_in_flight_yields_no_envelope() {
  let trigger = PollingTrigger::new(config(FetchMode::FetchAll), HangingAction);
  let cancel = CancellationToken::new();

  let canceller = cancel.clone();
  tokio::spawn(async move {
    tokio::time::sleep(Duration::from_millis(10)).await;
    canceller.cancel();
  });

  let result = trigger.evaluate_with_cancel(&ctx(), &cancel).await;
  assert!(matches!(result, Err(TriggerError::Cancelled)));
}
