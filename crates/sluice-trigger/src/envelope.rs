//! Execution envelopes emitted by a firing trigger.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sluice_action::{ActionResult, QueryData};

use crate::context::TriggerContext;

/// Lifecycle state of an emitted execution.
///
/// Envelopes always leave the trigger as `Created`; later states belong to the
/// orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum ExecutionState {
  Created,
}

/// What the trigger found: the full match count plus either the rows or a
/// reference to their stored copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerPayload {
  record_count: u64,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  records: Option<Vec<serde_json::Value>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  storage_reference: Option<String>,
}

impl TriggerPayload {
  pub fn record_count(&self) -> u64 {
    self.record_count
  }

  /// Inline rows; present only for `fetch_all` / `fetch_one`.
  pub fn records(&self) -> Option<&[serde_json::Value]> {
    self.records.as_deref()
  }

  /// Stored copy of the rows; present only for `store`.
  pub fn storage_reference(&self) -> Option<&str> {
    self.storage_reference.as_deref()
  }
}

impl From<ActionResult> for TriggerPayload {
  fn from(result: ActionResult) -> Self {
    let (record_count, data) = result.into_parts();
    let (records, storage_reference) = match data {
      QueryData::None => (None, None),
      QueryData::Inline(rows) => (Some(rows), None),
      QueryData::Stored(reference) => (None, Some(reference)),
    };
    Self {
      record_count,
      records,
      storage_reference,
    }
  }
}

/// The trigger that produced an execution and what it found.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionTrigger {
  pub trigger_id: String,
  pub payload: TriggerPayload,
}

/// A unit of work handed to the execution queue.
///
/// Built once per firing tick and never mutated. `id` is a random UUID, so
/// two envelopes built from identical results still differ; downstream
/// consumers deduplicate on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionEnvelope {
  id: String,
  namespace: String,
  flow_id: String,
  flow_revision: u32,
  state: ExecutionState,
  created_at: DateTime<Utc>,
  trigger: ExecutionTrigger,
}

impl ExecutionEnvelope {
  pub(crate) fn new(ctx: &TriggerContext, result: ActionResult) -> Self {
    Self {
      id: uuid::Uuid::new_v4().to_string(),
      namespace: ctx.namespace.clone(),
      flow_id: ctx.flow_id.clone(),
      flow_revision: ctx.flow_revision,
      state: ExecutionState::Created,
      created_at: Utc::now(),
      trigger: ExecutionTrigger {
        trigger_id: ctx.trigger_id.clone(),
        payload: TriggerPayload::from(result),
      },
    }
  }

  pub fn id(&self) -> &str {
    &self.id
  }

  pub fn namespace(&self) -> &str {
    &self.namespace
  }

  pub fn flow_id(&self) -> &str {
    &self.flow_id
  }

  pub fn flow_revision(&self) -> u32 {
    self.flow_revision
  }

  pub fn state(&self) -> ExecutionState {
    self.state
  }

  pub fn created_at(&self) -> DateTime<Utc> {
    self.created_at
  }

  pub fn trigger(&self) -> &ExecutionTrigger {
    &self.trigger
  }

  pub fn payload(&self) -> &TriggerPayload {
    &self.trigger.payload
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn ctx() -> TriggerContext {
    TriggerContext::new("io.sluice.tests", "table-listen", 3, "watch")
  }

  #[test]
  fn test_envelope_copies_coordinates() {
    let envelope = ExecutionEnvelope::new(&ctx(), ActionResult::none(7));

    assert_eq!(envelope.namespace(), "io.sluice.tests");
    assert_eq!(envelope.flow_id(), "table-listen");
    assert_eq!(envelope.flow_revision(), 3);
    assert_eq!(envelope.state(), ExecutionState::Created);
    assert_eq!(envelope.trigger().trigger_id, "watch");
    assert_eq!(envelope.payload().record_count(), 7);
    assert!(uuid::Uuid::parse_str(envelope.id()).is_ok());
  }

  #[test]
  fn test_payload_variants() {
    let inline = TriggerPayload::from(ActionResult::inline(2, vec![json!(1), json!(2)]));
    assert_eq!(inline.records(), Some(&[json!(1), json!(2)][..]));
    assert_eq!(inline.storage_reference(), None);

    let stored = TriggerPayload::from(ActionResult::stored(2, "sluice://a/b.jsonl"));
    assert_eq!(stored.records(), None);
    assert_eq!(stored.storage_reference(), Some("sluice://a/b.jsonl"));

    let none = TriggerPayload::from(ActionResult::none(2));
    assert_eq!(none.records(), None);
    assert_eq!(none.storage_reference(), None);
  }

  #[test]
  fn test_serialized_shape() {
    let envelope = ExecutionEnvelope::new(&ctx(), ActionResult::stored(5, "sluice://x.jsonl"));
    let value = serde_json::to_value(&envelope).unwrap();

    assert_eq!(value["state"], "created");
    assert_eq!(value["flow_revision"], 3);
    assert_eq!(value["trigger"]["trigger_id"], "watch");
    assert_eq!(value["trigger"]["payload"]["record_count"], 5);
    assert_eq!(
      value["trigger"]["payload"]["storage_reference"],
      "sluice://x.jsonl"
    );
    assert!(value["trigger"]["payload"].get("records").is_none());

    let back: ExecutionEnvelope = serde_json::from_value(value).unwrap();
    assert_eq!(back, envelope);
  }
}
