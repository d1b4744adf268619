//! Query action: one row-source request, then the fetch mode.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use sluice_artifact::{Store, bytes_stream, reference_for};
use sluice_config::{FetchMode, param_keys};
use tracing::{debug, instrument};

use crate::action::{Action, ActionParameters};
use crate::error::ActionError;
use crate::result::ActionResult;
use crate::source::RowSource;

const DEFAULT_STORE_PREFIX: &str = "results";
const NDJSON: &str = "application/x-ndjson";

/// Runs a query through a [`RowSource`] and shapes the rows per fetch mode.
///
/// - `None`: count only
/// - `FetchAll`: every row inline
/// - `FetchOne`: first row inline, count still reports every match
/// - `Store`: rows written as newline-delimited JSON to the artifact store
///   under `{store_prefix}/{uuid}.jsonl`; the `sluice://` reference is only
///   returned once the write succeeded
///
/// `Store` writes exactly once per call, including when nothing matched. A
/// zero-match tick leaves an empty blob that no execution references, since
/// the trigger does not fire. Those blobs are not removed here; expire them
/// with a retention policy on the store (every key shares the
/// `{store_prefix}/` prefix).
pub struct QueryAction<S> {
  source: S,
  store: Option<Arc<dyn Store>>,
}

impl<S: RowSource> QueryAction<S> {
  pub fn new(source: S) -> Self {
    Self {
      source,
      store: None,
    }
  }

  /// Attach the artifact store used by `FetchMode::Store`.
  pub fn with_store(mut self, store: Arc<dyn Store>) -> Self {
    self.store = Some(store);
    self
  }

  async fn store_rows(
    &self,
    parameters: &ActionParameters,
    rows: &[serde_json::Value],
  ) -> Result<String, ActionError> {
    let store = self
      .store
      .as_ref()
      .ok_or_else(|| ActionError::unknown("fetch mode 'store' requires an artifact store"))?;

    let prefix = parameters
      .get(param_keys::STORE_PREFIX)
      .map(|p| p.trim_matches('/'))
      .filter(|p| !p.is_empty())
      .unwrap_or(DEFAULT_STORE_PREFIX);
    let key = format!("{}/{}.jsonl", prefix, uuid::Uuid::new_v4());

    let mut buffer = Vec::new();
    for row in rows {
      serde_json::to_writer(&mut buffer, row)
        .map_err(|e| ActionError::unknown(format!("failed to encode row: {e}")))?;
      buffer.push(b'\n');
    }

    store
      .put(&key, bytes_stream(Bytes::from(buffer)), NDJSON)
      .await?;

    debug!(key = %key, rows = rows.len(), "stored query result");
    Ok(reference_for(&key))
  }
}

#[async_trait]
impl<S: RowSource> Action for QueryAction<S> {
  #[instrument(name = "query_execute", skip(self, parameters), fields(fetch_mode = %fetch_mode))]
  async fn execute(
    &self,
    parameters: &ActionParameters,
    fetch_mode: FetchMode,
  ) -> Result<ActionResult, ActionError> {
    let rows = self.source.fetch_rows(parameters).await?;
    let record_count = rows.len() as u64;

    let result = match fetch_mode {
      FetchMode::None => ActionResult::none(record_count),
      FetchMode::FetchAll => ActionResult::inline(record_count, rows),
      FetchMode::FetchOne => {
        ActionResult::inline(record_count, rows.into_iter().take(1).collect())
      }
      FetchMode::Store => {
        let reference = self.store_rows(parameters, &rows).await?;
        ActionResult::stored(record_count, reference)
      }
    };

    Ok(result)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::error::ActionErrorKind;
  use crate::result::QueryData;
  use serde_json::json;
  use sluice_artifact::{MemoryStore, collect_bytes, key_from_reference};
  use std::sync::atomic::{AtomicUsize, Ordering};

  struct FixedRows {
    rows: Vec<serde_json::Value>,
    calls: AtomicUsize,
  }

  impl FixedRows {
    fn new(rows: Vec<serde_json::Value>) -> Self {
      Self {
        rows,
        calls: AtomicUsize::new(0),
      }
    }
  }

  #[async_trait]
  impl RowSource for FixedRows {
    async fn fetch_rows(
      &self,
      _parameters: &ActionParameters,
    ) -> Result<Vec<serde_json::Value>, ActionError> {
      self.calls.fetch_add(1, Ordering::SeqCst);
      Ok(self.rows.clone())
    }
  }

  fn two_rows() -> Vec<serde_json::Value> {
    vec![json!({"number": 1}), json!({"number": 2})]
  }

  #[tokio::test]
  async fn test_fetch_none_reports_count_only() {
    let action = QueryAction::new(FixedRows::new(two_rows()));
    let result = action
      .execute(&ActionParameters::new(), FetchMode::None)
      .await
      .unwrap();

    assert_eq!(result.record_count(), 2);
    assert_eq!(result.data(), &QueryData::None);
  }

  #[tokio::test]
  async fn test_fetch_all_keeps_every_row() {
    let action = QueryAction::new(FixedRows::new(two_rows()));
    let result = action
      .execute(&ActionParameters::new(), FetchMode::FetchAll)
      .await
      .unwrap();

    assert_eq!(result.record_count(), 2);
    assert_eq!(result.data(), &QueryData::Inline(two_rows()));
  }

  #[tokio::test]
  async fn test_fetch_one_truncates_rows_not_count() {
    let action = QueryAction::new(FixedRows::new(two_rows()));
    let result = action
      .execute(&ActionParameters::new(), FetchMode::FetchOne)
      .await
      .unwrap();

    assert_eq!(result.record_count(), 2);
    assert_eq!(result.data(), &QueryData::Inline(vec![json!({"number": 1})]));
  }

  #[tokio::test]
  async fn test_store_writes_once_and_returns_reference() {
    let store = MemoryStore::new();
    let source = FixedRows::new(two_rows());
    let action = QueryAction::new(source).with_store(Arc::new(store.clone()));

    let mut params = ActionParameters::new();
    params.insert(
      param_keys::STORE_PREFIX.to_string(),
      "ns/flow/watch".to_string(),
    );

    let result = action.execute(&params, FetchMode::Store).await.unwrap();
    assert_eq!(result.record_count(), 2);
    assert_eq!(action.source.calls.load(Ordering::SeqCst), 1);

    let QueryData::Stored(reference) = result.data() else {
      panic!("expected stored data, got {:?}", result.data());
    };
    let key = key_from_reference(reference).unwrap();
    assert!(key.starts_with("ns/flow/watch/"));
    assert!(key.ends_with(".jsonl"));
    assert_eq!(store.len().await, 1);

    let data = collect_bytes(store.get(key).await.unwrap()).await.unwrap();
    let text = String::from_utf8(data).unwrap();
    assert_eq!(text, "{\"number\":1}\n{\"number\":2}\n");
  }

  #[tokio::test]
  async fn test_store_without_backend_fails() {
    let action = QueryAction::new(FixedRows::new(two_rows()));
    let err = action
      .execute(&ActionParameters::new(), FetchMode::Store)
      .await
      .unwrap_err();
    assert_eq!(err.kind, ActionErrorKind::Unknown);
  }

  #[tokio::test]
  async fn test_store_zero_matches_writes_empty_blob() {
    let store = MemoryStore::new();
    let action = QueryAction::new(FixedRows::new(vec![])).with_store(Arc::new(store.clone()));

    let mut params = ActionParameters::new();
    params.insert(param_keys::STORE_PREFIX.to_string(), "ns/flow/watch".to_string());

    let result = action.execute(&params, FetchMode::Store).await.unwrap();
    assert_eq!(result.record_count(), 0);

    let QueryData::Stored(reference) = result.data() else {
      panic!("expected stored data, got {:?}", result.data());
    };
    let key = key_from_reference(reference).unwrap();
    assert!(key.starts_with("ns/flow/watch/"));
    assert_eq!(store.keys().await, vec![key.to_string()]);

    let data = collect_bytes(store.get(key).await.unwrap()).await.unwrap();
    assert!(data.is_empty());
  }

  #[tokio::test]
  async fn test_store_uses_default_prefix() {
    let store = MemoryStore::new();
    let action =
      QueryAction::new(FixedRows::new(vec![])).with_store(Arc::new(store.clone()));

    let result = action
      .execute(&ActionParameters::new(), FetchMode::Store)
      .await
      .unwrap();
    assert_eq!(result.record_count(), 0);

    let keys = store.keys().await;
    assert_eq!(keys.len(), 1);
    assert!(keys[0].starts_with("results/"));
  }
}
