//! Action result types.

use sluice_config::FetchMode;

/// The data that accompanies a match count, keyed by fetch mode.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryData {
  /// `FetchMode::None`: only the count is known.
  None,
  /// `FetchMode::FetchAll` / `FetchMode::FetchOne`: rows carried inline.
  Inline(Vec<serde_json::Value>),
  /// `FetchMode::Store`: reference to a durable copy of every row.
  Stored(String),
}

/// Result of one action invocation.
///
/// `record_count` is always the full number of matched records, even when
/// the inline rows were truncated (`FetchMode::FetchOne`).
#[derive(Debug, Clone, PartialEq)]
pub struct ActionResult {
  record_count: u64,
  data: QueryData,
}

impl ActionResult {
  /// A count-only result.
  pub fn none(record_count: u64) -> Self {
    Self {
      record_count,
      data: QueryData::None,
    }
  }

  /// A result carrying (possibly truncated) rows inline.
  pub fn inline(record_count: u64, records: Vec<serde_json::Value>) -> Self {
    Self {
      record_count,
      data: QueryData::Inline(records),
    }
  }

  /// A result whose rows were written to durable storage.
  pub fn stored(record_count: u64, reference: impl Into<String>) -> Self {
    Self {
      record_count,
      data: QueryData::Stored(reference.into()),
    }
  }

  pub fn record_count(&self) -> u64 {
    self.record_count
  }

  pub fn data(&self) -> &QueryData {
    &self.data
  }

  pub fn into_parts(self) -> (u64, QueryData) {
    (self.record_count, self.data)
  }

  /// Whether the data variant is the one `mode` calls for. Inline rows
  /// never outnumber the match count, and are present whenever something
  /// matched.
  pub fn matches_mode(&self, mode: FetchMode) -> bool {
    match (&self.data, mode) {
      (QueryData::None, FetchMode::None) => true,
      (QueryData::Inline(rows), FetchMode::FetchAll) => self.inline_rows_fit(rows),
      (QueryData::Inline(rows), FetchMode::FetchOne) => {
        rows.len() <= 1 && self.inline_rows_fit(rows)
      }
      (QueryData::Stored(_), FetchMode::Store) => true,
      _ => false,
    }
  }

  fn inline_rows_fit(&self, rows: &[serde_json::Value]) -> bool {
    let len = rows.len() as u64;
    len <= self.record_count && (len > 0 || self.record_count == 0)
  }
}
