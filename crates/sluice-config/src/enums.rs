use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How matched rows accompany a fired execution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchMode {
  /// Only the match count is reported.
  #[default]
  None,
  /// Every matched row is carried inline.
  FetchAll,
  /// Only the first matched row is carried inline.
  FetchOne,
  /// Rows are written to durable storage and a reference is carried.
  Store,
}

impl FetchMode {
  /// Whether rows travel inline with the result.
  pub fn is_inline(self) -> bool {
    matches!(self, FetchMode::FetchAll | FetchMode::FetchOne)
  }

  pub fn as_str(self) -> &'static str {
    match self {
      FetchMode::None => "none",
      FetchMode::FetchAll => "fetch_all",
      FetchMode::FetchOne => "fetch_one",
      FetchMode::Store => "store",
    }
  }
}

impl std::fmt::Display for FetchMode {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryBackoff {
  Constant,
  Linear,
  #[default]
  Exponential,
}

impl RetryBackoff {
  /// Delay to wait before retry number `attempt` (1-based).
  pub fn delay(self, base: Duration, attempt: u32) -> Duration {
    let attempt = attempt.max(1);
    match self {
      RetryBackoff::Constant => base,
      RetryBackoff::Linear => base.saturating_mul(attempt),
      RetryBackoff::Exponential => {
        let factor = 1u32.checked_shl(attempt - 1).unwrap_or(u32::MAX);
        base.saturating_mul(factor)
      }
    }
  }
}
