//! Row sources: the single request a query action makes.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::action::ActionParameters;
use crate::error::ActionError;

/// Parameter naming the file a [`JsonFileSource`] reads.
pub const SOURCE_PARAM: &str = "source";

/// Runs a query and returns every matched row.
///
/// Each call is one request against the data source. Truncation and storage
/// are applied afterwards by [`crate::QueryAction`].
#[async_trait]
pub trait RowSource: Send + Sync {
  async fn fetch_rows(
    &self,
    parameters: &ActionParameters,
  ) -> Result<Vec<serde_json::Value>, ActionError>;
}

/// A local stand-in for a tabular data source.
///
/// Reads a JSON array of rows from the file named by the `source` parameter,
/// resolved against `base_dir` when relative. Every row in the file counts as
/// a match. A missing file is treated as transient (it may show up by the
/// next tick), unreadable permissions as an auth failure, and malformed
/// content as a query error.
pub struct JsonFileSource {
  base_dir: PathBuf,
}

impl JsonFileSource {
  pub fn new(base_dir: impl Into<PathBuf>) -> Self {
    Self {
      base_dir: base_dir.into(),
    }
  }

  fn resolve(&self, source: &str) -> PathBuf {
    let path = Path::new(source);
    if path.is_absolute() {
      path.to_path_buf()
    } else {
      self.base_dir.join(path)
    }
  }
}

#[async_trait]
impl RowSource for JsonFileSource {
  async fn fetch_rows(
    &self,
    parameters: &ActionParameters,
  ) -> Result<Vec<serde_json::Value>, ActionError> {
    let source = parameters
      .get(SOURCE_PARAM)
      .ok_or_else(|| ActionError::query_syntax("missing 'source' parameter"))?;
    let path = self.resolve(source);

    let content = tokio::fs::read_to_string(&path)
      .await
      .map_err(|e| match e.kind() {
        ErrorKind::PermissionDenied => {
          ActionError::auth(format!("cannot read {}: {}", path.display(), e))
        }
        _ => ActionError::transient_io(format!("cannot read {}: {}", path.display(), e)),
      })?;

    let value: serde_json::Value = serde_json::from_str(&content).map_err(|e| {
      ActionError::query_syntax(format!("invalid JSON in {}: {}", path.display(), e))
    })?;

    match value {
      serde_json::Value::Array(rows) => {
        debug!(path = %path.display(), rows = rows.len(), "read rows");
        Ok(rows)
      }
      other => Err(ActionError::query_syntax(format!(
        "expected a JSON array of rows in {}, found {}",
        path.display(),
        json_type(&other)
      ))),
    }
  }
}

fn json_type(value: &serde_json::Value) -> &'static str {
  match value {
    serde_json::Value::Null => "null",
    serde_json::Value::Bool(_) => "boolean",
    serde_json::Value::Number(_) => "number",
    serde_json::Value::String(_) => "string",
    serde_json::Value::Array(_) => "array",
    serde_json::Value::Object(_) => "object",
  }
}
