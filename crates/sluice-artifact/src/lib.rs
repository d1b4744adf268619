//! Sluice Artifact
//!
//! Durable storage for query results that a trigger persists instead of carrying
//! inline (`fetch_mode: store`). A stored result is addressed by a key such as
//! `io.sluice/listen/watch/0f1e....jsonl`; executions carry it as a
//! `sluice://` reference (see [`reference_for`] and [`key_from_reference`]).
//!
//! The [`Store`] trait is the backend seam. [`FsStore`] writes to the local
//! filesystem and [`MemoryStore`] keeps everything in memory for tests and
//! one-shot runs.
//!
//! A `put` is confirm-on-success: once it returns `Ok` the blob is fully
//! readable under its key, and when it returns `Err` nothing is readable under
//! that key.

mod fs;
mod memory;

pub use fs::FsStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use futures::StreamExt;
use std::pin::Pin;

/// Scheme prefix of storage references handed out to executions.
pub const REFERENCE_SCHEME: &str = "sluice://";

/// A boxed stream of bytes for stored data.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, Error>> + Send>>;

/// Error type for artifact storage operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
  /// The requested artifact was not found.
  #[error("artifact not found: {0}")]
  NotFound(String),

  /// The key escapes the store root or is otherwise unusable.
  #[error("invalid artifact key: {0}")]
  InvalidKey(String),

  /// An I/O error occurred.
  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}

/// Artifact storage trait.
#[async_trait]
pub trait Store: Send + Sync {
  /// Retrieve an artifact by key.
  async fn get(&self, key: &str) -> Result<ByteStream, Error>;

  /// Store an artifact, replacing any previous blob under the same key.
  async fn put(&self, key: &str, data: ByteStream, content_type: &str) -> Result<(), Error>;

  /// Delete an artifact by key.
  async fn delete(&self, key: &str) -> Result<(), Error>;
}

/// Wrap an in-memory buffer as a single-chunk [`ByteStream`].
pub fn bytes_stream(data: impl Into<Bytes>) -> ByteStream {
  let chunk: Bytes = data.into();
  Box::pin(futures::stream::once(async move { Ok::<_, Error>(chunk) }))
}

/// Drain a [`ByteStream`] into one buffer.
pub async fn collect_bytes(mut stream: ByteStream) -> Result<Vec<u8>, Error> {
  let mut out = Vec::new();
  while let Some(chunk) = stream.next().await {
    out.extend_from_slice(&chunk?);
  }
  Ok(out)
}

/// Storage reference for a key, e.g. `sluice://ns/flow/trigger/id.jsonl`.
pub fn reference_for(key: &str) -> String {
  format!("{REFERENCE_SCHEME}{key}")
}

/// Inverse of [`reference_for`].
pub fn key_from_reference(reference: &str) -> Option<&str> {
  reference.strip_prefix(REFERENCE_SCHEME)
}

/// Reject keys that are empty, absolute, or contain `..` segments.
pub(crate) fn check_key(key: &str) -> Result<(), Error> {
  let bad = key.is_empty()
    || key.starts_with('/')
    || key.starts_with('\\')
    || key.split(['/', '\\']).any(|segment| segment == "..");
  if bad {
    return Err(Error::InvalidKey(key.to_string()));
  }
  Ok(())
}
