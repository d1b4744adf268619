use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::RwLock;

use crate::{ByteStream, Error, Store, bytes_stream, check_key, collect_bytes};

/// In-memory artifact store.
///
/// The whole stream is buffered before it becomes visible, so a failing
/// stream never produces a readable entry.
#[derive(Clone, Default)]
pub struct MemoryStore {
  blobs: Arc<RwLock<HashMap<String, Bytes>>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Number of stored blobs.
  pub async fn len(&self) -> usize {
    self.blobs.read().await.len()
  }

  pub async fn is_empty(&self) -> bool {
    self.blobs.read().await.is_empty()
  }

  /// Keys currently stored, sorted.
  pub async fn keys(&self) -> Vec<String> {
    let mut keys: Vec<String> = self.blobs.read().await.keys().cloned().collect();
    keys.sort();
    keys
  }
}

#[async_trait]
impl Store for MemoryStore {
  async fn get(&self, key: &str) -> Result<ByteStream, Error> {
    check_key(key)?;
    let blobs = self.blobs.read().await;
    let data = blobs
      .get(key)
      .cloned()
      .ok_or_else(|| Error::NotFound(key.to_string()))?;
    Ok(bytes_stream(data))
  }

  async fn put(&self, key: &str, data: ByteStream, _content_type: &str) -> Result<(), Error> {
    check_key(key)?;
    let buffer = collect_bytes(data).await?;
    self
      .blobs
      .write()
      .await
      .insert(key.to_string(), Bytes::from(buffer));
    Ok(())
  }

  async fn delete(&self, key: &str) -> Result<(), Error> {
    check_key(key)?;
    self
      .blobs
      .write()
      .await
      .remove(key)
      .map(|_| ())
      .ok_or_else(|| Error::NotFound(key.to_string()))
  }
}
