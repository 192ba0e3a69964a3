use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;

/// Durable string key-value storage shared by every part of the client.
///
/// Implementations never cache: each call observes the latest persisted
/// state, and the last writer wins.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Returns the stored values for the requested keys. Missing keys are
    /// omitted from the map.
    async fn get(&self, keys: &[String]) -> Result<HashMap<String, String>>;

    /// Merges entries into storage.
    async fn set(&self, entries: HashMap<String, String>) -> Result<()>;

    async fn remove(&self, keys: &[String]) -> Result<()>;
}
