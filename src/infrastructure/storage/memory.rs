use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;

use crate::domain::models::KeyValueStore;

/// Process-local storage. Used for ephemeral runs and tests.
#[derive(Default)]
pub struct MemoryStore {
    values: DashMap<String, String>,
}

impl MemoryStore {
    pub fn with_values(values: &[(&str, &str)]) -> MemoryStore {
        let store = MemoryStore::default();
        for (key, val) in values {
            store.values.insert(key.to_string(), val.to_string());
        }

        return store;
    }

    pub fn value(&self, key: &str) -> Option<String> {
        return self.values.get(key).map(|e| return e.value().to_string());
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    #[allow(clippy::implicit_return)]
    async fn get(&self, keys: &[String]) -> Result<HashMap<String, String>> {
        let res = keys
            .iter()
            .filter_map(|key| {
                return self
                    .values
                    .get(key)
                    .map(|val| return (key.to_string(), val.value().to_string()));
            })
            .collect();

        return Ok(res);
    }

    #[allow(clippy::implicit_return)]
    async fn set(&self, entries: HashMap<String, String>) -> Result<()> {
        for (key, val) in entries {
            self.values.insert(key, val);
        }

        return Ok(());
    }

    #[allow(clippy::implicit_return)]
    async fn remove(&self, keys: &[String]) -> Result<()> {
        for key in keys {
            self.values.remove(key);
        }

        return Ok(());
    }
}
