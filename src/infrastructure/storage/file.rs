#[cfg(test)]
#[path = "file_test.rs"]
mod tests;

use std::collections::HashMap;
use std::path;

use anyhow::bail;
use anyhow::Result;
use async_trait::async_trait;
use serde_json::Map;
use serde_json::Value;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::domain::models::KeyValueStore;

/// Key-value storage persisted as a single JSON object on disk.
pub struct FileStore {
    pub file_path: path::PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    pub fn new(file_path: path::PathBuf) -> FileStore {
        return FileStore {
            file_path,
            write_lock: Mutex::new(()),
        };
    }

    async fn read_all(&self) -> Result<Map<String, Value>> {
        if !self.file_path.exists() {
            return Ok(Map::new());
        }

        let payload = fs::read_to_string(&self.file_path).await?;
        if payload.trim().is_empty() {
            return Ok(Map::new());
        }

        return match serde_json::from_str::<Value>(&payload)? {
            Value::Object(map) => Ok(map),
            _ => bail!(format!(
                "Storage file {} does not contain a JSON object",
                self.file_path.to_string_lossy()
            )),
        };
    }

    async fn write_all(&self, map: Map<String, Value>) -> Result<()> {
        if let Some(parent) = self.file_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).await?;
            }
        }

        // Readers never take the lock, so the target is only ever replaced whole.
        let tmp_path = self.tmp_path();
        let payload = serde_json::to_string_pretty(&Value::Object(map))?;
        let mut file = fs::File::create(&tmp_path).await?;
        file.write_all(payload.as_bytes()).await?;
        file.sync_all().await?;
        drop(file);

        if let Err(err) = fs::rename(&tmp_path, &self.file_path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(err.into());
        }

        return Ok(());
    }

    fn tmp_path(&self) -> path::PathBuf {
        let file_name = self
            .file_path
            .file_name()
            .map(|e| return e.to_string_lossy().to_string())
            .unwrap_or_else(|| return "storage.json".to_string());

        return self
            .file_path
            .with_file_name(format!(".{file_name}.{}.tmp", std::process::id()));
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    #[allow(clippy::implicit_return)]
    async fn get(&self, keys: &[String]) -> Result<HashMap<String, String>> {
        let map = self.read_all().await?;
        let res = keys
            .iter()
            .filter_map(|key| {
                // Values written by other tools may not be strings.
                return match map.get(key) {
                    Some(Value::String(val)) => Some((key.to_string(), val.to_string())),
                    _ => None,
                };
            })
            .collect();

        return Ok(res);
    }

    #[allow(clippy::implicit_return)]
    async fn set(&self, entries: HashMap<String, String>) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut map = self.read_all().await?;
        for (key, val) in entries {
            map.insert(key, Value::String(val));
        }

        tracing::debug!(path = ?self.file_path, "Writing storage file");
        return self.write_all(map).await;
    }

    #[allow(clippy::implicit_return)]
    async fn remove(&self, keys: &[String]) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        if !self.file_path.exists() {
            return Ok(());
        }

        let mut map = self.read_all().await?;
        for key in keys {
            map.remove(key);
        }

        return self.write_all(map).await;
    }
}
