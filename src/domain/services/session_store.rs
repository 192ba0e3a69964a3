#[cfg(test)]
#[path = "session_store_test.rs"]
mod tests;

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::bail;
use anyhow::Result;

use crate::domain::models::ExtensionIdentity;
use crate::domain::models::KeyValueStore;
use crate::domain::models::Session;
use crate::domain::models::SessionKey;

const SESSION_KEYS: [SessionKey; 4] = [
    SessionKey::Token,
    SessionKey::RefreshToken,
    SessionKey::ExtensionKey,
    SessionKey::InstallId,
];

/// Canonical view over the persisted session fields.
///
/// Every call goes back to storage, so several handles over the same storage
/// (other processes included) always agree on the latest written state.
#[derive(Clone)]
pub struct SessionStore {
    storage: Arc<dyn KeyValueStore>,
}

impl SessionStore {
    pub fn new(storage: Arc<dyn KeyValueStore>) -> SessionStore {
        return SessionStore { storage };
    }

    pub async fn get(&self) -> Result<Session> {
        let names = SESSION_KEYS
            .iter()
            .flat_map(|key| return key.storage_names())
            .collect::<Vec<String>>();
        let stored = self.storage.get(&names).await?;

        let mut session = Session::default();
        for key in SESSION_KEYS {
            let value = key
                .storage_names()
                .iter()
                .find_map(|name| return stored.get(name).filter(|e| return !e.is_empty()));

            if let Some(val) = value {
                session.set_field(key, val.to_string());
            }
        }

        return Ok(session);
    }

    /// Persists the fields present in `partial`, leaving the others untouched.
    pub async fn set(&self, partial: &Session) -> Result<()> {
        let mut entries = HashMap::new();
        let mut stale = vec![];
        for key in SESSION_KEYS {
            if let Some(val) = partial.field(key) {
                entries.insert(key.to_string(), val.to_string());
                stale.extend(key.legacy_aliases().iter().map(|e| return e.to_string()));
            }
        }

        if entries.is_empty() {
            return Ok(());
        }

        self.storage.set(entries).await?;
        if !stale.is_empty() {
            self.storage.remove(&stale).await?;
        }

        return Ok(());
    }

    pub async fn clear(&self, keys: &[SessionKey]) -> Result<()> {
        let names = keys
            .iter()
            .flat_map(|key| return key.storage_names())
            .collect::<Vec<String>>();

        return self.storage.remove(&names).await;
    }

    pub async fn identity(&self) -> Result<Option<ExtensionIdentity>> {
        return Ok(self.get().await?.identity());
    }

    /// Returns the stored backend origin, persisting `default` when none is
    /// stored yet.
    pub async fn api_base(&self, default: &str) -> Result<String> {
        let key = SessionKey::ApiBase.to_string();
        let stored = self.storage.get(&[key.clone()]).await?;
        if let Some(val) = stored.get(&key).filter(|e| return !e.trim().is_empty()) {
            return Ok(val.trim_end_matches('/').to_string());
        }

        self.storage
            .set(HashMap::from([(key, default.to_string())]))
            .await?;

        return Ok(default.trim_end_matches('/').to_string());
    }

    pub async fn set_api_base(&self, url: &str) -> Result<()> {
        let url = url.trim();
        if url.is_empty() {
            bail!("API base is required");
        }

        return self
            .storage
            .set(HashMap::from([(
                SessionKey::ApiBase.to_string(),
                url.to_string(),
            )]))
            .await;
    }

    pub async fn temp_token(&self) -> Result<Option<String>> {
        let key = SessionKey::TempToken.to_string();
        let mut stored = self.storage.get(&[key.clone()]).await?;

        return Ok(stored.remove(&key).filter(|e| return !e.is_empty()));
    }

    pub async fn set_temp_token(&self, temp_token: &str) -> Result<()> {
        return self
            .storage
            .set(HashMap::from([(
                SessionKey::TempToken.to_string(),
                temp_token.to_string(),
            )]))
            .await;
    }
}
