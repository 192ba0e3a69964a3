#[cfg(test)]
#[path = "identity_test.rs"]
mod tests;

use tokio::sync::Mutex;

use super::SessionStore;
use crate::domain::models::wire;
use crate::domain::models::ApiError;
use crate::domain::models::Session;

/// Obtains and caches the backend-issued identity of this installation.
pub struct IdentityBootstrap {
    store: SessionStore,
    http: reqwest::Client,
    default_api_base: String,
    version: String,
    registration: Mutex<()>,
}

impl IdentityBootstrap {
    pub fn new(
        store: SessionStore,
        http: reqwest::Client,
        default_api_base: &str,
        version: &str,
    ) -> IdentityBootstrap {
        return IdentityBootstrap {
            store,
            http,
            default_api_base: default_api_base.to_string(),
            version: version.to_string(),
            registration: Mutex::new(()),
        };
    }

    /// Returns the stored extension key, registering this installation with
    /// the backend first if there is none. Concurrent callers wait on one
    /// registration instead of each creating an install.
    pub async fn ensure_extension_key(&self) -> Result<String, ApiError> {
        if let Some(key) = self.store.get().await?.extension_key {
            return Ok(key);
        }

        let _guard = self.registration.lock().await;
        if let Some(key) = self.store.get().await?.extension_key {
            return Ok(key);
        }

        let api_base = self.store.api_base(&self.default_api_base).await?;
        tracing::debug!(api_base = %api_base, version = %self.version, "Registering extension");

        let res = self
            .http
            .post(format!("{api_base}/api/extension/register"))
            .json(&wire::RegisterExtensionRequest {
                extension_version: self.version.to_string(),
            })
            .send()
            .await?;

        let status = res.status();
        let text = res.text().await?;
        if !status.is_success() {
            tracing::error!(status = status.as_u16(), "Extension registration failed");
            let message = wire::error_message(&text)
                .unwrap_or_else(|| return "Extension registration failed".to_string());
            return Err(ApiError::Registration(message));
        }

        let res = wire::decode::<wire::ExtensionRegistrationResponse>(&text)?;
        let identity = match res.identity() {
            Some(identity) => identity,
            None => {
                return Err(ApiError::Registration(
                    "Extension registration returned no key".to_string(),
                ))
            }
        };

        let key = identity.extension_key.to_string();
        self.store.set(&Session::from(identity)).await?;

        return Ok(key);
    }
}
