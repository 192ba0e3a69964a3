#[cfg(test)]
#[path = "auth_services_test.rs"]
mod tests;

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::Url;
use tokio_util::sync::CancellationToken;

use super::ApiClient;
use crate::domain::models::wire;
use crate::domain::models::ApiError;
use crate::domain::models::Session;
use crate::domain::models::SessionKey;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExchangeOutcome {
    Pending,
    Authenticated,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
pub enum AuthStatus {
    #[strum(serialize = "Authenticated")]
    Authenticated,
    #[strum(serialize = "Not authenticated")]
    NotAuthenticated,
}

fn backend_message(text: &str, fallback: &str) -> String {
    return wire::error_message(text).unwrap_or_else(|| return fallback.to_string());
}

/// Account flows: registration, GitHub login and session teardown.
pub struct AuthService<'a> {
    api: &'a ApiClient,
}

impl<'a> AuthService<'a> {
    pub fn new(api: &'a ApiClient) -> AuthService<'a> {
        return AuthService { api };
    }

    /// Registers a user and stores the temp token used to connect GitHub.
    pub async fn register_user(&self, form: wire::RegisterUserRequest) -> Result<String, ApiError> {
        let form = wire::RegisterUserRequest {
            full_name: form.full_name.trim().to_string(),
            email: form.email.trim().to_string(),
            group_name: form.group_name.trim().to_string(),
            github_repo: form.github_repo.trim().to_string(),
        };

        if form.full_name.is_empty()
            || form.email.is_empty()
            || form.group_name.is_empty()
            || form.github_repo.is_empty()
        {
            return Err(ApiError::Invalid("All fields are required".to_string()));
        }

        let (status, text) = self
            .api
            .post_with_identity("/api/auth/register", &form)
            .await?;
        if !status.is_success() {
            return Err(ApiError::request(
                status,
                Some(backend_message(&text, "Registration failed")),
            ));
        }

        let temp_token = match wire::decode::<wire::TempTokenResponse>(&text)?.temp_token {
            Some(token) => token,
            None => {
                return Err(ApiError::request(
                    status,
                    Some("Registration failed".to_string()),
                ))
            }
        };

        self.api.store().set_temp_token(&temp_token).await?;
        tracing::info!("User registered");

        return Ok(temp_token);
    }

    /// Starts a GitHub login for an existing account.
    pub async fn start_login(&self, email: &str) -> Result<String, ApiError> {
        let email = email.trim();
        if email.is_empty() {
            return Err(ApiError::Invalid("Email is required".to_string()));
        }

        let (status, text) = self
            .api
            .post_with_identity(
                "/api/auth/login/start",
                &wire::LoginStartRequest {
                    email: email.to_string(),
                },
            )
            .await?;

        if !status.is_success() {
            return Err(ApiError::request(
                status,
                Some(backend_message(&text, "Login failed")),
            ));
        }

        let temp_token = match wire::decode::<wire::TempTokenResponse>(&text)?.temp_token {
            Some(token) => token,
            None => return Err(ApiError::request(status, Some("Login failed".to_string()))),
        };

        self.api.store().set_temp_token(&temp_token).await?;
        return Ok(temp_token);
    }

    /// URL the user opens in a browser to authorise the GitHub app.
    pub async fn oauth_url(&self, temp_token: &str) -> Result<String, ApiError> {
        let base = format!("{}/api/auth/github/oauth", self.api.api_base().await?);
        let url = Url::parse_with_params(&base, &[("state", temp_token)])
            .map_err(|e| return ApiError::Invalid(format!("Invalid API base: {e}")))?;

        return Ok(url.to_string());
    }

    /// Trades a temp token for a session once the user finished the OAuth
    /// flow. `202 Accepted` means the browser step is still outstanding.
    pub async fn exchange(&self, temp_token: &str) -> Result<ExchangeOutcome, ApiError> {
        let (status, text) = self
            .api
            .post_with_identity(
                "/api/auth/exchange",
                &wire::ExchangeRequest {
                    temp_token: temp_token.to_string(),
                },
            )
            .await?;

        if status == StatusCode::ACCEPTED {
            return Ok(ExchangeOutcome::Pending);
        }

        if !status.is_success() {
            return Err(ApiError::request(status, wire::error_message(&text)));
        }

        let pair = wire::decode::<wire::TokenResponse>(&text)?;
        let token = match pair.token {
            Some(token) => token,
            None => {
                return Err(ApiError::request(
                    status,
                    Some("Exchange returned no token".to_string()),
                ))
            }
        };

        let store = self.api.store();
        store
            .set(&Session::with_tokens(&token, pair.refresh_token.as_deref()))
            .await?;
        store.clear(&[SessionKey::TempToken]).await?;
        tracing::info!("Session established");

        return Ok(ExchangeOutcome::Authenticated);
    }

    /// Repeats `exchange` every `interval` until it authenticates, the
    /// attempts run out or `cancel` fires.
    pub async fn wait_for_exchange(
        &self,
        temp_token: &str,
        attempts: u32,
        interval: Duration,
        cancel: &CancellationToken,
    ) -> Result<ExchangeOutcome, ApiError> {
        for attempt in 0..attempts {
            if attempt > 0 {
                tokio::select! {
                    _ = cancel.cancelled() => return Ok(ExchangeOutcome::Pending),
                    _ = tokio::time::sleep(interval) => {}
                }
            }

            if self.exchange(temp_token).await? == ExchangeOutcome::Authenticated {
                return Ok(ExchangeOutcome::Authenticated);
            }
            tracing::debug!(attempt, "Exchange still pending");
        }

        return Ok(ExchangeOutcome::Pending);
    }

    /// Stores the tokens carried by the OAuth success redirect.
    pub async fn complete_from_redirect(&self, redirect: &str) -> Result<AuthStatus, ApiError> {
        let url = Url::parse(redirect)
            .map_err(|e| return ApiError::Invalid(format!("Invalid redirect URL: {e}")))?;

        let mut session = Session::default();
        for (key, value) in url.query_pairs() {
            if value.is_empty() {
                continue;
            }

            match key.as_ref() {
                "reason" => return Err(ApiError::OAuth(value.to_string())),
                "token" => session.access_token = Some(value.to_string()),
                "refresh" => session.refresh_token = Some(value.to_string()),
                _ => {}
            }
        }

        if session.access_token.is_none() && session.refresh_token.is_none() {
            return Err(ApiError::Invalid(
                "Redirect URL carries no token".to_string(),
            ));
        }

        let store = self.api.store();
        store.set(&session).await?;
        if session.access_token.is_some() {
            store.clear(&[SessionKey::TempToken]).await?;
        }

        return self.status().await;
    }

    pub async fn logout(&self) -> Result<(), ApiError> {
        self.api
            .store()
            .clear(&[
                SessionKey::Token,
                SessionKey::RefreshToken,
                SessionKey::TempToken,
            ])
            .await?;

        return Ok(());
    }

    pub async fn status(&self) -> Result<AuthStatus, ApiError> {
        if self.api.store().get().await?.is_authenticated() {
            return Ok(AuthStatus::Authenticated);
        }

        return Ok(AuthStatus::NotAuthenticated);
    }
}
