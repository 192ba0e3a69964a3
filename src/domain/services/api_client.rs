#[cfg(test)]
#[path = "api_client_test.rs"]
mod tests;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::header::HeaderName;
use reqwest::header::HeaderValue;
use reqwest::header::AUTHORIZATION;
use reqwest::header::CONTENT_TYPE;
use reqwest::Method;
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;

use super::IdentityBootstrap;
use super::SessionStore;
use crate::domain::models::wire;
use crate::domain::models::ApiError;
use crate::domain::models::RetryPolicy;
use crate::domain::models::Session;
use crate::domain::models::SubmissionStatus;

pub const EXTENSION_KEY_HEADER: &str = "x-extension-key";

/// Method, body and extra headers of one backend call.
#[derive(Clone, Debug)]
pub struct RequestOptions {
    pub method: Method,
    pub body: Option<Value>,
    pub headers: HeaderMap,
}

impl Default for RequestOptions {
    fn default() -> RequestOptions {
        return RequestOptions {
            method: Method::GET,
            body: None,
            headers: HeaderMap::new(),
        };
    }
}

impl RequestOptions {
    pub fn get() -> RequestOptions {
        return RequestOptions::default();
    }

    pub fn post<T: Serialize>(body: &T) -> Result<RequestOptions, ApiError> {
        return Ok(RequestOptions {
            method: Method::POST,
            body: Some(serde_json::to_value(body)?),
            headers: HeaderMap::new(),
        });
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Result<RequestOptions, ApiError> {
        self.headers.insert(
            HeaderName::from_bytes(name.as_bytes())?,
            HeaderValue::from_str(value)?,
        );
        return Ok(self);
    }
}

/// Source of submission status snapshots for the poller.
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn fetch_status(&self, submission_id: &str) -> Result<SubmissionStatus, ApiError>;
}

/// Client for the tracking backend. Injects the session and extension
/// identity into every call and refreshes an expired access token once.
pub struct ApiClient {
    store: SessionStore,
    identity: IdentityBootstrap,
    http: reqwest::Client,
    default_api_base: String,
    policy: RetryPolicy,
}

impl ApiClient {
    pub fn new(store: SessionStore, default_api_base: &str) -> ApiClient {
        let http = reqwest::Client::new();
        let identity = IdentityBootstrap::new(
            store.clone(),
            http.clone(),
            default_api_base,
            env!("CARGO_PKG_VERSION"),
        );

        return ApiClient {
            store,
            identity,
            http,
            default_api_base: default_api_base.to_string(),
            policy: RetryPolicy::default(),
        };
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> ApiClient {
        self.policy = policy;
        return self;
    }

    pub fn store(&self) -> &SessionStore {
        return &self.store;
    }

    pub fn identity(&self) -> &IdentityBootstrap {
        return &self.identity;
    }

    pub async fn api_base(&self) -> Result<String, ApiError> {
        return Ok(self.store.api_base(&self.default_api_base).await?);
    }

    /// Performs an authenticated call against `{apiBase}{path}` and returns
    /// the parsed JSON body.
    pub async fn call(&self, path: &str, options: RequestOptions) -> Result<Value, ApiError> {
        let mut attempt = 0;
        loop {
            let session = self.store.get().await?;
            let token = match session.access_token {
                Some(token) => token,
                None => return Err(ApiError::NotAuthenticated),
            };

            let extension_key = self.identity.ensure_extension_key().await?;
            let headers = default_headers(&token, &extension_key, &options.headers)?;
            let url = format!("{}{path}", self.api_base().await?);

            let mut req = self
                .http
                .request(options.method.clone(), &url)
                .headers(headers);
            if let Some(body) = &options.body {
                req = req.body(serde_json::to_string(body)?);
            }

            let res = req.send().await?;
            let status = res.status();
            tracing::debug!(
                method = %options.method,
                path,
                status = status.as_u16(),
                attempt,
                "Backend call"
            );

            if self.policy.should_refresh(status, attempt) {
                if !self.refresh().await? {
                    return Err(ApiError::NotAuthenticated);
                }

                attempt += 1;
                continue;
            }

            let text = res.text().await?;
            if !status.is_success() {
                tracing::error!(status = status.as_u16(), path, "Backend call failed");
                return Err(ApiError::request(status, wire::error_message(&text)));
            }

            return Ok(wire::parse_body(&text)?);
        }
    }

    /// Exchanges the stored refresh token for a new access token. A missing
    /// refresh token or a rejected refresh yields `false`.
    pub async fn refresh(&self) -> Result<bool, ApiError> {
        let refresh_token = match self.store.get().await?.refresh_token {
            Some(token) => token,
            None => return Ok(false),
        };

        let extension_key = self.identity.ensure_extension_key().await?;
        let url = format!("{}/api/auth/refresh", self.api_base().await?);
        let res = self
            .http
            .post(url)
            .header(EXTENSION_KEY_HEADER, extension_key)
            .json(&wire::RefreshRequest { refresh_token })
            .send()
            .await;

        let res = match res {
            Ok(res) => res,
            Err(err) => {
                tracing::warn!(error = ?err, "Token refresh request failed");
                return Ok(false);
            }
        };

        if !res.status().is_success() {
            tracing::warn!(status = res.status().as_u16(), "Token refresh rejected");
            return Ok(false);
        }

        let pair = match res
            .text()
            .await
            .map(|text| return wire::decode::<wire::TokenResponse>(&text))
        {
            Ok(Ok(pair)) => pair,
            _ => {
                tracing::warn!("Token refresh returned an unreadable body");
                return Ok(false);
            }
        };

        let token = match pair.token {
            Some(token) => token,
            None => return Ok(false),
        };

        self.store
            .set(&Session::with_tokens(&token, pair.refresh_token.as_deref()))
            .await?;

        return Ok(true);
    }

    /// Calls an endpoint that identifies the installation but not the user.
    /// Returns the raw status and body so callers can branch on non-error
    /// codes such as `202 Accepted`.
    pub async fn post_with_identity<T: Serialize + Sync>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<(StatusCode, String), ApiError> {
        let extension_key = self.identity.ensure_extension_key().await?;
        let url = format!("{}{path}", self.api_base().await?);
        let res = self
            .http
            .post(url)
            .header(EXTENSION_KEY_HEADER, extension_key)
            .json(body)
            .send()
            .await?;

        let status = res.status();
        let text = res.text().await?;
        tracing::debug!(path, status = status.as_u16(), "Identity call");

        return Ok((status, text));
    }
}

fn default_headers(
    token: &str,
    extension_key: &str,
    overrides: &HeaderMap,
) -> Result<HeaderMap, ApiError> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {token}"))?,
    );
    headers.insert(
        HeaderName::from_static(EXTENSION_KEY_HEADER),
        HeaderValue::from_str(extension_key)?,
    );

    for (name, value) in overrides {
        headers.insert(name.clone(), value.clone());
    }

    return Ok(headers);
}

#[async_trait]
impl StatusSource for ApiClient {
    #[allow(clippy::implicit_return)]
    async fn fetch_status(&self, submission_id: &str) -> Result<SubmissionStatus, ApiError> {
        let body = self
            .call(
                &format!("/api/submissions/{submission_id}/status"),
                RequestOptions::get(),
            )
            .await?;

        return Ok(wire::from_body::<wire::SubmissionStatusResponse>(body)?.into());
    }
}
