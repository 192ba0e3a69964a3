#[cfg(test)]
#[path = "api_error_test.rs"]
mod tests;

use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// No usable session. The user has to register or log in again.
    #[error("Not authenticated. Please register or log in.")]
    NotAuthenticated,

    /// The installation could not obtain an extension identity.
    #[error("{0}")]
    Registration(String),

    /// Input rejected before anything is sent.
    #[error("{0}")]
    Invalid(String),

    /// The OAuth flow redirected back with a failure reason.
    #[error("Reason: {0}")]
    OAuth(String),

    #[error("{message}")]
    Request { status: u16, message: String },

    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid response from backend: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),

    #[error("Invalid header name: {0}")]
    InvalidHeaderName(#[from] reqwest::header::InvalidHeaderName),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl ApiError {
    pub fn request(status: StatusCode, message: Option<String>) -> ApiError {
        let message =
            message.unwrap_or_else(|| return format!("Request failed: {}", status.as_u16()));
        return ApiError::Request {
            status: status.as_u16(),
            message,
        };
    }

    /// True when the user has to authenticate again rather than retry.
    pub fn is_auth(&self) -> bool {
        return matches!(self, ApiError::NotAuthenticated);
    }

    pub fn status(&self) -> Option<u16> {
        return match self {
            ApiError::Request { status, .. } => Some(*status),
            ApiError::Transport(err) => err.status().map(|e| return e.as_u16()),
            _ => None,
        };
    }
}
