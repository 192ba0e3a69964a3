#[cfg(test)]
#[path = "wire_test.rs"]
mod tests;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde_json::Value;

use super::ExtensionIdentity;
use super::SubmissionReceipt;
use super::SubmissionState;
use super::SubmissionStatus;

// Request bodies.

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterExtensionRequest {
    pub extension_version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterUserRequest {
    pub full_name: String,
    pub email: String,
    pub group_name: String,
    pub github_repo: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginStartRequest {
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeRequest {
    pub temp_token: String,
}

// Responses. The backend mixes snake and camel case and sometimes sends
// numeric ids, so every field is optional and aliased.

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let res = match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(text)) if !text.is_empty() => Some(text),
        Some(Value::Number(num)) => Some(num.to_string()),
        _ => None,
    };

    return Ok(res);
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    #[serde(default, deserialize_with = "lenient_string")]
    pub message: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub error: Option<String>,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionRegistrationResponse {
    #[serde(default, alias = "extensionKey", deserialize_with = "lenient_string")]
    pub extension_key: Option<String>,
    #[serde(default, alias = "installId", deserialize_with = "lenient_string")]
    pub install_id: Option<String>,
}

impl ExtensionRegistrationResponse {
    pub fn identity(self) -> Option<ExtensionIdentity> {
        return Some(ExtensionIdentity {
            extension_key: self.extension_key?,
            install_id: self.install_id.unwrap_or_default(),
        });
    }
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    #[serde(
        default,
        alias = "access_token",
        alias = "accessToken",
        deserialize_with = "lenient_string"
    )]
    pub token: Option<String>,
    #[serde(default, alias = "refreshToken", deserialize_with = "lenient_string")]
    pub refresh_token: Option<String>,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TempTokenResponse {
    #[serde(default, alias = "tempToken", deserialize_with = "lenient_string")]
    pub temp_token: Option<String>,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionReceiptResponse {
    #[serde(default, deserialize_with = "lenient_string")]
    pub status: Option<String>,
    #[serde(
        default,
        alias = "submissionId",
        alias = "id",
        deserialize_with = "lenient_string"
    )]
    pub submission_id: Option<String>,
}

impl From<SubmissionReceiptResponse> for SubmissionReceipt {
    fn from(res: SubmissionReceiptResponse) -> SubmissionReceipt {
        return SubmissionReceipt {
            status: res.status.unwrap_or_default(),
            submission_id: res.submission_id,
        };
    }
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionStatusResponse {
    #[serde(default)]
    pub status: Option<SubmissionState>,
    #[serde(default, alias = "githubCommitUrl", deserialize_with = "lenient_string")]
    pub github_commit_url: Option<String>,
    #[serde(default, alias = "sheetUpdated")]
    pub sheet_updated: Option<bool>,
}

impl From<SubmissionStatusResponse> for SubmissionStatus {
    fn from(res: SubmissionStatusResponse) -> SubmissionStatus {
        return SubmissionStatus {
            status: res.status.unwrap_or_default(),
            github_commit_url: res.github_commit_url,
            sheet_updated: res.sheet_updated,
        };
    }
}

/// Parses a response body, treating an empty body as `null`.
pub fn parse_body(text: &str) -> Result<Value, serde_json::Error> {
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }

    return serde_json::from_str(text);
}

/// Decodes a raw response body. An empty body or `null` yields the default.
pub fn decode<T: DeserializeOwned + Default>(text: &str) -> Result<T, serde_json::Error> {
    if text.trim().is_empty() {
        return Ok(T::default());
    }

    return Ok(serde_json::from_str::<Option<T>>(text)?.unwrap_or_default());
}

/// Decodes a body already parsed by `ApiClient::call`.
pub fn from_body<T: DeserializeOwned + Default>(body: Value) -> Result<T, serde_json::Error> {
    return Ok(serde_json::from_value::<Option<T>>(body)?.unwrap_or_default());
}

/// Backend-provided error message, if the body carries one.
pub fn error_message(text: &str) -> Option<String> {
    let res = serde_json::from_str::<ErrorResponse>(text).ok()?;
    return res.message.or(res.error);
}
