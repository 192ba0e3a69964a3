use std::sync::Arc;

use anyhow::Result;
use mockito::Matcher;
use serde_json::json;
use serde_json::Value;

use super::ApiClient;
use super::RequestOptions;
use super::StatusSource;
use crate::domain::models::ApiError;
use crate::domain::models::SubmissionState;
use crate::domain::services::SessionStore;
use crate::infrastructure::storage::memory::MemoryStore;

fn client(url: &str, values: &[(&str, &str)]) -> (Arc<MemoryStore>, ApiClient) {
    let mut values = values.to_vec();
    values.push(("apiBase", url));
    let storage = Arc::new(MemoryStore::with_values(&values));
    let client = ApiClient::new(SessionStore::new(storage.clone()), url);
    return (storage, client);
}

fn submission_body() -> Value {
    return json!({
        "question_url": "https://leetcode.com/problems/two-sum/",
        "question_key": "two-sum",
        "title": "Two Sum",
        "code": "print(1)",
        "language": "python",
        "trial_count": 1,
        "time_minutes": 15
    });
}

fn submit_options() -> RequestOptions {
    return RequestOptions::post(&submission_body()).unwrap();
}

#[tokio::test]
async fn it_fails_without_token_and_sends_nothing() -> Result<()> {
    let mut server = mockito::Server::new_async().await;
    let post_mock = server
        .mock("POST", Matcher::Any)
        .expect(0)
        .create_async()
        .await;
    let get_mock = server
        .mock("GET", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let (_, client) = client(&server.url(), &[]);
    let err = client
        .call("/api/submissions/leetcode", submit_options())
        .await
        .unwrap_err();

    post_mock.assert_async().await;
    get_mock.assert_async().await;
    assert!(matches!(err, ApiError::NotAuthenticated));
    assert!(err.is_auth());
    return Ok(());
}

#[tokio::test]
async fn it_submits_with_session_headers() -> Result<()> {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/api/submissions/leetcode")
        .match_header("content-type", "application/json")
        .match_header("authorization", "Bearer abc")
        .match_header("x-extension-key", "ek")
        .match_body(Matcher::Json(submission_body()))
        .with_status(200)
        .with_body(json!({ "status": "queued", "submissionId": "abc123" }).to_string())
        .expect(1)
        .create_async()
        .await;

    let (_, client) = client(
        &server.url(),
        &[("token", "abc"), ("extensionKey", "ek")],
    );
    let res = client
        .call("/api/submissions/leetcode", submit_options())
        .await?;

    mock.assert_async().await;
    assert_eq!(res, json!({ "status": "queued", "submissionId": "abc123" }));
    return Ok(());
}

#[tokio::test]
async fn it_bootstraps_identity_before_first_call() -> Result<()> {
    let mut server = mockito::Server::new_async().await;
    let register_mock = server
        .mock("POST", "/api/extension/register")
        .with_status(200)
        .with_body(json!({ "extension_key": "ek_new", "install_id": "in_1" }).to_string())
        .expect(1)
        .create_async()
        .await;
    let status_mock = server
        .mock("GET", "/api/submissions/abc123/status")
        .match_header("x-extension-key", "ek_new")
        .with_status(200)
        .with_body(test_utils::status_body("pending"))
        .expect(2)
        .create_async()
        .await;

    let (storage, client) = client(&server.url(), &[("token", "abc")]);
    client.call("/api/submissions/abc123/status", RequestOptions::get()).await?;
    client.call("/api/submissions/abc123/status", RequestOptions::get()).await?;

    register_mock.assert_async().await;
    status_mock.assert_async().await;
    assert_eq!(storage.value("extensionKey"), Some("ek_new".to_string()));
    return Ok(());
}

#[tokio::test]
async fn it_lets_caller_headers_override_defaults() -> Result<()> {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/api/me")
        .match_header("authorization", "Bearer override")
        .match_header("x-extension-key", "ek")
        .match_header("x-request-source", "cli")
        .with_status(200)
        .with_body("{}")
        .create_async()
        .await;

    let (_, client) = client(
        &server.url(),
        &[("token", "abc"), ("extensionKey", "ek")],
    );
    let options = RequestOptions::get()
        .with_header("authorization", "Bearer override")?
        .with_header("x-request-source", "cli")?;
    client.call("/api/me", options).await?;

    mock.assert_async().await;
    return Ok(());
}

#[tokio::test]
async fn it_accepts_mixed_case_header_names() -> Result<()> {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/api/me")
        .match_header("x-request-source", "cli")
        .with_status(200)
        .with_body("{}")
        .create_async()
        .await;

    let (_, client) = client(
        &server.url(),
        &[("token", "abc"), ("extensionKey", "ek")],
    );
    let options = RequestOptions::get().with_header("X-Request-Source", "cli")?;
    client.call("/api/me", options).await?;

    mock.assert_async().await;
    return Ok(());
}

#[test]
fn it_rejects_invalid_header_names() {
    let err = RequestOptions::get()
        .with_header("bad header", "cli")
        .unwrap_err();

    assert!(matches!(err, ApiError::InvalidHeaderName(_)));
}

#[tokio::test]
async fn it_refreshes_once_and_retries_on_unauthorized() -> Result<()> {
    let mut server = mockito::Server::new_async().await;
    let expired_mock = server
        .mock("POST", "/api/submissions/leetcode")
        .match_header("authorization", "Bearer old")
        .with_status(401)
        .with_body(json!({ "message": "Token expired" }).to_string())
        .expect(1)
        .create_async()
        .await;
    let refresh_mock = server
        .mock("POST", "/api/auth/refresh")
        .match_header("x-extension-key", "ek")
        .match_body(Matcher::Json(json!({ "refresh_token": "r1" })))
        .with_status(200)
        .with_body(json!({ "token": "new", "refresh_token": "r2" }).to_string())
        .expect(1)
        .create_async()
        .await;
    let retried_mock = server
        .mock("POST", "/api/submissions/leetcode")
        .match_header("authorization", "Bearer new")
        .match_body(Matcher::Json(submission_body()))
        .with_status(200)
        .with_body(json!({ "status": "queued", "submissionId": "abc123" }).to_string())
        .expect(1)
        .create_async()
        .await;

    let (storage, client) = client(
        &server.url(),
        &[("token", "old"), ("refreshToken", "r1"), ("extensionKey", "ek")],
    );
    let res = client
        .call("/api/submissions/leetcode", submit_options())
        .await?;

    expired_mock.assert_async().await;
    refresh_mock.assert_async().await;
    retried_mock.assert_async().await;
    assert_eq!(res["submissionId"], "abc123");
    assert_eq!(storage.value("token"), Some("new".to_string()));
    assert_eq!(storage.value("refreshToken"), Some("r2".to_string()));
    return Ok(());
}

#[tokio::test]
async fn it_surfaces_error_when_retry_fails() -> Result<()> {
    let mut server = mockito::Server::new_async().await;
    let expired_mock = server
        .mock("GET", "/api/submissions/abc123/status")
        .match_header("authorization", "Bearer old")
        .with_status(401)
        .expect(1)
        .create_async()
        .await;
    let refresh_mock = server
        .mock("POST", "/api/auth/refresh")
        .with_status(200)
        .with_body(json!({ "token": "new" }).to_string())
        .expect(1)
        .create_async()
        .await;
    let retried_mock = server
        .mock("GET", "/api/submissions/abc123/status")
        .match_header("authorization", "Bearer new")
        .with_status(401)
        .with_body(json!({ "message": "Token revoked" }).to_string())
        .expect(1)
        .create_async()
        .await;

    let (_, client) = client(
        &server.url(),
        &[("token", "old"), ("refreshToken", "r1"), ("extensionKey", "ek")],
    );
    let err = client
        .call("/api/submissions/abc123/status", RequestOptions::get())
        .await
        .unwrap_err();

    expired_mock.assert_async().await;
    refresh_mock.assert_async().await;
    retried_mock.assert_async().await;
    assert_eq!(err.status(), Some(401));
    insta::assert_snapshot!(err.to_string(), @"Token revoked");
    return Ok(());
}

#[tokio::test]
async fn it_fails_auth_when_refresh_is_rejected() -> Result<()> {
    let mut server = mockito::Server::new_async().await;
    let expired_mock = server
        .mock("GET", "/api/submissions/abc123/status")
        .with_status(401)
        .expect(1)
        .create_async()
        .await;
    let refresh_mock = server
        .mock("POST", "/api/auth/refresh")
        .with_status(401)
        .with_body(json!({ "message": "Refresh token expired" }).to_string())
        .expect(1)
        .create_async()
        .await;

    let (storage, client) = client(
        &server.url(),
        &[("token", "old"), ("refreshToken", "r1"), ("extensionKey", "ek")],
    );
    let err = client
        .call("/api/submissions/abc123/status", RequestOptions::get())
        .await
        .unwrap_err();

    expired_mock.assert_async().await;
    refresh_mock.assert_async().await;
    assert!(err.is_auth());
    assert_eq!(storage.value("token"), Some("old".to_string()));
    return Ok(());
}

#[tokio::test]
async fn it_fails_auth_on_unauthorized_without_refresh_token() -> Result<()> {
    let mut server = mockito::Server::new_async().await;
    let expired_mock = server
        .mock("GET", "/api/submissions/abc123/status")
        .with_status(401)
        .expect(1)
        .create_async()
        .await;
    let refresh_mock = server
        .mock("POST", "/api/auth/refresh")
        .expect(0)
        .create_async()
        .await;

    let (_, client) = client(
        &server.url(),
        &[("token", "old"), ("extensionKey", "ek")],
    );
    let err = client
        .call("/api/submissions/abc123/status", RequestOptions::get())
        .await
        .unwrap_err();

    expired_mock.assert_async().await;
    refresh_mock.assert_async().await;
    assert!(err.is_auth());
    return Ok(());
}

#[tokio::test]
async fn it_reports_status_when_backend_has_no_message() -> Result<()> {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/api/submissions/leetcode")
        .with_status(500)
        .with_body("<html>oops</html>")
        .create_async()
        .await;

    let (_, client) = client(
        &server.url(),
        &[("token", "abc"), ("extensionKey", "ek")],
    );
    let err = client
        .call("/api/submissions/leetcode", submit_options())
        .await
        .unwrap_err();

    mock.assert_async().await;
    insta::assert_snapshot!(err.to_string(), @"Request failed: 500");
    return Ok(());
}

#[tokio::test]
async fn it_returns_null_for_empty_success_body() -> Result<()> {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/api/submissions/leetcode")
        .with_status(204)
        .create_async()
        .await;

    let (_, client) = client(
        &server.url(),
        &[("token", "abc"), ("extensionKey", "ek")],
    );
    let res = client
        .call("/api/submissions/leetcode", submit_options())
        .await?;

    mock.assert_async().await;
    assert_eq!(res, Value::Null);
    return Ok(());
}

#[tokio::test]
async fn it_skips_refresh_without_refresh_token() -> Result<()> {
    let mut server = mockito::Server::new_async().await;
    let post_mock = server
        .mock("POST", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let (_, client) = client(&server.url(), &[("token", "abc")]);
    let refreshed = client.refresh().await?;

    post_mock.assert_async().await;
    assert!(!refreshed);
    return Ok(());
}

#[tokio::test]
async fn it_keeps_refresh_token_when_not_rotated() -> Result<()> {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/api/auth/refresh")
        .with_status(200)
        .with_body(json!({ "token": "new" }).to_string())
        .create_async()
        .await;

    let (storage, client) = client(
        &server.url(),
        &[("token", "old"), ("a2svRefreshToken", "r1"), ("extensionKey", "ek")],
    );
    let refreshed = client.refresh().await?;

    mock.assert_async().await;
    assert!(refreshed);
    assert_eq!(storage.value("token"), Some("new".to_string()));
    assert_eq!(storage.value("a2svRefreshToken"), Some("r1".to_string()));
    assert_eq!(client.store().get().await?.refresh_token, Some("r1".to_string()));
    return Ok(());
}

#[tokio::test]
async fn it_treats_refresh_without_token_field_as_failure() -> Result<()> {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/api/auth/refresh")
        .with_status(200)
        .with_body("{}")
        .create_async()
        .await;

    let (storage, client) = client(
        &server.url(),
        &[("token", "old"), ("refreshToken", "r1"), ("extensionKey", "ek")],
    );
    let refreshed = client.refresh().await?;

    mock.assert_async().await;
    assert!(!refreshed);
    assert_eq!(storage.value("token"), Some("old".to_string()));
    return Ok(());
}

#[tokio::test]
async fn it_fetches_submission_status() -> Result<()> {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/api/submissions/abc123/status")
        .with_status(200)
        .with_body(
            json!({
                "status": "completed",
                "githubCommitUrl": "https://github.com/me/solutions/commit/1",
                "sheetUpdated": true
            })
            .to_string(),
        )
        .create_async()
        .await;

    let (_, client) = client(
        &server.url(),
        &[("token", "abc"), ("extensionKey", "ek")],
    );
    let status = client.fetch_status("abc123").await?;

    mock.assert_async().await;
    assert_eq!(status.status, SubmissionState::Completed);
    assert!(status.is_pushed());
    assert!(status.is_sheet_updated());
    return Ok(());
}
