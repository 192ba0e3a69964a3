use std::sync::Arc;

use anyhow::Result;
use mockito::Matcher;
use serde_json::json;

use super::IdentityBootstrap;
use crate::domain::models::ApiError;
use crate::domain::services::SessionStore;
use crate::infrastructure::storage::memory::MemoryStore;

fn bootstrap(url: &str, values: &[(&str, &str)]) -> (Arc<MemoryStore>, IdentityBootstrap) {
    let mut values = values.to_vec();
    values.push(("apiBase", url));
    let storage = Arc::new(MemoryStore::with_values(&values));
    let store = SessionStore::new(storage.clone());
    let identity = IdentityBootstrap::new(store, reqwest::Client::new(), url, "1.2.3");
    return (storage, identity);
}

#[tokio::test]
async fn it_registers_once_and_caches_the_key() -> Result<()> {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/api/extension/register")
        .match_header("content-type", "application/json")
        .match_header("x-extension-key", Matcher::Missing)
        .match_body(Matcher::Json(json!({ "extension_version": "1.2.3" })))
        .with_status(200)
        .with_body(json!({ "extension_key": "ek_1", "install_id": "in_1" }).to_string())
        .expect(1)
        .create_async()
        .await;

    let (storage, identity) = bootstrap(&server.url(), &[]);
    let first = identity.ensure_extension_key().await?;
    let second = identity.ensure_extension_key().await?;

    mock.assert_async().await;
    assert_eq!(first, "ek_1");
    assert_eq!(second, "ek_1");
    assert_eq!(storage.value("extensionKey"), Some("ek_1".to_string()));
    assert_eq!(storage.value("installId"), Some("in_1".to_string()));
    return Ok(());
}

#[tokio::test]
async fn it_uses_stored_key_without_network() -> Result<()> {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/api/extension/register")
        .expect(0)
        .create_async()
        .await;

    let (_, identity) = bootstrap(&server.url(), &[("a2svExtensionKey", "legacy")]);
    let key = identity.ensure_extension_key().await?;

    mock.assert_async().await;
    assert_eq!(key, "legacy");
    return Ok(());
}

#[tokio::test]
async fn it_shares_one_registration_between_concurrent_callers() -> Result<()> {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/api/extension/register")
        .with_status(200)
        .with_body(json!({ "extension_key": "ek_1", "install_id": "in_1" }).to_string())
        .expect(1)
        .create_async()
        .await;

    let (_, identity) = bootstrap(&server.url(), &[]);
    let (first, second) = tokio::join!(
        identity.ensure_extension_key(),
        identity.ensure_extension_key()
    );

    mock.assert_async().await;
    assert_eq!(first?, "ek_1");
    assert_eq!(second?, "ek_1");
    return Ok(());
}

#[tokio::test]
async fn it_surfaces_backend_registration_errors() -> Result<()> {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/api/extension/register")
        .with_status(429)
        .with_body(json!({ "message": "Too many installs" }).to_string())
        .create_async()
        .await;

    let (storage, identity) = bootstrap(&server.url(), &[]);
    let err = identity.ensure_extension_key().await.unwrap_err();

    mock.assert_async().await;
    assert!(matches!(err, ApiError::Registration(_)));
    insta::assert_snapshot!(err.to_string(), @"Too many installs");
    assert_eq!(storage.value("extensionKey"), None);
    return Ok(());
}

#[tokio::test]
async fn it_falls_back_to_generic_registration_error() -> Result<()> {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/api/extension/register")
        .with_status(500)
        .with_body("Internal Server Error")
        .create_async()
        .await;

    let (_, identity) = bootstrap(&server.url(), &[]);
    let err = identity.ensure_extension_key().await.unwrap_err();

    mock.assert_async().await;
    insta::assert_snapshot!(err.to_string(), @"Extension registration failed");
    return Ok(());
}
