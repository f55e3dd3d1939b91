//! JWKS URL source tests.
//!
//! Serves the key set from a mocked endpoint, rotates or breaks it, and
//! checks what the gateway accepts afterwards.

// Test code is allowed to use expect/unwrap for assertions
#![allow(clippy::unwrap_used, clippy::expect_used)]

use anyhow::Result;
use jwt_auth::config::KeySource;
use jwt_auth::jwks::JwksStore;
use jwt_auth::jwt::JwtVerifier;
use jwt_auth::{AuthError, AuthMetrics, Config, JwtGateway, TransportSecurity};
use jwt_auth_test_utils::*;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::MockServer;

fn url_config(url: String) -> Config {
    Config {
        auth_enabled: true,
        key_source: Some(KeySource::Url(url)),
        fetch_timeout: Duration::from_secs(2),
        ..Config::default()
    }
}

/// Gateway over a store the test refreshes by hand.
async fn gateway_with_store(server: &MockServer) -> Result<(JwtGateway, JwksStore)> {
    let url = mount_jwks(server, &jwks_document(vec![rs256_jwk()])).await;
    let config = url_config(url);

    let store = JwksStore::load(&config).await?;
    let verifier = JwtVerifier::new(Some(store.clone()), &config);
    Ok((JwtGateway::new(verifier, Arc::new(AuthMetrics::new())), store))
}

fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

// =============================================================================
// Rotation
// =============================================================================

#[tokio::test]
async fn test_rotated_out_key_is_not_found() -> Result<()> {
    let server = MockServer::start().await;
    let (gateway, store) = gateway_with_store(&server).await?;
    let token = TestTokenBuilder::new().sign_rs256(RSA_K1_PRIVATE_PEM, Some(RSA_K1_KID));

    gateway
        .authenticate(Some(&bearer(&token)))
        .assert_success("impala");

    server.reset().await;
    mount_jwks(&server, &jwks_document(vec![es256_jwk()])).await;
    store.refresh().await?;

    gateway
        .authenticate(Some(&bearer(&token)))
        .assert_failure(&AuthError::KeyNotFound);

    let rotated_in = TestTokenBuilder::new().sign_es256(EC_K2_PRIVATE_PEM, Some(EC_K2_KID));
    gateway
        .authenticate(Some(&bearer(&rotated_in)))
        .assert_success("impala");

    assert_counts(gateway.metrics(), 2, 1);
    Ok(())
}

#[tokio::test]
async fn test_background_refresh_rotates_keys() -> Result<()> {
    let server = MockServer::start().await;
    let url = mount_jwks(&server, &jwks_document(vec![rs256_jwk()])).await;
    let config = Config {
        refresh_interval: Duration::from_secs(1),
        ..url_config(url)
    };
    let cancel_token = CancellationToken::new();

    let (gateway, handle) = JwtGateway::start(
        &config,
        TransportSecurity::Tls,
        Arc::new(AuthMetrics::new()),
        cancel_token.clone(),
    )
    .await?;
    let handle = handle.expect("URL sources are refreshed");

    let token = TestTokenBuilder::new().sign_rs256(RSA_K1_PRIVATE_PEM, Some(RSA_K1_KID));
    gateway
        .authenticate(Some(&bearer(&token)))
        .assert_success("impala");

    server.reset().await;
    mount_jwks(&server, &jwks_document(vec![es256_jwk()])).await;

    // Poll until the refresh task has published the rotated set
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    loop {
        let outcome = gateway.authenticate(Some(&bearer(&token)));
        if outcome == jwt_auth::AuthOutcome::Failure(AuthError::KeyNotFound) {
            break;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "rotation never observed, last outcome {outcome:?}"
        );
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    cancel_token.cancel();
    tokio::time::timeout(Duration::from_secs(5), handle).await??;
    Ok(())
}

// =============================================================================
// Refresh failures
// =============================================================================

#[tokio::test]
async fn test_failed_refresh_keeps_previous_keys() -> Result<()> {
    let server = MockServer::start().await;
    let (gateway, store) = gateway_with_store(&server).await?;
    let before = store.current();

    server.reset().await;
    mount_jwks_status(&server, 503).await;
    let err = store.refresh().await.unwrap_err();
    assert!(matches!(err, AuthError::KeyFetchFailed(_)));

    assert!(Arc::ptr_eq(&before, &store.current()));
    let token = TestTokenBuilder::new().sign_rs256(RSA_K1_PRIVATE_PEM, Some(RSA_K1_KID));
    gateway
        .authenticate(Some(&bearer(&token)))
        .assert_success("impala");
    Ok(())
}

#[tokio::test]
async fn test_refresh_with_empty_key_set_is_skipped() -> Result<()> {
    let server = MockServer::start().await;
    let (gateway, store) = gateway_with_store(&server).await?;

    server.reset().await;
    mount_jwks(&server, &jwks_document(vec![])).await;
    assert!(matches!(
        store.refresh().await,
        Err(AuthError::MalformedKeyMaterial(_))
    ));

    let token = TestTokenBuilder::new().sign_rs256(RSA_K1_PRIVATE_PEM, Some(RSA_K1_KID));
    gateway
        .authenticate(Some(&bearer(&token)))
        .assert_success("impala");
    Ok(())
}

// =============================================================================
// Startup
// =============================================================================

#[tokio::test]
async fn test_unreachable_endpoint_at_startup_is_fatal() {
    let server = MockServer::start().await;
    let url = mount_jwks_status(&server, 404).await;

    let result = JwtGateway::start(
        &url_config(url),
        TransportSecurity::Tls,
        Arc::new(AuthMetrics::new()),
        CancellationToken::new(),
    )
    .await;
    assert!(matches!(result, Err(AuthError::KeyFetchFailed(_))));
}
