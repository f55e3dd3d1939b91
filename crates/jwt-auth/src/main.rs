//! `jwt-auth-check`: check a key source and tokens from the command line.
//!
//! Reads configuration from the environment, starts the gateway, then
//! authenticates one `Authorization` header value per stdin line:
//!
//! ```text
//! $ echo "Bearer eyJ..." | JWT_TOKEN_AUTH=true JWKS_URL=https://... jwt-auth-check
//! ok impala
//! total-jwt-token-auth-success 1
//! total-jwt-token-auth-failure 0
//! ```
//!
//! Pass `--plaintext` to start as a plaintext frontend would.

use anyhow::Context;
use jwt_auth::{AuthMetrics, AuthOutcome, Config, JwtGateway, TransportSecurity};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries results
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "jwt_auth=info,common=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let transport = if std::env::args().any(|arg| arg == "--plaintext") {
        TransportSecurity::Plaintext
    } else {
        TransportSecurity::Tls
    };

    let config = Config::from_env().map_err(|e| {
        error!(target: "jwt_auth.check", error = %e, "Failed to load configuration");
        e
    })?;

    let metrics = Arc::new(AuthMetrics::new());
    let cancel_token = CancellationToken::new();

    let (gateway, refresh_handle) =
        match JwtGateway::start(&config, transport, Arc::clone(&metrics), cancel_token.clone())
            .await
        {
            Ok(started) => started,
            Err(e) => {
                error!(target: "jwt_auth.check", error = %e, "Failed to start JWT authentication");
                std::process::exit(1);
            }
        };

    info!(target: "jwt_auth.check", enabled = gateway.is_enabled(), "Reading header values from stdin");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        let header = line.trim_end_matches('\r');
        let header = (!header.is_empty()).then_some(header);

        match gateway.authenticate(header) {
            AuthOutcome::Success(identity) => println!("ok {identity}"),
            AuthOutcome::Failure(e) => println!("denied {}", e.kind()),
            AuthOutcome::NotAttempted => println!("not_attempted"),
        }
    }

    for (name, value) in metrics.exported() {
        println!("{name} {value}");
    }

    cancel_token.cancel();
    if let Some(handle) = refresh_handle {
        handle.await.context("JWKS refresh task panicked")?;
    }

    Ok(())
}
