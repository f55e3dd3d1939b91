//! Verification gateway.
//!
//! Entry point for the RPC frontend: takes the raw `Authorization` header
//! value, strips the `Bearer ` prefix, verifies the token, and records the
//! outcome. Requests without a Bearer header are `NotAttempted` so the
//! frontend can fall back to another scheme (e.g. Basic) without this
//! mechanism counting a failure.

use std::fmt;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use crate::config::Config;
use crate::errors::AuthError;
use crate::jwks::JwksStore;
use crate::jwt::JwtVerifier;
use crate::observability::metrics::AuthMetrics;
use crate::tasks::start_jwks_refresh;

/// Literal, case-sensitive scheme prefix.
const BEARER_PREFIX: &str = "Bearer ";

/// Result of one authentication attempt.
#[derive(Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    /// Token verified; carries the login identity.
    Success(String),

    /// A Bearer token was presented and rejected.
    Failure(AuthError),

    /// No Bearer token; this mechanism did not run.
    NotAttempted,
}

impl AuthOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Identity on success.
    pub fn identity(&self) -> Option<&str> {
        match self {
            Self::Success(identity) => Some(identity),
            _ => None,
        }
    }
}

impl fmt::Debug for AuthOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success(_) => f.write_str("Success([REDACTED])"),
            Self::Failure(error) => f.debug_tuple("Failure").field(error).finish(),
            Self::NotAttempted => f.write_str("NotAttempted"),
        }
    }
}

/// Security of the frontend channel the header arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportSecurity {
    Tls,
    Plaintext,
}

/// JWT authentication mechanism as seen by the frontend.
///
/// Cloning is cheap; clones share the key store and the counters.
#[derive(Debug, Clone)]
pub struct JwtGateway {
    verifier: Option<JwtVerifier>,
    metrics: Arc<AuthMetrics>,
}

impl JwtGateway {
    /// Gateway over an existing verifier.
    pub fn new(verifier: JwtVerifier, metrics: Arc<AuthMetrics>) -> Self {
        Self {
            verifier: Some(verifier),
            metrics,
        }
    }

    /// Gateway that answers `NotAttempted` to everything.
    pub fn disabled(metrics: Arc<AuthMetrics>) -> Self {
        Self {
            verifier: None,
            metrics,
        }
    }

    /// Build the gateway from configuration.
    ///
    /// Loads the key source once (a failure here is fatal to startup) and,
    /// for URL sources, spawns the refresh task bound to `cancel_token`.
    /// The returned handle finishes after cancellation.
    ///
    /// # Errors
    ///
    /// - `Configuration` - plaintext transport not allowed, or no key source
    ///   while signature validation is on
    /// - `KeyFetchFailed` / `MalformedKeyMaterial` - initial load failed
    #[instrument(skip_all)]
    pub async fn start(
        config: &Config,
        transport: TransportSecurity,
        metrics: Arc<AuthMetrics>,
        cancel_token: CancellationToken,
    ) -> Result<(Self, Option<JoinHandle<()>>), AuthError> {
        if !config.auth_enabled {
            tracing::info!(target: "jwt_auth.gateway", "JWT token authentication disabled");
            return Ok((Self::disabled(metrics), None));
        }

        if transport == TransportSecurity::Plaintext && !config.allow_without_transport_security {
            return Err(AuthError::Configuration(
                "JWT authentication over a plaintext transport requires JWT_ALLOW_WITHOUT_TLS"
                    .to_string(),
            ));
        }

        let store = match &config.key_source {
            Some(_) => Some(JwksStore::load(config).await?),
            None if config.validate_signature => {
                return Err(AuthError::Configuration(
                    "signature validation requires JWKS_FILE_PATH or JWKS_URL".to_string(),
                ));
            }
            None => None,
        };

        let refresh_handle = store
            .as_ref()
            .filter(|store| store.is_refreshable())
            .map(|store| {
                tokio::spawn(start_jwks_refresh(
                    store.clone(),
                    config.refresh_interval,
                    cancel_token.clone(),
                ))
            });

        tracing::info!(
            target: "jwt_auth.gateway",
            validate_signature = config.validate_signature,
            key_source = ?config.key_source.as_ref().map(ToString::to_string),
            username_claim = %config.username_claim,
            refresh = refresh_handle.is_some(),
            "JWT token authentication enabled"
        );

        let verifier = JwtVerifier::new(store, config);
        Ok((Self::new(verifier, metrics), refresh_handle))
    }

    /// Authenticate one request from its `Authorization` header value.
    ///
    /// Absent or non-Bearer headers are `NotAttempted` and leave the
    /// counters untouched; every other outcome increments exactly one.
    pub fn authenticate(&self, header_value: Option<&str>) -> AuthOutcome {
        let Some(verifier) = &self.verifier else {
            return AuthOutcome::NotAttempted;
        };

        let Some(token) = header_value.and_then(|value| value.strip_prefix(BEARER_PREFIX)) else {
            return AuthOutcome::NotAttempted;
        };

        match verifier.verify(token) {
            Ok(identity) => {
                self.metrics.record_success();
                tracing::debug!(target: "jwt_auth.gateway", "JWT authentication succeeded");
                AuthOutcome::Success(identity)
            }
            Err(error) => {
                self.metrics.record_failure(&error);
                tracing::debug!(
                    target: "jwt_auth.gateway",
                    reason = error.kind(),
                    "JWT authentication failed"
                );
                AuthOutcome::Failure(error)
            }
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.verifier.is_some()
    }

    pub fn metrics(&self) -> &Arc<AuthMetrics> {
        &self.metrics
    }
}
