//! Authentication outcome metrics.
//!
//! [`AuthMetrics`] is the process-wide reporter: it is created once at
//! startup and passed to the gateway as an `Arc`. It owns two atomic
//! counters read back through [`AuthMetrics::success_count`] and
//! [`AuthMetrics::failure_count`], exported under the names
//! `total-jwt-token-auth-success` and `total-jwt-token-auth-failure`.
//! Every increment is mirrored to the `metrics` facade, so an installed
//! recorder sees the same events.
//!
//! Facade metrics follow Prometheus naming conventions:
//! - `jwt_auth_` prefix
//! - `_total` suffix for counters
//!
//! # Cardinality
//!
//! Labels are bounded to prevent cardinality explosion:
//! - `reason`: bounded by `AuthError` variants (see `AuthError::kind`)
//! - `status`: 2 values (success, error)

use metrics::{counter, gauge};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::errors::AuthError;

/// Exported name of the success counter.
pub const SUCCESS_COUNTER_NAME: &str = "total-jwt-token-auth-success";

/// Exported name of the failure counter.
pub const FAILURE_COUNTER_NAME: &str = "total-jwt-token-auth-failure";

/// Success/failure counters for JWT authentication.
///
/// `NotAttempted` outcomes are never recorded here.
#[derive(Debug, Default)]
pub struct AuthMetrics {
    success: AtomicU64,
    failure: AtomicU64,
}

impl AuthMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one successful authentication.
    pub fn record_success(&self) {
        self.success.fetch_add(1, Ordering::Relaxed);
        counter!("jwt_auth_success_total").increment(1);
    }

    /// Record one failed authentication.
    pub fn record_failure(&self, error: &AuthError) {
        self.failure.fetch_add(1, Ordering::Relaxed);
        counter!("jwt_auth_failure_total", "reason" => error.kind()).increment(1);
    }

    pub fn success_count(&self) -> u64 {
        self.success.load(Ordering::Relaxed)
    }

    pub fn failure_count(&self) -> u64 {
        self.failure.load(Ordering::Relaxed)
    }

    /// Both counters under their exported names.
    pub fn exported(&self) -> [(&'static str, u64); 2] {
        [
            (SUCCESS_COUNTER_NAME, self.success_count()),
            (FAILURE_COUNTER_NAME, self.failure_count()),
        ]
    }
}

/// Record a JWKS refresh attempt.
///
/// Metric: `jwt_auth_jwks_refresh_total`
/// Labels: `status`
pub fn record_jwks_refresh(status: &'static str) {
    counter!("jwt_auth_jwks_refresh_total", "status" => status).increment(1);
}

/// Set the number of keys in the current JWKS snapshot.
///
/// Metric: `jwt_auth_jwks_keys`
#[allow(clippy::cast_precision_loss)]
pub fn set_jwks_key_count(count: usize) {
    gauge!("jwt_auth_jwks_keys").set(count as f64);
}
