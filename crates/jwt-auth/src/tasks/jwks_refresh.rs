//! JWKS refresh background task.
//!
//! Periodically refreshes a URL-backed [`JwksStore`]. A failed refresh is
//! logged by the store and retried on the next tick; the previous snapshot
//! stays published. The startup load has already fetched once, so the
//! first refresh happens one full interval after start.
//!
//! # Graceful Shutdown
//!
//! The task supports graceful shutdown via a cancellation token. When the
//! token is cancelled, the task exits without waiting for the next tick.
//! An in-flight fetch is bounded by the fetch timeout.

use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, Instrument};

use crate::config::{MAX_REFRESH_INTERVAL_SECONDS, MIN_REFRESH_INTERVAL_SECONDS};
use crate::jwks::JwksStore;

/// Run the JWKS refresh loop until `cancel_token` is cancelled.
///
/// The interval is clamped to the configured floor and ceiling, so a
/// hand-built `Config` cannot overflow the timer deadline.
///
/// # Arguments
///
/// * `store` - Store to refresh (file-backed stores make each tick a no-op)
/// * `refresh_interval` - Time between refreshes
/// * `cancel_token` - Token for graceful shutdown
pub async fn start_jwks_refresh(
    store: JwksStore,
    refresh_interval: Duration,
    cancel_token: CancellationToken,
) {
    let period = refresh_interval.clamp(
        Duration::from_secs(MIN_REFRESH_INTERVAL_SECONDS),
        Duration::from_secs(MAX_REFRESH_INTERVAL_SECONDS),
    );

    info!(
        target: "jwt_auth.tasks.jwks_refresh",
        refresh_interval_secs = period.as_secs(),
        "Starting JWKS refresh task"
    );

    let now = Instant::now();
    let first_tick = now.checked_add(period).unwrap_or(now);
    let mut interval = tokio::time::interval_at(first_tick, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let result = store
                    .refresh()
                    .instrument(tracing::debug_span!("jwks_refresh_tick"))
                    .await;
                // The store has already warned; the previous snapshot stays
                if let Err(e) = result {
                    debug!(
                        target: "jwt_auth.tasks.jwks_refresh",
                        reason = e.kind(),
                        "JWKS refresh tick failed, retrying next interval"
                    );
                }
            }
            _ = cancel_token.cancelled() => {
                info!(
                    target: "jwt_auth.tasks.jwks_refresh",
                    "JWKS refresh task received shutdown signal, exiting"
                );
                break;
            }
        }
    }
}
