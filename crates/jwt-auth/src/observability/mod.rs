//! Observability for the JWT auth subsystem.
//!
//! Logging uses `tracing` with literal dotted targets (`jwt_auth.jwks`,
//! `jwt_auth.jwt`, ...). Metrics go through the `metrics` facade; see
//! [`metrics`].

pub mod metrics;
