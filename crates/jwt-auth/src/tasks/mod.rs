//! Background tasks for JWT authentication.
//!
//! # Tasks
//!
//! - `jwks_refresh` - Periodically refreshes a URL-backed JWKS store

pub mod jwks_refresh;

pub use jwks_refresh::start_jwks_refresh;
