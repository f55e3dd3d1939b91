//! # JWT Auth Test Utilities
//!
//! Shared test utilities for the `jwt-auth` crate.
//!
//! This crate provides:
//! - Static crypto fixtures (RSA/EC keys, a certificate chain, JWKS files)
//! - Token builders (TestTokenBuilder, signature damage helpers)
//! - JWKS builders (documents, temp files, wiremock mounts)
//! - An HTTPS JWKS server with a runtime CA (TlsJwksServer)
//! - Custom assertions (OutcomeAssertions trait)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use jwt_auth_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() {
//!     let jwks = write_jwks_file(&jwks_document(vec![rs256_jwk()]));
//!
//!     let token = TestTokenBuilder::new()
//!         .with_username("impala")
//!         .sign_rs256(RSA_K1_PRIVATE_PEM, Some(RSA_K1_KID));
//!
//!     gateway
//!         .authenticate(Some(&format!("Bearer {token}")))
//!         .assert_success("impala");
//! }
//! ```

pub mod assertions;
pub mod crypto_fixtures;
pub mod jwks_builders;
pub mod tls_jwks_server;
pub mod token_builders;

// Re-export commonly used items
pub use assertions::*;
pub use crypto_fixtures::*;
pub use jwks_builders::*;
pub use tls_jwks_server::*;
pub use token_builders::*;
