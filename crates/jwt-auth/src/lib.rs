//! JWT Bearer-token authentication.
//!
//! Verifies RS256/ES256 access tokens against a JWKS key source (file or
//! periodically refreshed URL) or an embedded `x5c` certificate chain, and
//! reports each outcome to process-wide counters.
//!
//! # Modules
//!
//! - `config` - Environment-driven configuration
//! - `errors` - Error taxonomy
//! - `gateway` - Entry point for the RPC frontend
//! - `jwks` - JWKS parsing, fetching, and the shared key snapshot
//! - `jwt` - Token parsing and verification
//! - `keys` - PEM/DER/JWK/x5c key material decoding
//! - `observability` - Outcome counters and JWKS metrics
//! - `tasks` - Background JWKS refresh
//!
//! # Key decoding API
//!
//! The gateway only needs JWKS and `x5c` keys, but the standalone decoders
//! are public for callers that hold key material out of band:
//! [`decode_pem`] (certificate, SPKI or PKCS#1 public key) and
//! [`decode_der`] (certificate or SPKI). Both yield a [`keys::SigningKey`]
//! whose `verify` checks a compact JWS signing input.

pub mod config;
pub mod errors;
pub mod gateway;
pub mod jwks;
pub mod jwt;
pub mod keys;
pub mod observability;
pub mod tasks;

pub use config::{Config, KeySource};
pub use errors::AuthError;
pub use gateway::{AuthOutcome, JwtGateway, TransportSecurity};
pub use keys::{decode_der, decode_pem};
pub use observability::metrics::AuthMetrics;
