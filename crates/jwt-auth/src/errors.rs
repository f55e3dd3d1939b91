//! JWT authentication error types.
//!
//! Per-request failures carry no detail in their `Display` output; the
//! reason is logged at debug level where it is detected. Startup-time
//! failures (key material, key fetch, configuration) carry a description
//! because they surface to the operator, never to an HTTP client.

use common::jwt::JwtValidationError;
use thiserror::Error;

use crate::config::ConfigError;

/// JWT authentication error type.
///
/// Maps to HTTP status codes for the frontend that consumes outcomes:
/// - Per-request token failures (including a bad `x5c` chain): 401 Unauthorized
/// - KeyFetchFailed: 503 Service Unavailable
/// - MalformedKeyMaterial, Configuration: 500 Internal Server Error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Token is not a well-formed compact JWS (segments, base64url, JSON,
    /// required header fields, size).
    #[error("The access token is invalid or expired")]
    MalformedToken,

    /// Header `alg` is not RS256 or ES256.
    #[error("The access token is invalid or expired")]
    UnsupportedAlgorithm,

    /// No key in the current JWKS snapshot matches the token's `kid`.
    #[error("The access token is invalid or expired")]
    KeyNotFound,

    /// Signature does not verify with the resolved key.
    #[error("The access token is invalid or expired")]
    SignatureInvalid,

    /// The configured username claim is absent or not a string.
    #[error("The access token is invalid or expired")]
    MissingUsernameClaim,

    /// `exp` is in the past beyond the allowed clock skew.
    #[error("The access token is invalid or expired")]
    TokenExpired,

    /// `nbf` is in the future beyond the allowed clock skew.
    #[error("The access token is invalid or expired")]
    TokenNotYetValid,

    /// The token's `x5c` chain did not decode or did not link up.
    #[error("The access token is invalid or expired")]
    InvalidEmbeddedKey,

    /// A JWKS entry could not be decoded into a key.
    #[error("Malformed key material: {0}")]
    MalformedKeyMaterial(String),

    /// Network, TLS, or HTTP status failure while fetching a JWKS.
    #[error("Key fetch failed: {0}")]
    KeyFetchFailed(String),

    /// Invalid configuration or startup precondition.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl AuthError {
    /// Stable label for this error kind, used as the `reason` metric label.
    ///
    /// Bounded to the variant count.
    pub fn kind(&self) -> &'static str {
        match self {
            AuthError::MalformedToken => "malformed_token",
            AuthError::UnsupportedAlgorithm => "unsupported_algorithm",
            AuthError::KeyNotFound => "key_not_found",
            AuthError::SignatureInvalid => "signature_invalid",
            AuthError::MissingUsernameClaim => "missing_username_claim",
            AuthError::TokenExpired => "token_expired",
            AuthError::TokenNotYetValid => "token_not_yet_valid",
            AuthError::InvalidEmbeddedKey => "invalid_embedded_key",
            AuthError::MalformedKeyMaterial(_) => "malformed_key_material",
            AuthError::KeyFetchFailed(_) => "key_fetch_failed",
            AuthError::Configuration(_) => "configuration",
        }
    }

    /// Returns the HTTP status code a frontend should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            AuthError::MalformedToken
            | AuthError::UnsupportedAlgorithm
            | AuthError::KeyNotFound
            | AuthError::SignatureInvalid
            | AuthError::MissingUsernameClaim
            | AuthError::TokenExpired
            | AuthError::TokenNotYetValid
            | AuthError::InvalidEmbeddedKey => 401,
            AuthError::KeyFetchFailed(_) => 503,
            AuthError::MalformedKeyMaterial(_) | AuthError::Configuration(_) => 500,
        }
    }
}

impl From<JwtValidationError> for AuthError {
    fn from(err: JwtValidationError) -> Self {
        match err {
            JwtValidationError::TokenTooLarge | JwtValidationError::MalformedToken => {
                AuthError::MalformedToken
            }
            JwtValidationError::Expired => AuthError::TokenExpired,
            JwtValidationError::NotYetValid => AuthError::TokenNotYetValid,
        }
    }
}

impl From<ConfigError> for AuthError {
    fn from(err: ConfigError) -> Self {
        AuthError::Configuration(err.to_string())
    }
}
