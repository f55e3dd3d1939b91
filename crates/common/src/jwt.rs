//! JWT utilities shared by every consumer of compact JWS tokens.
//!
//! This module provides the token-level building blocks that sit below
//! signature verification:
//! - Size limits for DoS prevention
//! - Three-segment splitting that preserves the exact signing input
//! - base64url segment decoding into JSON
//! - `exp`/`nbf` validation with clock skew tolerance
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - The signing input is borrowed from the transmitted token and never
//!   re-serialized, so signature checks see the bytes the issuer signed
//! - Error messages are generic; details are logged at debug level
//!
//! # Usage
//!
//! ```rust,ignore
//! use common::jwt::{split_compact, decode_segment, validate_time_claims, DEFAULT_CLOCK_SKEW};
//!
//! let compact = split_compact(token)?;
//! let header: serde_json::Value = decode_segment(compact.header)?;
//! // ... verify signature over compact.signing_input ...
//! validate_time_claims(exp, nbf, DEFAULT_CLOCK_SKEW)?;
//! ```

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Maximum allowed JWT size in bytes (8KB).
///
/// JWTs larger than this are rejected before any decoding or cryptographic
/// work. Tokens carrying an `x5c` chain of two RSA-2048 certificates stay
/// around 3KB, well inside the limit.
pub const MAX_JWT_SIZE_BYTES: usize = 8192; // 8KB

/// Default leeway applied to `exp` and `nbf` checks (60 seconds).
pub const DEFAULT_CLOCK_SKEW: Duration = Duration::from_secs(60);

/// Maximum configurable leeway (10 minutes).
pub const MAX_CLOCK_SKEW: Duration = Duration::from_secs(600);

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur while handling a compact JWT before or after
/// signature verification.
///
/// Note: Error messages are intentionally generic to prevent information leakage.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JwtValidationError {
    /// Token size exceeds maximum allowed.
    #[error("The access token is invalid or expired")]
    TokenTooLarge,

    /// Token format is invalid (segment count, base64url, or JSON).
    #[error("The access token is invalid or expired")]
    MalformedToken,

    /// Token `exp` claim is in the past (beyond the allowed skew).
    #[error("The access token is invalid or expired")]
    Expired,

    /// Token `nbf` claim is in the future (beyond the allowed skew).
    #[error("The access token is invalid or expired")]
    NotYetValid,
}

// =============================================================================
// Compact serialization
// =============================================================================

/// A compact JWS split into its three segments.
///
/// All fields borrow from the original token string. `signing_input` is the
/// `header.payload` prefix exactly as transmitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompactJwt<'a> {
    /// base64url-encoded header segment.
    pub header: &'a str,

    /// base64url-encoded payload segment.
    pub payload: &'a str,

    /// base64url-encoded signature segment (may be empty).
    pub signature: &'a str,

    /// `header.payload` as transmitted.
    pub signing_input: &'a str,
}

/// Split a compact JWT into header, payload and signature segments.
///
/// # Errors
///
/// - `TokenTooLarge` - Token exceeds `MAX_JWT_SIZE_BYTES`
/// - `MalformedToken` - Token does not have exactly three `.`-separated
///   segments, or the header or payload segment is empty
pub fn split_compact(token: &str) -> Result<CompactJwt<'_>, JwtValidationError> {
    // Check token size first (DoS prevention)
    if token.len() > MAX_JWT_SIZE_BYTES {
        tracing::debug!(
            target: "common.jwt",
            token_size = token.len(),
            max_size = MAX_JWT_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(JwtValidationError::TokenTooLarge);
    }

    let mut parts = token.split('.');
    let (Some(header), Some(payload), Some(signature), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        tracing::debug!(
            target: "common.jwt",
            parts = token.split('.').count(),
            "Token rejected: invalid JWT format"
        );
        return Err(JwtValidationError::MalformedToken);
    };

    if header.is_empty() || payload.is_empty() {
        tracing::debug!(target: "common.jwt", "Token rejected: empty header or payload segment");
        return Err(JwtValidationError::MalformedToken);
    }

    let signing_input = token
        .get(..header.len() + 1 + payload.len())
        .ok_or(JwtValidationError::MalformedToken)?;

    Ok(CompactJwt {
        header,
        payload,
        signature,
        signing_input,
    })
}

/// Decode a base64url segment (no padding) into raw bytes.
///
/// # Errors
///
/// Returns `MalformedToken` if the segment is not valid unpadded base64url.
pub fn decode_segment_bytes(segment: &str) -> Result<Vec<u8>, JwtValidationError> {
    URL_SAFE_NO_PAD.decode(segment).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to decode JWT segment base64");
        JwtValidationError::MalformedToken
    })
}

/// Decode a base64url segment and parse it as JSON.
///
/// Unknown fields are left to the target type; a `serde_json::Value` or a
/// struct without `deny_unknown_fields` ignores them.
///
/// # Errors
///
/// Returns `MalformedToken` if the segment is not base64url or not valid JSON
/// for `T`.
pub fn decode_segment<T: DeserializeOwned>(segment: &str) -> Result<T, JwtValidationError> {
    let bytes = decode_segment_bytes(segment)?;
    serde_json::from_slice(&bytes).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to parse JWT segment JSON");
        JwtValidationError::MalformedToken
    })
}

// =============================================================================
// Time claims
// =============================================================================

/// Validate the optional `exp` and `nbf` claims with clock skew tolerance.
///
/// Absent claims are not checked.
///
/// # Errors
///
/// - `Expired` - `exp + clock_skew` is in the past
/// - `NotYetValid` - `nbf - clock_skew` is in the future
pub fn validate_time_claims(
    exp: Option<i64>,
    nbf: Option<i64>,
    clock_skew: Duration,
) -> Result<(), JwtValidationError> {
    let now = chrono::Utc::now().timestamp();
    validate_time_claims_at(exp, nbf, clock_skew, now)
}

/// Deterministic time-claim validation against an explicit `now` timestamp.
///
/// Prefer [`validate_time_claims`] in production code.
pub(crate) fn validate_time_claims_at(
    exp: Option<i64>,
    nbf: Option<i64>,
    clock_skew: Duration,
    now: i64,
) -> Result<(), JwtValidationError> {
    // Safe cast: clock_skew is bounded to MAX_CLOCK_SKEW by configuration
    #[allow(clippy::cast_possible_wrap)]
    let clock_skew_secs = clock_skew.as_secs() as i64;

    if let Some(exp) = exp {
        if now > exp.saturating_add(clock_skew_secs) {
            tracing::debug!(
                target: "common.jwt",
                exp = exp,
                now = now,
                clock_skew_secs = clock_skew_secs,
                "Token rejected: expired"
            );
            return Err(JwtValidationError::Expired);
        }
    }

    if let Some(nbf) = nbf {
        if now < nbf.saturating_sub(clock_skew_secs) {
            tracing::debug!(
                target: "common.jwt",
                nbf = nbf,
                now = now,
                clock_skew_secs = clock_skew_secs,
                "Token rejected: not yet valid"
            );
            return Err(JwtValidationError::NotYetValid);
        }
    }

    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
