//! JWT verification.
//!
//! Verifies compact JWS tokens signed with RS256 or ES256 and extracts the
//! configured username claim.
//!
//! # Verification order
//!
//! 1. Split into three segments (size-checked first)
//! 2. Decode header and payload JSON; unknown fields are ignored
//! 3. `alg` must be RS256 or ES256 (`none` included in the rejects)
//! 4. Resolve the key: an `x5c` chain takes precedence over `kid`
//! 5. Verify the signature over the transmitted `header.payload` bytes
//! 6. Check `exp`/`nbf` with clock skew
//! 7. Extract the username claim
//!
//! Steps 4 and 5 are skipped when signature validation is disabled. No
//! claim is read before the signature step has passed.

use common::jwt::{decode_segment, split_compact, validate_time_claims};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::errors::AuthError;
use crate::jwks::JwksStore;
use crate::keys::{decode_x5c_chain, KeyAlgorithm, SigningKey};

/// How a token names its signing key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyRef {
    /// `kid` header: look the key up in the JWKS store.
    ById(String),

    /// `x5c` header: the key is the leaf of an embedded chain (standard
    /// base64 DER, leaf first).
    Embedded(Vec<String>),
}

/// The parts of a JWT header this verifier acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JwtHeader {
    pub algorithm: KeyAlgorithm,
    pub key_ref: KeyRef,
}

impl JwtHeader {
    /// Interpret a decoded header object.
    ///
    /// # Errors
    ///
    /// - `MalformedToken` - not an object, `alg` missing or not a string,
    ///   neither `kid` nor `x5c` usable
    /// - `UnsupportedAlgorithm` - `alg` is anything but RS256/ES256
    pub fn from_json(header: &Value) -> Result<Self, AuthError> {
        let Some(header) = header.as_object() else {
            tracing::debug!(target: "jwt_auth.jwt", "Token rejected: header is not a JSON object");
            return Err(AuthError::MalformedToken);
        };

        let Some(alg) = header.get("alg").and_then(Value::as_str) else {
            tracing::debug!(target: "jwt_auth.jwt", "Token rejected: missing alg");
            return Err(AuthError::MalformedToken);
        };

        let Some(algorithm) = KeyAlgorithm::from_jose(alg) else {
            tracing::debug!(target: "jwt_auth.jwt", alg = %alg, "Token rejected: unsupported algorithm");
            return Err(AuthError::UnsupportedAlgorithm);
        };

        let key_ref = match (header.get("x5c"), header.get("kid")) {
            (Some(x5c), _) => KeyRef::Embedded(parse_x5c(x5c)?),
            (None, Some(Value::String(kid))) if !kid.is_empty() => KeyRef::ById(kid.clone()),
            (None, _) => {
                tracing::debug!(target: "jwt_auth.jwt", "Token rejected: no usable kid or x5c");
                return Err(AuthError::MalformedToken);
            }
        };

        Ok(Self { algorithm, key_ref })
    }
}

fn parse_x5c(x5c: &Value) -> Result<Vec<String>, AuthError> {
    let chain = x5c
        .as_array()
        .map(|entries| {
            entries
                .iter()
                .map(|entry| entry.as_str().map(str::to_string))
                .collect::<Option<Vec<_>>>()
        })
        .unwrap_or_default()
        .filter(|chain| !chain.is_empty());

    chain.ok_or_else(|| {
        tracing::debug!(target: "jwt_auth.jwt", "Token rejected: x5c is not a non-empty string array");
        AuthError::MalformedToken
    })
}

/// A parsed, not yet verified, compact JWT.
///
/// Borrows the signature and signing input from the transmitted token.
#[derive(Debug)]
pub struct JwtToken<'a> {
    header: JwtHeader,
    claims: Map<String, Value>,
    signature: &'a str,
    signing_input: &'a str,
}

impl<'a> JwtToken<'a> {
    /// Split and decode a compact JWT.
    ///
    /// # Errors
    ///
    /// `MalformedToken` or `UnsupportedAlgorithm`, see [`JwtHeader::from_json`].
    pub fn parse(token: &'a str) -> Result<Self, AuthError> {
        let compact = split_compact(token)?;

        let header: Value = decode_segment(compact.header)?;
        let payload: Value = decode_segment(compact.payload)?;

        let Value::Object(claims) = payload else {
            tracing::debug!(target: "jwt_auth.jwt", "Token rejected: payload is not a JSON object");
            return Err(AuthError::MalformedToken);
        };

        Ok(Self {
            header: JwtHeader::from_json(&header)?,
            claims,
            signature: compact.signature,
            signing_input: compact.signing_input,
        })
    }

    pub fn header(&self) -> &JwtHeader {
        &self.header
    }

    /// Unverified claims. Only trust them after signature verification.
    pub fn claims(&self) -> &Map<String, Value> {
        &self.claims
    }

    /// base64url signature segment as transmitted (may be empty).
    pub fn signature(&self) -> &str {
        self.signature
    }

    /// `header.payload` exactly as transmitted.
    pub fn signing_input(&self) -> &str {
        self.signing_input
    }
}

/// Verifies tokens against a JWKS store or embedded `x5c` chains.
///
/// Stateless across calls; safe to share between request handlers.
#[derive(Debug, Clone)]
pub struct JwtVerifier {
    store: Option<JwksStore>,
    validate_signature: bool,
    username_claim: String,
    clock_skew: Duration,
}

impl JwtVerifier {
    /// Create a verifier.
    ///
    /// `store` may be `None` only when signature validation is disabled or
    /// every token carries `x5c`; `kid` tokens then fail with `KeyNotFound`.
    pub fn new(store: Option<JwksStore>, config: &Config) -> Self {
        if !config.validate_signature {
            tracing::warn!(
                target: "jwt_auth.jwt",
                "JWT signature validation is DISABLED; tokens are accepted unsigned"
            );
        }

        Self {
            store,
            validate_signature: config.validate_signature,
            username_claim: config.username_claim.clone(),
            clock_skew: config.clock_skew,
        }
    }

    /// Verify a compact JWT and return the login identity.
    ///
    /// # Errors
    ///
    /// Any per-request [`AuthError`]; the first failing step wins.
    pub fn verify(&self, token: &str) -> Result<String, AuthError> {
        let token = JwtToken::parse(token)?;

        if self.validate_signature {
            let key = self.resolve_key(&token.header.key_ref)?;
            key.verify(
                token.header.algorithm,
                token.signing_input.as_bytes(),
                token.signature,
            )?;
        }

        let exp = numeric_claim(&token.claims, "exp")?;
        let nbf = numeric_claim(&token.claims, "nbf")?;
        validate_time_claims(exp, nbf, self.clock_skew)?;

        match token.claims.get(&self.username_claim).and_then(Value::as_str) {
            Some(identity) if !identity.is_empty() => Ok(identity.to_string()),
            _ => {
                tracing::debug!(
                    target: "jwt_auth.jwt",
                    claim = %self.username_claim,
                    "Token rejected: username claim missing or not a string"
                );
                Err(AuthError::MissingUsernameClaim)
            }
        }
    }

    /// Resolve the signing key named by a token header.
    ///
    /// `x5c` keys are decoded per call and never cached.
    ///
    /// # Errors
    ///
    /// - `KeyNotFound` - `kid` unknown (or no store)
    /// - `InvalidEmbeddedKey` - `x5c` chain invalid; the detail is only logged
    pub fn resolve_key(&self, key_ref: &KeyRef) -> Result<Arc<SigningKey>, AuthError> {
        match key_ref {
            KeyRef::Embedded(chain) => decode_x5c_chain(chain).map(Arc::new).map_err(|e| {
                tracing::debug!(target: "jwt_auth.jwt", error = %e, "Token rejected: invalid x5c chain");
                AuthError::InvalidEmbeddedKey
            }),
            KeyRef::ById(kid) => match &self.store {
                Some(store) => store.lookup(kid),
                None => {
                    tracing::debug!(target: "jwt_auth.jwt", kid = %kid, "Token rejected: no JWKS store for kid");
                    Err(AuthError::KeyNotFound)
                }
            },
        }
    }
}

/// Read an optional NumericDate claim. Fractional seconds truncate.
#[allow(clippy::cast_possible_truncation)]
fn numeric_claim(claims: &Map<String, Value>, name: &str) -> Result<Option<i64>, AuthError> {
    match claims.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_i64()
            .or_else(|| value.as_f64().map(|v| v as i64))
            .map(Some)
            .ok_or_else(|| {
                tracing::debug!(target: "jwt_auth.jwt", claim = name, "Token rejected: non-numeric time claim");
                AuthError::MalformedToken
            }),
    }
}
