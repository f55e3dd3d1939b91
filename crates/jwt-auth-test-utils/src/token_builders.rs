//! Builder patterns for test tokens
//!
//! Provides a fluent API for creating signed RS256/ES256 tokens, unsigned
//! tokens with arbitrary headers, and helpers that damage a token's
//! signature segment.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde_json::{json, Map, Value};

/// Builder for creating test JWTs
///
/// Defaults to `iss = "auth0"`, `username = "impala"`, and an `exp` one
/// hour from now.
///
/// # Example
/// ```rust,ignore
/// let token = TestTokenBuilder::new()
///     .with_username("alice")
///     .expires_in(60)
///     .sign_rs256(RSA_K1_PRIVATE_PEM, Some("K1"));
/// ```
#[derive(Debug, Clone)]
pub struct TestTokenBuilder {
    claims: Map<String, Value>,
    x5c: Option<Vec<String>>,
}

impl TestTokenBuilder {
    /// Create a new token builder with defaults
    pub fn new() -> Self {
        let now = Utc::now();
        let mut claims = Map::new();
        claims.insert("iss".to_string(), json!("auth0"));
        claims.insert("username".to_string(), json!("impala"));
        claims.insert("iat".to_string(), json!(now.timestamp()));
        claims.insert(
            "exp".to_string(),
            json!((now + Duration::seconds(3600)).timestamp()),
        );
        Self { claims, x5c: None }
    }

    /// Set the `username` claim
    pub fn with_username(self, username: &str) -> Self {
        self.with_claim("username", json!(username))
    }

    /// Set an arbitrary claim
    pub fn with_claim(mut self, name: &str, value: Value) -> Self {
        self.claims.insert(name.to_string(), value);
        self
    }

    /// Remove a claim (including the defaults)
    pub fn without_claim(mut self, name: &str) -> Self {
        self.claims.remove(name);
        self
    }

    /// Set expiration in seconds from now (negative for the past)
    pub fn expires_in(self, seconds: i64) -> Self {
        let exp = (Utc::now() + Duration::seconds(seconds)).timestamp();
        self.with_claim("exp", json!(exp))
    }

    /// Set not-before in seconds from now
    pub fn not_before_in(self, seconds: i64) -> Self {
        let nbf = (Utc::now() + Duration::seconds(seconds)).timestamp();
        self.with_claim("nbf", json!(nbf))
    }

    /// Embed an `x5c` chain in the header (leaf first)
    pub fn with_x5c(mut self, chain: Vec<String>) -> Self {
        self.x5c = Some(chain);
        self
    }

    /// The claims as a JSON value
    pub fn claims(&self) -> Value {
        Value::Object(self.claims.clone())
    }

    /// Sign with an RSA private key (PKCS#8 or PKCS#1 PEM)
    pub fn sign_rs256(&self, private_key_pem: &str, kid: Option<&str>) -> String {
        let key = EncodingKey::from_rsa_pem(private_key_pem.as_bytes())
            .expect("fixture RSA key should parse");
        self.sign(Algorithm::RS256, &key, kid)
    }

    /// Sign with a P-256 private key (PKCS#8 PEM)
    pub fn sign_es256(&self, private_key_pem: &str, kid: Option<&str>) -> String {
        let key = EncodingKey::from_ec_pem(private_key_pem.as_bytes())
            .expect("fixture EC key should parse");
        self.sign(Algorithm::ES256, &key, kid)
    }

    fn sign(&self, algorithm: Algorithm, key: &EncodingKey, kid: Option<&str>) -> String {
        let mut header = Header::new(algorithm);
        header.kid = kid.map(str::to_string);
        header.x5c = self.x5c.clone();
        jsonwebtoken::encode(&header, &self.claims(), key).expect("test token should sign")
    }

    /// Build `header.payload.signature` with an arbitrary header and a
    /// signature segment that is not a real signature.
    ///
    /// Used for `alg` values the signer cannot produce (e.g. `none`) and
    /// for malformed headers.
    pub fn with_raw_header(&self, header: Value) -> String {
        format!(
            "{}.{}.{}",
            encode_json(&header),
            encode_json(&self.claims()),
            URL_SAFE_NO_PAD.encode(b"not-a-real-signature")
        )
    }
}

/// Sign hand-written header and payload JSON with an RSA key.
///
/// The JSON text is encoded byte for byte, so unusual whitespace or key
/// order survives into the signing input.
pub fn sign_rs256_raw(header_json: &str, payload_json: &str, private_key_pem: &str) -> String {
    let key = EncodingKey::from_rsa_pem(private_key_pem.as_bytes())
        .expect("fixture RSA key should parse");
    let signing_input = format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(header_json),
        URL_SAFE_NO_PAD.encode(payload_json)
    );
    let signature = jsonwebtoken::crypto::sign(signing_input.as_bytes(), &key, Algorithm::RS256)
        .expect("test token should sign");
    format!("{signing_input}.{signature}")
}

impl Default for TestTokenBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// base64url (no padding) of a JSON value's serialization
pub fn encode_json(value: &Value) -> String {
    URL_SAFE_NO_PAD.encode(value.to_string())
}

/// Keep the header and payload, empty the signature segment (`h.p.`)
pub fn strip_signature(token: &str) -> String {
    let (signing_input, _) = token.rsplit_once('.').expect("token should have a signature segment");
    format!("{signing_input}.")
}

/// Drop the signature segment entirely (`h.p`)
pub fn truncate_signature(token: &str) -> String {
    let (signing_input, _) = token.rsplit_once('.').expect("token should have a signature segment");
    signing_input.to_string()
}

/// Flip bits in the decoded signature so it no longer verifies
pub fn tamper_signature(token: &str) -> String {
    let (signing_input, signature) = token
        .rsplit_once('.')
        .expect("token should have a signature segment");
    let mut bytes = URL_SAFE_NO_PAD
        .decode(signature)
        .expect("signature should be base64url");
    if let Some(first) = bytes.first_mut() {
        *first ^= 0xFF;
    }
    format!("{signing_input}.{}", URL_SAFE_NO_PAD.encode(bytes))
}

/// Replace the payload while keeping the original header and signature
pub fn replace_payload(token: &str, claims: &Value) -> String {
    let mut parts = token.split('.');
    let header = parts.next().expect("token should have a header");
    let _ = parts.next();
    let signature = parts.next().expect("token should have a signature");
    format!("{header}.{}.{signature}", encode_json(claims))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto_fixtures::*;

    fn decode_part(segment: &str) -> Value {
        serde_json::from_slice(&URL_SAFE_NO_PAD.decode(segment).unwrap()).unwrap()
    }

    #[test]
    fn test_builder_default_claims() {
        let claims = TestTokenBuilder::default().claims();
        assert_eq!(claims["iss"], "auth0");
        assert_eq!(claims["username"], "impala");
        assert!(claims["exp"].as_i64().unwrap() > Utc::now().timestamp());
    }

    #[test]
    fn test_sign_rs256_sets_header() {
        let token = TestTokenBuilder::new().sign_rs256(RSA_K1_PRIVATE_PEM, Some(RSA_K1_KID));
        let header = decode_part(token.split('.').next().unwrap());
        assert_eq!(header["alg"], "RS256");
        assert_eq!(header["kid"], "K1");
        assert!(header.get("x5c").is_none());
    }

    #[test]
    fn test_sign_es256_with_x5c() {
        let token = TestTokenBuilder::new()
            .with_x5c(x5c_chain(&[EC_LEAF_CERT_PEM, INTERMEDIATE_CERT_PEM]))
            .sign_es256(EC_LEAF_PRIVATE_PEM, None);
        let header = decode_part(token.split('.').next().unwrap());
        assert_eq!(header["alg"], "ES256");
        assert_eq!(header["x5c"].as_array().unwrap().len(), 2);
        assert!(header.get("kid").is_none());
    }

    #[test]
    fn test_signature_helpers() {
        let token = TestTokenBuilder::new().sign_rs256(RSA_K1_PRIVATE_PEM, Some(RSA_K1_KID));

        assert!(strip_signature(&token).ends_with('.'));
        assert_eq!(strip_signature(&token).split('.').count(), 3);
        assert_eq!(truncate_signature(&token).split('.').count(), 2);
        assert_ne!(tamper_signature(&token), token);
        assert_eq!(tamper_signature(&token).len(), token.len());
    }

    #[test]
    fn test_replace_payload_keeps_header_and_signature() {
        let token = TestTokenBuilder::new().sign_rs256(RSA_K1_PRIVATE_PEM, Some(RSA_K1_KID));
        let forged = replace_payload(&token, &json!({"username": "mallory"}));

        assert_eq!(forged.split('.').next(), token.split('.').next());
        assert_eq!(forged.rsplit('.').next(), token.rsplit('.').next());
        assert_eq!(decode_part(forged.split('.').nth(1).unwrap())["username"], "mallory");
    }

    #[test]
    fn test_with_raw_header() {
        let token = TestTokenBuilder::new().with_raw_header(json!({"alg": "none", "kid": "K1"}));
        let header = decode_part(token.split('.').next().unwrap());
        assert_eq!(header["alg"], "none");
    }
}
