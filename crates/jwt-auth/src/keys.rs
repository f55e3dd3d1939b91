//! Key material decoding for RS256 and ES256 verification keys.
//!
//! Turns JWK entries, PEM/DER public keys, X.509 certificates, and `x5c`
//! certificate chains into [`SigningKey`]s.
//!
//! # Security
//!
//! - A key is bound to one algorithm family; verifying with another family
//!   fails instead of reaching the crypto backend
//! - `x5c` chains are checked link by link (issuer/subject names and
//!   signatures) and for certificate validity periods
//! - `x5c` chains are NOT anchored to a trust store; the chain proves
//!   internal consistency only

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use jsonwebtoken::{Algorithm, DecodingKey};
use serde::Deserialize;
use std::fmt;
use x509_parser::certificate::X509Certificate;
use x509_parser::prelude::FromDer;
use x509_parser::public_key::PublicKey;
use x509_parser::x509::SubjectPublicKeyInfo;

use crate::errors::AuthError;

/// Maximum number of certificates accepted in an `x5c` chain.
pub const MAX_X5C_CHAIN_LENGTH: usize = 10;

/// Length of an uncompressed P-256 point (`0x04 || x || y`).
const P256_UNCOMPRESSED_POINT_LEN: usize = 65;

/// Length of a P-256 affine coordinate.
const P256_COORDINATE_LEN: usize = 32;

/// Signature algorithm family a key may be used with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyAlgorithm {
    /// RSASSA-PKCS1-v1_5 with SHA-256.
    Rs256,

    /// ECDSA on P-256 with SHA-256.
    Es256,
}

impl KeyAlgorithm {
    /// Parse a JOSE `alg` value. Only `RS256` and `ES256` are recognized.
    pub fn from_jose(alg: &str) -> Option<Self> {
        match alg {
            "RS256" => Some(KeyAlgorithm::Rs256),
            "ES256" => Some(KeyAlgorithm::Es256),
            _ => None,
        }
    }

    /// JOSE name of this algorithm.
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyAlgorithm::Rs256 => "RS256",
            KeyAlgorithm::Es256 => "ES256",
        }
    }

    fn jsonwebtoken_algorithm(self) -> Algorithm {
        match self {
            KeyAlgorithm::Rs256 => Algorithm::RS256,
            KeyAlgorithm::Es256 => Algorithm::ES256,
        }
    }
}

impl fmt::Display for KeyAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A public key ready for signature verification.
///
/// Immutable once constructed. Keys from a JWKS are shared through the
/// snapshot; keys decoded from a token's `x5c` live for one verification.
pub struct SigningKey {
    kid: Option<String>,
    algorithm: KeyAlgorithm,
    decoding_key: DecodingKey,
    certificate_fingerprint: Option<String>,
}

impl SigningKey {
    /// Key ID, absent for keys decoded from a token's `x5c` or a bare PEM.
    pub fn kid(&self) -> Option<&str> {
        self.kid.as_deref()
    }

    /// Algorithm family this key verifies.
    pub fn algorithm(&self) -> KeyAlgorithm {
        self.algorithm
    }

    /// Hex SHA-256 of the DER certificate the key came from, if any.
    pub fn certificate_fingerprint(&self) -> Option<&str> {
        self.certificate_fingerprint.as_deref()
    }

    fn with_kid(mut self, kid: Option<String>) -> Self {
        self.kid = kid;
        self
    }

    /// Verify a base64url signature over `message` with this key.
    ///
    /// Returns `Ok(())` only when the signature matches. A token algorithm
    /// outside this key's family, an undecodable signature, and a mismatch
    /// all yield `SignatureInvalid`.
    pub fn verify(
        &self,
        algorithm: KeyAlgorithm,
        message: &[u8],
        signature: &str,
    ) -> Result<(), AuthError> {
        if algorithm != self.algorithm {
            tracing::debug!(
                target: "jwt_auth.keys",
                token_alg = %algorithm,
                key_alg = %self.algorithm,
                "Token algorithm does not match key algorithm"
            );
            return Err(AuthError::SignatureInvalid);
        }

        match jsonwebtoken::crypto::verify(
            signature,
            message,
            &self.decoding_key,
            algorithm.jsonwebtoken_algorithm(),
        ) {
            Ok(true) => Ok(()),
            Ok(false) => {
                tracing::debug!(target: "jwt_auth.keys", "Signature mismatch");
                Err(AuthError::SignatureInvalid)
            }
            Err(e) => {
                tracing::debug!(target: "jwt_auth.keys", error = %e, "Signature could not be checked");
                Err(AuthError::SignatureInvalid)
            }
        }
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("kid", &self.kid)
            .field("algorithm", &self.algorithm)
            .field("certificate_fingerprint", &self.certificate_fingerprint)
            .finish_non_exhaustive()
    }
}

/// JSON Web Key entry from a JWKS document.
///
/// Unknown members are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Jwk {
    /// Key type ("RSA" or "EC").
    pub kty: String,

    /// Key ID - used to select the correct key for verification.
    #[serde(default)]
    pub kid: Option<String>,

    /// Algorithm (must agree with `kty` when present).
    #[serde(default)]
    pub alg: Option<String>,

    /// Key use (must be "sig" when present).
    #[serde(default, rename = "use")]
    pub key_use: Option<String>,

    /// RSA modulus (base64url).
    #[serde(default)]
    pub n: Option<String>,

    /// RSA public exponent (base64url).
    #[serde(default)]
    pub e: Option<String>,

    /// EC curve name ("P-256").
    #[serde(default)]
    pub crv: Option<String>,

    /// EC x coordinate (base64url).
    #[serde(default)]
    pub x: Option<String>,

    /// EC y coordinate (base64url).
    #[serde(default)]
    pub y: Option<String>,

    /// Certificate chain, leaf first (standard base64 DER).
    #[serde(default)]
    pub x5c: Option<Vec<String>>,
}

impl Jwk {
    /// Decode this entry into a [`SigningKey`].
    ///
    /// When `x5c` is present the key comes from the validated chain's leaf
    /// and inline key parameters are ignored.
    ///
    /// # Errors
    ///
    /// Returns `MalformedKeyMaterial` for unsupported key types, `alg`/`kty`
    /// disagreement, a non-`sig` use, or undecodable key parameters.
    pub fn to_signing_key(&self) -> Result<SigningKey, AuthError> {
        if let Some(key_use) = self.key_use.as_deref() {
            if key_use != "sig" {
                return Err(malformed(format!("key use '{key_use}' is not 'sig'")));
            }
        }

        let family = match self.kty.as_str() {
            "RSA" => KeyAlgorithm::Rs256,
            "EC" => KeyAlgorithm::Es256,
            other => return Err(malformed(format!("unsupported key type '{other}'"))),
        };

        if let Some(alg) = self.alg.as_deref() {
            if KeyAlgorithm::from_jose(alg) != Some(family) {
                return Err(malformed(format!(
                    "alg '{alg}' does not match key type '{}'",
                    self.kty
                )));
            }
        }

        if let Some(chain) = self.x5c.as_deref().filter(|c| !c.is_empty()) {
            let key = decode_x5c_chain(chain)?;
            if key.algorithm != family {
                return Err(malformed(format!(
                    "x5c leaf key is {} but key type is '{}'",
                    key.algorithm, self.kty
                )));
            }
            return Ok(key.with_kid(self.kid.clone()));
        }

        let decoding_key = match family {
            KeyAlgorithm::Rs256 => {
                let (Some(n), Some(e)) = (self.n.as_deref(), self.e.as_deref()) else {
                    return Err(malformed("RSA key missing 'n' or 'e'"));
                };
                DecodingKey::from_rsa_components(n, e)
                    .map_err(|err| malformed(format!("invalid RSA components: {err}")))?
            }
            KeyAlgorithm::Es256 => {
                match self.crv.as_deref() {
                    Some("P-256") => {}
                    other => {
                        return Err(malformed(format!("unsupported curve {other:?}")));
                    }
                }
                let (Some(x), Some(y)) = (self.x.as_deref(), self.y.as_deref()) else {
                    return Err(malformed("EC key missing 'x' or 'y'"));
                };
                ec_key_from_coordinates(x, y)?
            }
        };

        Ok(SigningKey {
            kid: self.kid.clone(),
            algorithm: family,
            decoding_key,
            certificate_fingerprint: None,
        })
    }
}

/// Decode a PEM certificate, SPKI public key, or PKCS#1 RSA public key.
///
/// Only the first PEM block is used. For certificates the fingerprint of
/// the certificate is recorded.
///
/// # Errors
///
/// Returns `MalformedKeyMaterial` if the PEM cannot be parsed or holds an
/// unsupported key.
pub fn decode_pem(pem: &[u8]) -> Result<SigningKey, AuthError> {
    let (_, block) = x509_parser::pem::parse_x509_pem(pem)
        .map_err(|e| malformed(format!("invalid PEM: {e}")))?;

    match block.label.as_str() {
        "CERTIFICATE" => decode_certificate_der(&block.contents),
        "PUBLIC KEY" => decode_spki_der(&block.contents),
        "RSA PUBLIC KEY" => Ok(SigningKey {
            kid: None,
            algorithm: KeyAlgorithm::Rs256,
            decoding_key: DecodingKey::from_rsa_der(&block.contents),
            certificate_fingerprint: None,
        }),
        other => Err(malformed(format!("unsupported PEM label '{other}'"))),
    }
}

/// Decode a DER certificate or DER SPKI public key.
///
/// # Errors
///
/// Returns `MalformedKeyMaterial` if the bytes are neither.
pub fn decode_der(der: &[u8]) -> Result<SigningKey, AuthError> {
    if x509_parser::parse_x509_certificate(der).is_ok() {
        return decode_certificate_der(der);
    }
    decode_spki_der(der)
}

/// Validate an `x5c` chain and return its leaf key.
///
/// `chain` is leaf first, each entry standard base64 DER. Every
/// certificate must be inside its validity period. Each certificate's
/// issuer must equal the next certificate's subject and its signature must
/// verify with the next certificate's key. A self-issued terminal
/// certificate must carry a valid self-signature.
///
/// # Errors
///
/// Returns `MalformedKeyMaterial` on any decoding or linkage failure.
pub fn decode_x5c_chain(chain: &[String]) -> Result<SigningKey, AuthError> {
    if chain.is_empty() {
        return Err(malformed("empty x5c chain"));
    }
    if chain.len() > MAX_X5C_CHAIN_LENGTH {
        return Err(malformed(format!(
            "x5c chain has {} certificates, limit is {}",
            chain.len(),
            MAX_X5C_CHAIN_LENGTH
        )));
    }

    let ders = chain
        .iter()
        .map(|entry| {
            STANDARD
                .decode(entry)
                .map_err(|e| malformed(format!("x5c entry is not base64: {e}")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let certs = ders
        .iter()
        .map(|der| parse_certificate(der))
        .collect::<Result<Vec<_>, _>>()?;

    for (position, cert) in certs.iter().enumerate() {
        if !cert.validity().is_valid() {
            return Err(malformed(format!(
                "x5c certificate {position} is outside its validity period"
            )));
        }
    }

    for (position, pair) in certs.windows(2).enumerate() {
        let [cert, issuer] = pair else {
            continue;
        };
        if cert.issuer().as_raw() != issuer.subject().as_raw() {
            return Err(malformed(format!(
                "x5c certificate {position} is not issued by the next certificate"
            )));
        }
        cert.verify_signature(Some(issuer.public_key()))
            .map_err(|e| malformed(format!("x5c certificate {position} signature: {e}")))?;
    }

    if let Some(terminal) = certs.last() {
        if terminal.issuer().as_raw() == terminal.subject().as_raw() {
            terminal
                .verify_signature(None)
                .map_err(|e| malformed(format!("x5c terminal self-signature: {e}")))?;
        }
    }

    let (Some(leaf), Some(leaf_der)) = (certs.first(), ders.first()) else {
        return Err(malformed("empty x5c chain"));
    };

    tracing::debug!(
        target: "jwt_auth.keys",
        chain_length = certs.len(),
        "x5c chain validated"
    );

    let mut key = key_from_spki(leaf.public_key())?;
    key.certificate_fingerprint = Some(sha256_fingerprint(leaf_der));
    Ok(key)
}

fn decode_certificate_der(der: &[u8]) -> Result<SigningKey, AuthError> {
    let cert = parse_certificate(der)?;
    let mut key = key_from_spki(cert.public_key())?;
    key.certificate_fingerprint = Some(sha256_fingerprint(der));
    Ok(key)
}

fn decode_spki_der(der: &[u8]) -> Result<SigningKey, AuthError> {
    let (_, spki) = SubjectPublicKeyInfo::from_der(der)
        .map_err(|e| malformed(format!("invalid public key DER: {e}")))?;
    key_from_spki(&spki)
}

fn parse_certificate(der: &[u8]) -> Result<X509Certificate<'_>, AuthError> {
    x509_parser::parse_x509_certificate(der)
        .map(|(_, cert)| cert)
        .map_err(|e| malformed(format!("invalid certificate: {e}")))
}

fn key_from_spki(spki: &SubjectPublicKeyInfo<'_>) -> Result<SigningKey, AuthError> {
    let parsed = spki
        .parsed()
        .map_err(|e| malformed(format!("unreadable public key: {e}")))?;

    let (algorithm, decoding_key) = match parsed {
        PublicKey::RSA(rsa) => {
            let modulus = URL_SAFE_NO_PAD.encode(strip_leading_zeros(rsa.modulus));
            let exponent = URL_SAFE_NO_PAD.encode(strip_leading_zeros(rsa.exponent));
            let key = DecodingKey::from_rsa_components(&modulus, &exponent)
                .map_err(|e| malformed(format!("invalid RSA key: {e}")))?;
            (KeyAlgorithm::Rs256, key)
        }
        PublicKey::EC(point) => {
            let data = point.data();
            if data.len() != P256_UNCOMPRESSED_POINT_LEN || data.first() != Some(&0x04) {
                return Err(malformed("EC key is not an uncompressed P-256 point"));
            }
            (KeyAlgorithm::Es256, DecodingKey::from_ec_der(data))
        }
        _ => return Err(malformed("unsupported public key algorithm")),
    };

    Ok(SigningKey {
        kid: None,
        algorithm,
        decoding_key,
        certificate_fingerprint: None,
    })
}

fn ec_key_from_coordinates(x: &str, y: &str) -> Result<DecodingKey, AuthError> {
    let x = URL_SAFE_NO_PAD
        .decode(x)
        .map_err(|e| malformed(format!("invalid EC 'x': {e}")))?;
    let y = URL_SAFE_NO_PAD
        .decode(y)
        .map_err(|e| malformed(format!("invalid EC 'y': {e}")))?;

    if x.len() != P256_COORDINATE_LEN || y.len() != P256_COORDINATE_LEN {
        return Err(malformed("EC coordinates must be 32 bytes for P-256"));
    }

    let mut point = Vec::with_capacity(P256_UNCOMPRESSED_POINT_LEN);
    point.push(0x04);
    point.extend_from_slice(&x);
    point.extend_from_slice(&y);
    Ok(DecodingKey::from_ec_der(&point))
}

fn strip_leading_zeros(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    bytes.get(start..).unwrap_or_default()
}

fn sha256_fingerprint(der: &[u8]) -> String {
    hex::encode(ring::digest::digest(&ring::digest::SHA256, der).as_ref())
}

fn malformed(detail: impl Into<String>) -> AuthError {
    AuthError::MalformedKeyMaterial(detail.into())
}
