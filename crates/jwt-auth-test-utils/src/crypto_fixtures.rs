//! Static cryptographic fixtures
//!
//! Keys and certificates are generated once and checked in so that tests
//! are reproducible. Certificates are valid from 2020-01-01 to 2120-01-01.
//!
//! - `K1`: RSA-2048 key, published in `jwks_rs256.json`
//! - `K2`: P-256 key, published in `jwks_es256.json`
//! - Root CA -> Intermediate CA -> leaf chain, with an RSA leaf
//!   (`jwt-signer.example.localhost`) and an EC leaf
//!   (`ec-signer.example.localhost`)
//! - A rogue self-signed certificate whose subject impersonates the
//!   intermediate CA with a different key

use base64::{engine::general_purpose::STANDARD, Engine};

/// Key ID of the RSA key in `JWKS_RS256_JSON`.
pub const RSA_K1_KID: &str = "K1";

/// Key ID of the EC key in `JWKS_ES256_JSON`.
pub const EC_K2_KID: &str = "K2";

/// Key ID of the certificate-backed key in `JWKS_X5C_RS256_JSON`.
pub const X5C_KID: &str = "kid_x5c";

pub const RSA_K1_PRIVATE_PEM: &str = include_str!("../fixtures/rsa_k1_private.pem");
pub const RSA_K1_PUBLIC_PEM: &str = include_str!("../fixtures/rsa_k1_public.pem");
pub const EC_K2_PRIVATE_PEM: &str = include_str!("../fixtures/ec_k2_private.pem");
pub const EC_K2_PUBLIC_PEM: &str = include_str!("../fixtures/ec_k2_public.pem");

pub const ROOT_CERT_PEM: &str = include_str!("../fixtures/root_cert.pem");
pub const INTERMEDIATE_CERT_PEM: &str = include_str!("../fixtures/intermediate_cert.pem");
pub const LEAF_CERT_PEM: &str = include_str!("../fixtures/leaf_cert.pem");
pub const LEAF_PRIVATE_PEM: &str = include_str!("../fixtures/leaf_private.pem");
pub const EC_LEAF_CERT_PEM: &str = include_str!("../fixtures/ec_leaf_cert.pem");
pub const EC_LEAF_PRIVATE_PEM: &str = include_str!("../fixtures/ec_leaf_private.pem");
pub const ROGUE_CERT_PEM: &str = include_str!("../fixtures/rogue_cert.pem");

/// JWKS with the RSA key `K1`.
pub const JWKS_RS256_JSON: &str = include_str!("../fixtures/jwks_rs256.json");

/// JWKS with the EC key `K2`.
pub const JWKS_ES256_JSON: &str = include_str!("../fixtures/jwks_es256.json");

/// JWKS whose only key (`kid_x5c`) is carried as an `x5c` chain
/// (RSA leaf, intermediate) without inline `n`/`e`.
pub const JWKS_X5C_RS256_JSON: &str = include_str!("../fixtures/jwks_x5c_rs256.json");

/// DER bytes of a single-block PEM.
pub fn pem_to_der(pem: &str) -> Vec<u8> {
    let body: String = pem
        .lines()
        .filter(|line| !line.starts_with("-----"))
        .map(str::trim)
        .collect();
    STANDARD
        .decode(body)
        .expect("fixture PEM should be valid base64")
}

/// Standard base64 DER of a PEM certificate, as carried in `x5c`.
pub fn certificate_der_b64(pem: &str) -> String {
    STANDARD.encode(pem_to_der(pem))
}

/// Build an `x5c` array from PEM certificates, leaf first.
pub fn x5c_chain(pems: &[&str]) -> Vec<String> {
    pems.iter().map(|pem| certificate_der_b64(pem)).collect()
}
