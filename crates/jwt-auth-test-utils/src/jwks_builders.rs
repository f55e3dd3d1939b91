//! JWKS document builders and key source fixtures
//!
//! Builds JWKS JSON documents from the static fixtures, writes them to
//! temporary files, and mounts them on a wiremock server.

use serde_json::{json, Value};
use std::io::Write;
use tempfile::NamedTempFile;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::crypto_fixtures::{JWKS_ES256_JSON, JWKS_RS256_JSON, JWKS_X5C_RS256_JSON};

/// Path the JWKS is served under by [`mount_jwks`].
pub const JWKS_PATH: &str = "/.well-known/jwks.json";

fn first_key(document: &str) -> Value {
    let document: Value = serde_json::from_str(document).expect("fixture JWKS should be JSON");
    document["keys"][0].clone()
}

/// The RSA key `K1` as a JWK object.
pub fn rs256_jwk() -> Value {
    first_key(JWKS_RS256_JSON)
}

/// The EC key `K2` as a JWK object.
pub fn es256_jwk() -> Value {
    first_key(JWKS_ES256_JSON)
}

/// The certificate-backed key `kid_x5c` as a JWK object.
pub fn x5c_jwk() -> Value {
    first_key(JWKS_X5C_RS256_JSON)
}

/// Wrap JWK objects in a standard `{"keys": [...]}` document.
pub fn jwks_document(keys: Vec<Value>) -> Value {
    json!({ "keys": keys })
}

/// Write a JWKS document to a temporary file that lives as long as the
/// returned handle.
pub fn write_jwks_file(document: &Value) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file should be created");
    file.write_all(document.to_string().as_bytes())
        .expect("temp file should be writable");
    file.flush().expect("temp file should flush");
    file
}

/// Serve `document` at [`JWKS_PATH`] and return the full URL.
pub async fn mount_jwks(server: &MockServer, document: &Value) -> String {
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(document))
        .mount(server)
        .await;
    jwks_url(server)
}

/// Answer [`JWKS_PATH`] with the given HTTP status and an empty body.
pub async fn mount_jwks_status(server: &MockServer, status: u16) -> String {
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
    jwks_url(server)
}

/// Full JWKS URL on a mock server.
pub fn jwks_url(server: &MockServer) -> String {
    format!("{}{}", server.uri(), JWKS_PATH)
}
