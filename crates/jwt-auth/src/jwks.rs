//! JWKS store: the current set of verification keys.
//!
//! The store holds exactly one immutable [`JwksSnapshot`]. A file source
//! is read once at startup; a URL source is fetched at startup and then
//! refreshed periodically by [`crate::tasks::jwks_refresh`]. Each
//! successful refresh publishes a new snapshot through a watch channel, so
//! readers either see the old set or the new set, never a mix.
//!
//! # Security
//!
//! - Startup load failures are fatal: a mechanism that cannot load keys
//!   must not run
//! - Refresh failures keep the previous snapshot (stale-but-available)
//! - `verify_server_certificate = false` disables peer verification and is
//!   logged as a warning
//! - A CA bundle replaces the built-in roots for the JWKS endpoint

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::instrument;

use crate::config::{Config, KeySource};
use crate::errors::AuthError;
use crate::keys::{Jwk, SigningKey};
use crate::observability::metrics;

/// JWKS document: the standard `{"keys": [...]}` object or a bare array.
///
/// Entries stay as raw JSON so one bad entry cannot fail the document.
#[derive(Deserialize)]
#[serde(untagged)]
enum JwksDocument {
    Set { keys: Vec<serde_json::Value> },
    Bare(Vec<serde_json::Value>),
}

impl JwksDocument {
    fn into_entries(self) -> Vec<serde_json::Value> {
        match self {
            JwksDocument::Set { keys } | JwksDocument::Bare(keys) => keys,
        }
    }
}

/// Immutable `kid` -> key mapping from one load or refresh.
#[derive(Debug)]
pub struct JwksSnapshot {
    keys: HashMap<String, Arc<SigningKey>>,
    fetched_at: DateTime<Utc>,
    source: KeySource,
}

impl JwksSnapshot {
    /// Parse a JWKS document.
    ///
    /// Entries that are not valid JWKs, lack a `kid`, or carry undecodable
    /// key material are dropped with a warning. For duplicate `kid`s the
    /// first entry wins.
    ///
    /// # Errors
    ///
    /// Returns `MalformedKeyMaterial` if the document is not a JWKS or no
    /// entry is usable.
    pub fn parse(document: &[u8], source: KeySource) -> Result<Self, AuthError> {
        let entries = serde_json::from_slice::<JwksDocument>(document)
            .map_err(|e| {
                AuthError::MalformedKeyMaterial(format!("JWKS document is not valid: {e}"))
            })?
            .into_entries();

        let total = entries.len();
        let mut keys = HashMap::with_capacity(total);

        for (index, entry) in entries.into_iter().enumerate() {
            let jwk: Jwk = match serde_json::from_value(entry) {
                Ok(jwk) => jwk,
                Err(e) => {
                    tracing::warn!(target: "jwt_auth.jwks", index, error = %e, "Dropping JWKS entry: not a JWK");
                    continue;
                }
            };

            let Some(kid) = jwk.kid.clone().filter(|kid| !kid.is_empty()) else {
                tracing::warn!(target: "jwt_auth.jwks", index, "Dropping JWKS entry: missing kid");
                continue;
            };

            if keys.contains_key(&kid) {
                tracing::warn!(target: "jwt_auth.jwks", index, kid = %kid, "Dropping JWKS entry: duplicate kid");
                continue;
            }

            match jwk.to_signing_key() {
                Ok(key) => {
                    keys.insert(kid, Arc::new(key));
                }
                Err(e) => {
                    tracing::warn!(target: "jwt_auth.jwks", index, kid = %kid, error = %e, "Dropping JWKS entry");
                }
            }
        }

        if keys.is_empty() {
            return Err(AuthError::MalformedKeyMaterial(format!(
                "JWKS contains no usable keys ({total} entries)"
            )));
        }

        tracing::debug!(
            target: "jwt_auth.jwks",
            source = %source,
            key_count = keys.len(),
            dropped = total - keys.len(),
            "Parsed JWKS"
        );

        Ok(Self {
            keys,
            fetched_at: Utc::now(),
            source,
        })
    }

    /// Key for `kid`, if present.
    pub fn get(&self, kid: &str) -> Option<Arc<SigningKey>> {
        self.keys.get(kid).cloned()
    }

    /// Key IDs in this snapshot (unordered).
    pub fn kids(&self) -> impl Iterator<Item = &str> {
        self.keys.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// When the document was loaded.
    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    /// Where the document came from.
    pub fn source(&self) -> &KeySource {
        &self.source
    }
}

/// HTTP(S) client for one JWKS URL, built from the trust settings.
#[derive(Debug)]
pub struct JwksFetcher {
    url: String,
    http_client: reqwest::Client,
}

impl JwksFetcher {
    /// Build a fetcher with the configured timeout and TLS trust policy.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` if the CA bundle cannot be read or holds no
    /// certificates, or the HTTP client cannot be built.
    pub fn new(url: String, config: &Config) -> Result<Self, AuthError> {
        let mut builder = reqwest::Client::builder()
            .timeout(config.fetch_timeout)
            .connect_timeout(config.fetch_timeout)
            .https_only(config.require_tls);

        if let Some(path) = &config.ca_certificate_path {
            let pem = std::fs::read(path).map_err(|e| {
                AuthError::Configuration(format!(
                    "cannot read JWKS CA bundle {}: {e}",
                    path.display()
                ))
            })?;
            let certificates = reqwest::Certificate::from_pem_bundle(&pem).map_err(|e| {
                AuthError::Configuration(format!("invalid JWKS CA bundle: {e}"))
            })?;
            if certificates.is_empty() {
                return Err(AuthError::Configuration(format!(
                    "JWKS CA bundle {} holds no certificates",
                    path.display()
                )));
            }

            tracing::debug!(
                target: "jwt_auth.jwks",
                certificate_count = certificates.len(),
                "Using JWKS CA bundle instead of built-in roots"
            );
            builder = builder.tls_built_in_root_certs(false);
            for certificate in certificates {
                builder = builder.add_root_certificate(certificate);
            }
        }

        if !config.verify_server_certificate {
            tracing::warn!(
                target: "jwt_auth.jwks",
                url = %url,
                "JWKS server certificate verification is DISABLED"
            );
            builder = builder.danger_accept_invalid_certs(true);
        }

        let http_client = builder.build().map_err(|e| {
            AuthError::Configuration(format!("cannot build JWKS HTTP client: {e}"))
        })?;

        Ok(Self { url, http_client })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// GET the JWKS document and parse it.
    ///
    /// # Errors
    ///
    /// - `KeyFetchFailed` - network, TLS, timeout, or non-2xx status
    /// - `MalformedKeyMaterial` - the body is not a usable JWKS
    #[instrument(skip_all)]
    pub async fn fetch(&self) -> Result<JwksSnapshot, AuthError> {
        tracing::debug!(target: "jwt_auth.jwks", url = %self.url, "Fetching JWKS");

        let response = self
            .http_client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| AuthError::KeyFetchFailed(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(AuthError::KeyFetchFailed(format!(
                "JWKS endpoint returned {}",
                response.status()
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| AuthError::KeyFetchFailed(format!("reading body failed: {e}")))?;

        JwksSnapshot::parse(&body, KeySource::Url(self.url.clone()))
    }
}

struct StoreInner {
    sender: watch::Sender<Arc<JwksSnapshot>>,
    fetcher: Option<JwksFetcher>,
}

/// Shared JWKS store. Cloning is cheap and clones share the snapshot.
#[derive(Clone)]
pub struct JwksStore {
    inner: Arc<StoreInner>,
}

impl JwksStore {
    /// Load the configured key source.
    ///
    /// A file is read and parsed once. A URL is fetched once, bounded by
    /// the fetch timeout.
    ///
    /// # Errors
    ///
    /// - `Configuration` - no key source, or bad TLS trust settings
    /// - `KeyFetchFailed` - file unreadable or URL unreachable
    /// - `MalformedKeyMaterial` - document unusable
    #[instrument(skip_all)]
    pub async fn load(config: &Config) -> Result<Self, AuthError> {
        let source = config.key_source.clone().ok_or_else(|| {
            AuthError::Configuration("no JWKS key source configured".to_string())
        })?;

        let (snapshot, fetcher) = match source {
            KeySource::File(path) => {
                let document = tokio::fs::read(&path).await.map_err(|e| {
                    AuthError::KeyFetchFailed(format!(
                        "cannot read JWKS file {}: {e}",
                        path.display()
                    ))
                })?;
                (JwksSnapshot::parse(&document, KeySource::File(path))?, None)
            }
            KeySource::Url(url) => {
                let fetcher = JwksFetcher::new(url, config)?;
                (fetcher.fetch().await?, Some(fetcher))
            }
        };

        tracing::info!(
            target: "jwt_auth.jwks",
            source = %snapshot.source(),
            key_count = snapshot.len(),
            "JWKS loaded"
        );
        metrics::set_jwks_key_count(snapshot.len());

        Ok(Self::with_parts(snapshot, fetcher))
    }

    /// Store over a fixed snapshot; [`refresh`](Self::refresh) is a no-op.
    pub fn from_snapshot(snapshot: JwksSnapshot) -> Self {
        Self::with_parts(snapshot, None)
    }

    fn with_parts(snapshot: JwksSnapshot, fetcher: Option<JwksFetcher>) -> Self {
        let (sender, _) = watch::channel(Arc::new(snapshot));
        Self {
            inner: Arc::new(StoreInner { sender, fetcher }),
        }
    }

    /// The latest published snapshot.
    pub fn current(&self) -> Arc<JwksSnapshot> {
        self.inner.sender.borrow().clone()
    }

    /// Key for `kid` from the current snapshot.
    ///
    /// # Errors
    ///
    /// Returns `KeyNotFound` if the current snapshot has no such key.
    pub fn lookup(&self, kid: &str) -> Result<Arc<SigningKey>, AuthError> {
        self.current().get(kid).ok_or_else(|| {
            tracing::debug!(target: "jwt_auth.jwks", kid = %kid, "Key not found in JWKS");
            AuthError::KeyNotFound
        })
    }

    /// Whether this store has a remote source to refresh from.
    pub fn is_refreshable(&self) -> bool {
        self.inner.fetcher.is_some()
    }

    /// Receiver notified on every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<Arc<JwksSnapshot>> {
        self.inner.sender.subscribe()
    }

    /// Fetch the URL source and publish a new snapshot.
    ///
    /// On failure the error is logged, the current snapshot stays
    /// published, and the error is returned. File-backed stores do nothing.
    #[instrument(skip_all)]
    pub async fn refresh(&self) -> Result<(), AuthError> {
        let Some(fetcher) = &self.inner.fetcher else {
            return Ok(());
        };

        match fetcher.fetch().await {
            Ok(snapshot) => {
                let key_count = snapshot.len();
                self.inner.sender.send_replace(Arc::new(snapshot));
                tracing::info!(
                    target: "jwt_auth.jwks",
                    url = %fetcher.url(),
                    key_count,
                    "JWKS refreshed"
                );
                metrics::record_jwks_refresh("success");
                metrics::set_jwks_key_count(key_count);
                Ok(())
            }
            Err(e) => {
                tracing::warn!(
                    target: "jwt_auth.jwks",
                    url = %fetcher.url(),
                    error = %e,
                    "JWKS refresh failed, keeping previous keys"
                );
                metrics::record_jwks_refresh("error");
                Err(e)
            }
        }
    }
}

impl std::fmt::Debug for JwksStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let current = self.current();
        f.debug_struct("JwksStore")
            .field("source", current.source())
            .field("key_count", &current.len())
            .field("refreshable", &self.is_refreshable())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use jwt_auth_test_utils::crypto_fixtures::*;
    use jwt_auth_test_utils::jwks_builders::*;
    use serde_json::json;
    use std::path::PathBuf;
    use std::time::Duration;
    use wiremock::MockServer;

    fn file_source() -> KeySource {
        KeySource::File(PathBuf::from("/test/jwks.json"))
    }

    fn url_config(url: String) -> Config {
        Config {
            auth_enabled: true,
            key_source: Some(KeySource::Url(url)),
            fetch_timeout: Duration::from_secs(2),
            ..Config::default()
        }
    }

    // -------------------------------------------------------------------------
    // JwksSnapshot::parse Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_parse_standard_document() {
        let document = jwks_document(vec![rs256_jwk(), es256_jwk(), x5c_jwk()]);
        let snapshot = JwksSnapshot::parse(document.to_string().as_bytes(), file_source()).unwrap();

        assert_eq!(snapshot.len(), 3);
        assert!(snapshot.get(RSA_K1_KID).is_some());
        assert!(snapshot.get(EC_K2_KID).is_some());
        assert!(snapshot.get(X5C_KID).is_some());
        assert!(snapshot.get("missing").is_none());
        assert_eq!(snapshot.source(), &file_source());
    }

    #[test]
    fn test_parse_fixture_files() {
        for (document, kid) in [
            (JWKS_RS256_JSON, RSA_K1_KID),
            (JWKS_ES256_JSON, EC_K2_KID),
            (JWKS_X5C_RS256_JSON, X5C_KID),
        ] {
            let snapshot = JwksSnapshot::parse(document.as_bytes(), file_source()).unwrap();
            assert_eq!(snapshot.kids().collect::<Vec<_>>(), vec![kid]);
        }
    }

    #[test]
    fn test_parse_bare_array() {
        let document = json!([rs256_jwk()]);
        let snapshot = JwksSnapshot::parse(document.to_string().as_bytes(), file_source()).unwrap();
        assert_eq!(snapshot.len(), 1);
    }

    #[test]
    fn test_parse_drops_malformed_entries() {
        let mut no_kid = rs256_jwk();
        no_kid.as_object_mut().unwrap().remove("kid");
        let mut empty_kid = es256_jwk();
        empty_kid["kid"] = json!("");
        let mut bad_modulus = rs256_jwk();
        bad_modulus["kid"] = json!("bad-n");
        bad_modulus["n"] = json!("!!!");

        let document = jwks_document(vec![
            json!("not-an-object"),
            json!({"kid": "no-kty"}),
            no_kid,
            empty_kid,
            bad_modulus,
            json!({"kty": "oct", "kid": "hmac", "k": "c2VjcmV0"}),
            es256_jwk(),
        ]);
        let snapshot = JwksSnapshot::parse(document.to_string().as_bytes(), file_source()).unwrap();

        assert_eq!(snapshot.kids().collect::<Vec<_>>(), vec![EC_K2_KID]);
    }

    #[test]
    fn test_parse_duplicate_kid_keeps_first() {
        let mut ec_as_k1 = es256_jwk();
        ec_as_k1["kid"] = json!(RSA_K1_KID);

        let document = jwks_document(vec![rs256_jwk(), ec_as_k1]);
        let snapshot = JwksSnapshot::parse(document.to_string().as_bytes(), file_source()).unwrap();

        assert_eq!(snapshot.len(), 1);
        assert_eq!(
            snapshot.get(RSA_K1_KID).unwrap().algorithm(),
            crate::keys::KeyAlgorithm::Rs256
        );
    }

    #[test]
    fn test_parse_rejects_no_usable_keys() {
        let result = JwksSnapshot::parse(br#"{"keys": []}"#, file_source());
        assert!(matches!(result, Err(AuthError::MalformedKeyMaterial(msg)) if msg.contains("no usable keys")));

        let result = JwksSnapshot::parse(br#"{"keys": [{"kty": "RSA"}]}"#, file_source());
        assert!(matches!(result, Err(AuthError::MalformedKeyMaterial(_))));
    }

    #[test]
    fn test_parse_rejects_non_jwks() {
        for document in [&b"not json"[..], &br#"{"keyz": []}"#[..], &b"42"[..]] {
            assert!(matches!(
                JwksSnapshot::parse(document, file_source()),
                Err(AuthError::MalformedKeyMaterial(_))
            ));
        }
    }

    // -------------------------------------------------------------------------
    // JwksStore file source Tests
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_load_file_and_lookup() {
        let file = write_jwks_file(&jwks_document(vec![rs256_jwk(), es256_jwk()]));
        let config = Config {
            auth_enabled: true,
            key_source: Some(KeySource::File(file.path().to_path_buf())),
            ..Config::default()
        };

        let store = JwksStore::load(&config).await.unwrap();

        assert!(!store.is_refreshable());
        assert_eq!(store.lookup(RSA_K1_KID).unwrap().kid(), Some(RSA_K1_KID));
        assert_eq!(store.lookup(EC_K2_KID).unwrap().kid(), Some(EC_K2_KID));
        assert_eq!(store.lookup("K3").unwrap_err(), AuthError::KeyNotFound);
    }

    #[tokio::test]
    async fn test_load_missing_file_is_fatal() {
        let config = Config {
            key_source: Some(KeySource::File(PathBuf::from(
                "/nonexistent/dir/jwks.json",
            ))),
            ..Config::default()
        };

        let result = JwksStore::load(&config).await;
        assert!(matches!(result, Err(AuthError::KeyFetchFailed(_))));
    }

    #[tokio::test]
    async fn test_load_unparsable_file_is_fatal() {
        let file = write_jwks_file(&json!({"keys": "nope"}));
        let config = Config {
            key_source: Some(KeySource::File(file.path().to_path_buf())),
            ..Config::default()
        };

        let result = JwksStore::load(&config).await;
        assert!(matches!(result, Err(AuthError::MalformedKeyMaterial(_))));
    }

    #[tokio::test]
    async fn test_load_without_source() {
        let result = JwksStore::load(&Config::default()).await;
        assert!(matches!(result, Err(AuthError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_refresh_file_store_is_noop() {
        let file = write_jwks_file(&jwks_document(vec![rs256_jwk()]));
        let config = Config {
            key_source: Some(KeySource::File(file.path().to_path_buf())),
            ..Config::default()
        };
        let store = JwksStore::load(&config).await.unwrap();
        let before = store.current();

        store.refresh().await.unwrap();

        assert!(Arc::ptr_eq(&before, &store.current()));
    }

    // -------------------------------------------------------------------------
    // JwksStore URL source Tests
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_load_url() {
        let server = MockServer::start().await;
        let url = mount_jwks(&server, &jwks_document(vec![rs256_jwk()])).await;

        let store = JwksStore::load(&url_config(url.clone())).await.unwrap();

        assert!(store.is_refreshable());
        assert!(store.lookup(RSA_K1_KID).is_ok());
        assert_eq!(store.current().source(), &KeySource::Url(url));
    }

    #[tokio::test]
    async fn test_load_url_error_status_is_fatal() {
        let server = MockServer::start().await;
        let url = mount_jwks_status(&server, 500).await;

        let result = JwksStore::load(&url_config(url)).await;
        assert!(matches!(result, Err(AuthError::KeyFetchFailed(msg)) if msg.contains("500")));
    }

    #[tokio::test]
    async fn test_load_url_unreachable_is_fatal() {
        // Port 9 (discard) on localhost: nothing listens in test environments
        let result = JwksStore::load(&url_config("http://127.0.0.1:9/jwks".to_string())).await;
        assert!(matches!(result, Err(AuthError::KeyFetchFailed(_))));
    }

    #[tokio::test]
    async fn test_refresh_replaces_snapshot() {
        let server = MockServer::start().await;
        let url = mount_jwks(&server, &jwks_document(vec![rs256_jwk()])).await;
        let store = JwksStore::load(&url_config(url)).await.unwrap();
        let mut updates = store.subscribe();

        server.reset().await;
        mount_jwks(&server, &jwks_document(vec![es256_jwk()])).await;
        store.refresh().await.unwrap();

        assert!(updates.has_changed().unwrap());
        assert_eq!(store.lookup(RSA_K1_KID).unwrap_err(), AuthError::KeyNotFound);
        assert!(store.lookup(EC_K2_KID).is_ok());
        assert_eq!(updates.borrow_and_update().len(), 1);
    }

    #[tokio::test]
    async fn test_refresh_failure_keeps_snapshot() {
        let server = MockServer::start().await;
        let url = mount_jwks(&server, &jwks_document(vec![rs256_jwk()])).await;
        let store = JwksStore::load(&url_config(url)).await.unwrap();
        let before = store.current();

        server.reset().await;
        mount_jwks_status(&server, 503).await;
        let result = store.refresh().await;

        assert!(matches!(result, Err(AuthError::KeyFetchFailed(_))));
        assert!(Arc::ptr_eq(&before, &store.current()));
        assert!(store.lookup(RSA_K1_KID).is_ok());
    }

    #[tokio::test]
    async fn test_refresh_with_empty_document_keeps_snapshot() {
        let server = MockServer::start().await;
        let url = mount_jwks(&server, &jwks_document(vec![rs256_jwk()])).await;
        let store = JwksStore::load(&url_config(url)).await.unwrap();

        server.reset().await;
        mount_jwks(&server, &jwks_document(vec![])).await;

        assert!(matches!(
            store.refresh().await,
            Err(AuthError::MalformedKeyMaterial(_))
        ));
        assert!(store.lookup(RSA_K1_KID).is_ok());
    }

    #[tokio::test]
    async fn test_clones_share_snapshot() {
        let server = MockServer::start().await;
        let url = mount_jwks(&server, &jwks_document(vec![rs256_jwk()])).await;
        let store = JwksStore::load(&url_config(url)).await.unwrap();
        let reader = store.clone();

        server.reset().await;
        mount_jwks(&server, &jwks_document(vec![es256_jwk()])).await;
        store.refresh().await.unwrap();

        assert!(reader.lookup(EC_K2_KID).is_ok());
    }

    // -------------------------------------------------------------------------
    // JwksFetcher trust settings Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_fetcher_with_ca_bundle() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), format!("{ROOT_CERT_PEM}{INTERMEDIATE_CERT_PEM}")).unwrap();

        let config = Config {
            ca_certificate_path: Some(file.path().to_path_buf()),
            ..Config::default()
        };
        let fetcher = JwksFetcher::new("https://jwks.example.localhost/".to_string(), &config);
        assert!(fetcher.is_ok());
    }

    #[test]
    fn test_fetcher_missing_ca_bundle() {
        let config = Config {
            ca_certificate_path: Some(PathBuf::from("/nonexistent/ca.pem")),
            ..Config::default()
        };
        let result = JwksFetcher::new("https://jwks.example.localhost/".to_string(), &config);
        assert!(matches!(result, Err(AuthError::Configuration(msg)) if msg.contains("CA bundle")));
    }

    #[test]
    fn test_fetcher_empty_ca_bundle() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "no certificates here\n").unwrap();

        let config = Config {
            ca_certificate_path: Some(file.path().to_path_buf()),
            ..Config::default()
        };
        let result = JwksFetcher::new("https://jwks.example.localhost/".to_string(), &config);
        assert!(matches!(result, Err(AuthError::Configuration(_))));
    }

    #[test]
    fn test_fetcher_without_verification_builds() {
        let config = Config {
            verify_server_certificate: false,
            ..Config::default()
        };
        let fetcher =
            JwksFetcher::new("https://jwks.example.localhost/".to_string(), &config).unwrap();
        assert_eq!(fetcher.url(), "https://jwks.example.localhost/");
    }

    #[tokio::test]
    async fn test_fetcher_https_only_refuses_http() {
        let server = MockServer::start().await;
        let url = mount_jwks(&server, &jwks_document(vec![rs256_jwk()])).await;

        let config = Config {
            require_tls: true,
            ..Config::default()
        };
        let fetcher = JwksFetcher::new(url, &config).unwrap();
        assert!(matches!(fetcher.fetch().await, Err(AuthError::KeyFetchFailed(_))));
    }
}
