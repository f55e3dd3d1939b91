//! HTTPS JWKS endpoint for trust-policy tests
//!
//! Generates a throwaway CA and a server certificate for `127.0.0.1` at
//! runtime, then serves one fixed JWKS document over TLS. The CA is not in
//! any built-in root store, so a client only connects if it trusts the CA
//! bundle written by [`TlsJwksServer::write_ca_bundle`] or skips peer
//! verification.

use rcgen::{
    BasicConstraints, CertificateParams, DnType, IsCa, KeyPair, KeyUsagePurpose, SanType,
};
use rustls::pki_types::{PrivateKeyDer, PrivatePkcs8KeyDer};
use serde_json::Value;
use std::io::Write;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use tempfile::NamedTempFile;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_rustls::TlsAcceptor;

use crate::jwks_builders::JWKS_PATH;

/// Upper bound on a request head; the client only sends a small GET.
const MAX_REQUEST_HEAD_BYTES: usize = 16 * 1024;

/// A JWKS document served over HTTPS on an ephemeral local port.
///
/// The accept loop is aborted on drop.
pub struct TlsJwksServer {
    addr: SocketAddr,
    ca_pem: String,
    accept_loop: JoinHandle<()>,
}

impl TlsJwksServer {
    /// Bind `127.0.0.1:0` and serve `document` at [`JWKS_PATH`].
    pub async fn start(document: &Value) -> Self {
        let (ca_pem, tls_config) = generate_tls_config();
        let acceptor = TlsAcceptor::from(Arc::new(tls_config));

        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0))
            .await
            .expect("TLS JWKS listener should bind");
        let addr = listener
            .local_addr()
            .expect("TLS JWKS listener should have an address");

        let body: Arc<str> = Arc::from(document.to_string());
        let accept_loop = tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    continue;
                };
                let acceptor = acceptor.clone();
                let body = Arc::clone(&body);

                tokio::spawn(async move {
                    // Handshake failures are the point of the untrusted-client tests
                    let Ok(mut tls) = acceptor.accept(stream).await else {
                        return;
                    };
                    if read_request_head(&mut tls).await.is_none() {
                        return;
                    }
                    let response = format!(
                        "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                        body.len(),
                        body
                    );
                    if tls.write_all(response.as_bytes()).await.is_ok() {
                        let _ = tls.shutdown().await;
                    }
                });
            }
        });

        Self {
            addr,
            ca_pem,
            accept_loop,
        }
    }

    /// `https://127.0.0.1:<port>/.well-known/jwks.json`
    pub fn url(&self) -> String {
        format!("https://{}{}", self.addr, JWKS_PATH)
    }

    /// PEM of the CA that issued the server certificate.
    pub fn ca_certificate_pem(&self) -> &str {
        &self.ca_pem
    }

    /// Write the CA certificate to a temp file usable as `JWKS_CA_CERT_PATH`.
    pub fn write_ca_bundle(&self) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("temp file should be created");
        file.write_all(self.ca_pem.as_bytes())
            .expect("temp file should be writable");
        file.flush().expect("temp file should flush");
        file
    }
}

impl Drop for TlsJwksServer {
    fn drop(&mut self) {
        self.accept_loop.abort();
    }
}

/// Read until the blank line ending the request head.
async fn read_request_head<S: AsyncRead + Unpin>(stream: &mut S) -> Option<()> {
    let mut head = Vec::new();
    let mut buf = [0u8; 1024];
    while !head.windows(4).any(|window| window == b"\r\n\r\n") {
        let n = stream.read(&mut buf).await.ok()?;
        if n == 0 || head.len() + n > MAX_REQUEST_HEAD_BYTES {
            return None;
        }
        head.extend_from_slice(&buf[..n]);
    }
    Some(())
}

/// Runtime CA plus a server certificate for `127.0.0.1` and `localhost`.
fn generate_tls_config() -> (String, rustls::ServerConfig) {
    let ca_key = KeyPair::generate().expect("CA key should generate");
    let mut ca_params =
        CertificateParams::new(Vec::<String>::new()).expect("CA params should build");
    ca_params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    ca_params
        .distinguished_name
        .push(DnType::CommonName, "jwt-auth test CA");
    ca_params.key_usages = vec![
        KeyUsagePurpose::KeyCertSign,
        KeyUsagePurpose::CrlSign,
        KeyUsagePurpose::DigitalSignature,
    ];
    let ca_cert = ca_params
        .self_signed(&ca_key)
        .expect("CA certificate should self-sign");

    let server_key = KeyPair::generate().expect("server key should generate");
    let mut server_params =
        CertificateParams::new(Vec::<String>::new()).expect("server params should build");
    server_params
        .distinguished_name
        .push(DnType::CommonName, "jwks.test");
    server_params.subject_alt_names = vec![
        SanType::IpAddress(IpAddr::V4(Ipv4Addr::LOCALHOST)),
        SanType::DnsName("localhost".try_into().expect("valid DNS name")),
    ];
    let server_cert = server_params
        .signed_by(&server_key, &ca_cert, &ca_key)
        .expect("server certificate should be signed by the CA");

    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let tls_config = rustls::ServerConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .expect("ring supports the default protocol versions")
        .with_no_client_auth()
        .with_single_cert(
            vec![server_cert.der().clone()],
            PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(server_key.serialize_der())),
        )
        .expect("server certificate and key should match");

    (ca_cert.pem(), tls_config)
}
