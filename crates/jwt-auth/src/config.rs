//! JWT authentication configuration.
//!
//! Configuration is loaded once at process start from environment variables
//! and is immutable afterwards. No field holds a secret, so the `Debug`
//! output is a plain field listing.

use common::jwt::{DEFAULT_CLOCK_SKEW, MAX_CLOCK_SKEW};
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Default JWKS refresh period in seconds.
pub const DEFAULT_REFRESH_INTERVAL_SECONDS: u64 = 60;

/// Shortest allowed JWKS refresh period in seconds.
pub const MIN_REFRESH_INTERVAL_SECONDS: u64 = 1;

/// Longest allowed JWKS refresh period in seconds (one day).
pub const MAX_REFRESH_INTERVAL_SECONDS: u64 = 86_400;

/// Default bound on a single JWKS fetch in seconds.
pub const DEFAULT_FETCH_TIMEOUT_SECONDS: u64 = 10;

/// Default payload claim holding the login identity.
pub const DEFAULT_USERNAME_CLAIM: &str = "username";

/// Where the JWKS document comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySource {
    /// Local JSON file, loaded once at startup.
    File(PathBuf),

    /// HTTP(S) endpoint, fetched at startup and refreshed periodically.
    Url(String),
}

impl fmt::Display for KeySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeySource::File(path) => write!(f, "file:{}", path.display()),
            KeySource::Url(url) => write!(f, "{url}"),
        }
    }
}

/// JWT authentication configuration.
#[derive(Clone, PartialEq, Eq)]
pub struct Config {
    /// Whether the JWT mechanism is active at all (`JWT_TOKEN_AUTH`).
    pub auth_enabled: bool,

    /// Whether signatures are verified (`JWT_VALIDATE_SIGNATURE`).
    /// Disabling it is a test/debug opt-out.
    pub validate_signature: bool,

    /// JWKS source (`JWKS_FILE_PATH` or `JWKS_URL`).
    pub key_source: Option<KeySource>,

    /// Period between JWKS refreshes for URL sources.
    pub refresh_interval: Duration,

    /// Verify the JWKS server certificate. `false` is a trust downgrade.
    pub verify_server_certificate: bool,

    /// PEM bundle of CA certificates trusted for the JWKS endpoint.
    /// When set, it replaces the built-in roots.
    pub ca_certificate_path: Option<PathBuf>,

    /// Refuse non-`https` JWKS URLs.
    pub require_tls: bool,

    /// Bound on each JWKS fetch (startup and refresh).
    pub fetch_timeout: Duration,

    /// Payload claim holding the login identity.
    pub username_claim: String,

    /// Allow the mechanism on a frontend without transport security.
    pub allow_without_transport_security: bool,

    /// Leeway for `exp` and `nbf` checks.
    pub clock_skew: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            auth_enabled: false,
            validate_signature: true,
            key_source: None,
            refresh_interval: Duration::from_secs(DEFAULT_REFRESH_INTERVAL_SECONDS),
            verify_server_certificate: true,
            ca_certificate_path: None,
            require_tls: false,
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECONDS),
            username_claim: DEFAULT_USERNAME_CLAIM.to_string(),
            allow_without_transport_security: false,
            clock_skew: DEFAULT_CLOCK_SKEW,
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("auth_enabled", &self.auth_enabled)
            .field("validate_signature", &self.validate_signature)
            .field("key_source", &self.key_source)
            .field("refresh_interval", &self.refresh_interval)
            .field("verify_server_certificate", &self.verify_server_certificate)
            .field("ca_certificate_path", &self.ca_certificate_path)
            .field("require_tls", &self.require_tls)
            .field("fetch_timeout", &self.fetch_timeout)
            .field("username_claim", &self.username_claim)
            .field(
                "allow_without_transport_security",
                &self.allow_without_transport_security,
            )
            .field("clock_skew", &self.clock_skew)
            .finish()
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid boolean configuration: {0}")]
    InvalidBoolean(String),

    #[error("JWKS_FILE_PATH and JWKS_URL are mutually exclusive")]
    ConflictingKeySources,

    #[error("JWT auth with signature validation requires JWKS_FILE_PATH or JWKS_URL")]
    MissingKeySource,

    #[error("Invalid JWKS URL: {0}")]
    InvalidJwksUrl(String),

    #[error("Invalid JWKS refresh interval: {0}")]
    InvalidRefreshInterval(String),

    #[error("Invalid JWKS fetch timeout: {0}")]
    InvalidFetchTimeout(String),

    #[error("Invalid username claim: {0}")]
    InvalidUsernameClaim(String),

    #[error("Invalid JWT clock skew configuration: {0}")]
    InvalidJwtClockSkew(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let auth_enabled = parse_bool(vars, "JWT_TOKEN_AUTH", false)?;
        let validate_signature = parse_bool(vars, "JWT_VALIDATE_SIGNATURE", true)?;
        let verify_server_certificate = parse_bool(vars, "JWKS_VERIFY_SERVER_CERTIFICATE", true)?;
        let require_tls = parse_bool(vars, "JWKS_REQUIRE_TLS", false)?;
        let allow_without_transport_security = parse_bool(vars, "JWT_ALLOW_WITHOUT_TLS", false)?;

        let file_path = non_empty(vars, "JWKS_FILE_PATH");
        let url = non_empty(vars, "JWKS_URL");

        let key_source = match (file_path, url) {
            (Some(_), Some(_)) => return Err(ConfigError::ConflictingKeySources),
            (Some(path), None) => Some(KeySource::File(PathBuf::from(path))),
            (None, Some(url)) => {
                let is_https = url.starts_with("https://");
                if !is_https && !url.starts_with("http://") {
                    return Err(ConfigError::InvalidJwksUrl(format!(
                        "JWKS_URL must use http or https, got '{}'",
                        url
                    )));
                }
                if require_tls && !is_https {
                    return Err(ConfigError::InvalidJwksUrl(format!(
                        "JWKS_REQUIRE_TLS is set but JWKS_URL is not https: '{}'",
                        url
                    )));
                }
                Some(KeySource::Url(url.to_string()))
            }
            (None, None) => None,
        };

        if auth_enabled && validate_signature && key_source.is_none() {
            return Err(ConfigError::MissingKeySource);
        }

        // Parse refresh interval with floor and ceiling
        let refresh_interval = if let Some(value_str) = vars.get("JWKS_UPDATE_FREQUENCY_S") {
            let value: u64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidRefreshInterval(format!(
                    "JWKS_UPDATE_FREQUENCY_S must be a valid positive integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if value < MIN_REFRESH_INTERVAL_SECONDS {
                return Err(ConfigError::InvalidRefreshInterval(format!(
                    "JWKS_UPDATE_FREQUENCY_S must be at least {} second(s), got {}",
                    MIN_REFRESH_INTERVAL_SECONDS, value
                )));
            }

            if value > MAX_REFRESH_INTERVAL_SECONDS {
                return Err(ConfigError::InvalidRefreshInterval(format!(
                    "JWKS_UPDATE_FREQUENCY_S must be at most {} seconds, got {}",
                    MAX_REFRESH_INTERVAL_SECONDS, value
                )));
            }

            Duration::from_secs(value)
        } else {
            Duration::from_secs(DEFAULT_REFRESH_INTERVAL_SECONDS)
        };

        let fetch_timeout = if let Some(value_str) = vars.get("JWKS_FETCH_TIMEOUT_S") {
            let value: u64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidFetchTimeout(format!(
                    "JWKS_FETCH_TIMEOUT_S must be a valid positive integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if value == 0 {
                return Err(ConfigError::InvalidFetchTimeout(
                    "JWKS_FETCH_TIMEOUT_S must be greater than 0".to_string(),
                ));
            }

            Duration::from_secs(value)
        } else {
            Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECONDS)
        };

        let username_claim = match vars.get("JWT_CUSTOM_CLAIM_USERNAME") {
            Some(value) if value.trim().is_empty() => {
                return Err(ConfigError::InvalidUsernameClaim(
                    "JWT_CUSTOM_CLAIM_USERNAME must not be empty".to_string(),
                ));
            }
            Some(value) => value.clone(),
            None => DEFAULT_USERNAME_CLAIM.to_string(),
        };

        // Parse JWT clock skew tolerance with validation
        let clock_skew = if let Some(value_str) = vars.get("JWT_CLOCK_SKEW_SECONDS") {
            let value: u64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidJwtClockSkew(format!(
                    "JWT_CLOCK_SKEW_SECONDS must be a valid non-negative integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if value > MAX_CLOCK_SKEW.as_secs() {
                return Err(ConfigError::InvalidJwtClockSkew(format!(
                    "JWT_CLOCK_SKEW_SECONDS must not exceed {} seconds, got {}",
                    MAX_CLOCK_SKEW.as_secs(),
                    value
                )));
            }

            Duration::from_secs(value)
        } else {
            DEFAULT_CLOCK_SKEW
        };

        Ok(Config {
            auth_enabled,
            validate_signature,
            key_source,
            refresh_interval,
            verify_server_certificate,
            ca_certificate_path: non_empty(vars, "JWKS_CA_CERTIFICATE").map(PathBuf::from),
            require_tls,
            fetch_timeout,
            username_claim,
            allow_without_transport_security,
            clock_skew,
        })
    }
}

fn parse_bool(
    vars: &HashMap<String, String>,
    name: &str,
    default: bool,
) -> Result<bool, ConfigError> {
    match vars.get(name).map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(default),
        Some(value) => match value.as_str() {
            "true" | "1" => Ok(true),
            "false" | "0" => Ok(false),
            _ => Err(ConfigError::InvalidBoolean(format!(
                "{} must be true/false/1/0, got '{}'",
                name, value
            ))),
        },
    }
}

fn non_empty<'a>(vars: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    vars.get(name)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
}
