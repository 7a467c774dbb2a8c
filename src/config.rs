//! Connection descriptor supplied by a configuration-loading collaborator.
//!
//! The record is deliberately loose: certificate and key material may arrive
//! inline (base64 or raw PEM text) or as file paths, numeric tuning fields
//! use zero-or-negative to mean "library default", and nothing here is
//! validated until a client is actually built from it.

use serde::{Deserialize, Serialize};
use std::{fmt, path::PathBuf, str::FromStr};

/// Default algorithm tag for client private keys.
pub const DEFAULT_KEY_ALGORITHM: &str = "RSA";

/// Default passphrase carried by legacy key records. Encrypted keys are
/// rejected at decode time, so this never unlocks anything; it exists for
/// record fidelity with configurations in the wild.
pub const DEFAULT_KEY_PASSPHRASE: &str = "changeit";

/// Caller-supplied connection descriptor, immutable once used to build a
/// client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Target URL; bare request helpers default to it.
    pub master_url: String,
    /// Opaque cluster identifier, part of the cache fingerprint.
    pub cluster_id: String,
    /// Insecure mode: accept every server certificate and skip hostname
    /// verification. Takes precedence over all other trust-material fields.
    /// Never the default.
    pub trust_all: bool,
    pub username: Option<String>,
    pub password: Option<String>,
    pub bearer_token: Option<String>,
    /// CA material, inline. May hold base64 or raw PEM text.
    pub ca_cert_data: Option<String>,
    pub ca_cert_file: Option<PathBuf>,
    pub client_cert_data: Option<String>,
    pub client_cert_file: Option<PathBuf>,
    pub client_key_data: Option<String>,
    pub client_key_file: Option<PathBuf>,
    pub client_key_algo: String,
    pub client_key_passphrase: Option<String>,
    /// Explicit PEM bundle used as the base trust store instead of the
    /// platform defaults.
    pub trust_store_file: Option<PathBuf>,
    /// Milliseconds; zero or negative means the client library default.
    pub connect_timeout_ms: i64,
    /// Milliseconds; zero or negative means the client library default.
    pub request_timeout_ms: i64,
    /// Keep-alive ping interval in milliseconds; zero or negative disables.
    pub ping_interval_ms: i64,
    /// Connection-pool bound; zero or negative means the library default.
    pub max_connections: i64,
    /// Per-host concurrency cap; zero or negative means uncapped.
    pub max_requests_per_host: i64,
    pub http_proxy: Option<String>,
    pub https_proxy: Option<String>,
    pub proxy_username: Option<String>,
    pub proxy_password: Option<String>,
    /// Host suffixes that bypass any configured proxy.
    pub no_proxy: Vec<String>,
    pub user_agent: Option<String>,
    /// Allowed TLS versions; empty means the TLS library default.
    pub tls_versions: Vec<TlsVersion>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            master_url: String::new(),
            cluster_id: String::new(),
            trust_all: false,
            username: None,
            password: None,
            bearer_token: None,
            ca_cert_data: None,
            ca_cert_file: None,
            client_cert_data: None,
            client_cert_file: None,
            client_key_data: None,
            client_key_file: None,
            client_key_algo: DEFAULT_KEY_ALGORITHM.to_string(),
            client_key_passphrase: Some(DEFAULT_KEY_PASSPHRASE.to_string()),
            trust_store_file: None,
            connect_timeout_ms: 0,
            request_timeout_ms: 0,
            ping_interval_ms: 0,
            max_connections: 0,
            max_requests_per_host: 0,
            http_proxy: None,
            https_proxy: None,
            proxy_username: None,
            proxy_password: None,
            no_proxy: Vec::new(),
            user_agent: None,
            tls_versions: Vec::new(),
        }
    }
}

impl ConnectionConfig {
    /// Username/password pair, present only when both are non-empty.
    #[must_use]
    pub fn basic_credentials(&self) -> Option<(&str, &str)> {
        match (
            non_empty(self.username.as_deref()),
            non_empty(self.password.as_deref()),
        ) {
            (Some(user), Some(pass)) => Some((user, pass)),
            _ => None,
        }
    }

    /// Bearer token when non-empty.
    #[must_use]
    pub fn bearer(&self) -> Option<&str> {
        non_empty(self.bearer_token.as_deref())
    }

    /// Whether both client certificate and client key material are present.
    /// Client authentication is only attempted when this holds.
    #[must_use]
    pub fn has_client_auth_material(&self) -> bool {
        let cert = non_empty(self.client_cert_data.as_deref()).is_some()
            || self.client_cert_file.is_some();
        let key = non_empty(self.client_key_data.as_deref()).is_some()
            || self.client_key_file.is_some();
        cert && key
    }

    /// Whether any CA material is configured.
    #[must_use]
    pub fn has_ca_material(&self) -> bool {
        non_empty(self.ca_cert_data.as_deref()).is_some() || self.ca_cert_file.is_some()
    }
}

pub(crate) fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// TLS protocol versions the client may negotiate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TlsVersion {
    #[serde(rename = "TLSv1.2")]
    Tls12,
    #[serde(rename = "TLSv1.3")]
    Tls13,
}

impl TlsVersion {
    /// Standard protocol name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Tls12 => "TLSv1.2",
            Self::Tls13 => "TLSv1.3",
        }
    }
}

impl fmt::Display for TlsVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TlsVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "TLSv1.2" => Ok(Self::Tls12),
            "TLSv1.3" => Ok(Self::Tls13),
            _ => Err(format!("unsupported TLS version: {s}")),
        }
    }
}
