//! TLS-capable HTTP client construction for cluster endpoints
//!
//! Builds, caches, and hands out HTTP clients for talking to monitored
//! cluster endpoints: trust material from inline base64, PEM text, or
//! files; optional mutual TLS; an explicit trust-all escape hatch; and
//! per-identity client reuse.
//!
//! # Module Organization
//!
//! - `config` - Connection records and their defaults
//! - `der` - Minimal DER reader for bare PKCS#1 RSA keys
//! - `error` - Error taxonomy
//! - `tls` - Material loading and TLS context construction
//! - `client` - Client construction, caching, and request helpers
//!
//! # Example
//!
//! ```rust,ignore
//! use promlink::{ClientFactory, ConnectionConfig};
//!
//! let factory = ClientFactory::new();
//! let config = ConnectionConfig {
//!     master_url: "https://prometheus.example:9090".to_string(),
//!     cluster_id: "edge-1".to_string(),
//!     ca_cert_file: Some("/etc/promlink/ca.pem".into()),
//!     ..Default::default()
//! };
//!
//! let connection = factory.get_or_build(&config).await?;
//! if let Some(response) = connection.get(connection.target_url(), None).await {
//!     println!("{} {}", response.status, response.body);
//! }
//! ```

pub mod client;
pub mod config;
pub mod der;
pub mod error;
pub mod tls;

// Re-export the types almost every caller needs
pub use client::{CachePolicy, ClientFactory, HttpConnection, HttpResponse};
pub use config::{ConnectionConfig, TlsVersion};
pub use error::{DecodeError, Error, Result};
