//! TLS material loading and context construction module
//!
//! This module turns connection records into rustls client configurations,
//! covering trust-store assembly, client identities, and the explicit
//! trust-all bypass.
//!
//! # Module Organization
//!
//! - `material` - Certificate/key material loading and trust-store assembly
//! - `context` - rustls client configuration construction
//! - `verifier` - Custom certificate verifiers
//!
//! # Example
//!
//! ```rust,ignore
//! use promlink::{ConnectionConfig, tls::build_client_tls};
//!
//! let config = ConnectionConfig {
//!     master_url: "https://prometheus.example:9090".to_string(),
//!     ca_cert_file: Some("/etc/ssl/certs/ca.crt".into()),
//!     ..Default::default()
//! };
//!
//! let tls = build_client_tls(&config).await?;
//! ```

pub mod context;
pub mod material;
pub mod verifier;

// Re-export commonly used types
pub use context::{build_client_tls, ensure_crypto_provider};
pub use material::{ClientIdentity, TrustStore, build_client_identity, build_trust_store};
pub use verifier::InsecureServerVerifier;
