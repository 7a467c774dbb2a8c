//! HTTP client construction, caching, and request helpers
//!
//! # Module Organization
//!
//! - `cache` - Fingerprint-keyed client cache with explicit eviction
//! - `factory` - Client construction from connection records
//! - `http` - Request helpers over a constructed client
//!
//! # Example
//!
//! ```rust,ignore
//! use promlink::{ClientFactory, ConnectionConfig};
//!
//! let factory = ClientFactory::new();
//! let connection = factory.get_or_build(&config).await?;
//! if let Some(response) = connection.get(connection.target_url(), None).await {
//!     println!("{}", response.status);
//! }
//! ```

pub mod cache;
pub mod factory;
pub mod http;

// Re-export commonly used types
pub use cache::{CachePolicy, ClientCache, Fingerprint};
pub use factory::ClientFactory;
pub use http::{HttpConnection, HttpResponse};
