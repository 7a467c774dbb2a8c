//! Client construction and the factory cache.
//!
//! Turns a connection record into a ready [`HttpConnection`]: TLS context,
//! timeouts, connection pool, proxy, and resolved credentials. Factories
//! hand out cached clients keyed by connection fingerprint.

use super::{
    cache::{CachePolicy, ClientCache, Fingerprint},
    http::HttpConnection,
};
use crate::{
    config::{ConnectionConfig, non_empty},
    error::{Error, Result},
    tls::build_client_tls,
};
use base64::{Engine, engine::general_purpose::STANDARD};
use reqwest::{Client, ClientBuilder, Proxy, header::HeaderValue, redirect::Policy};
use std::{sync::Arc, time::Duration};
use tracing::debug;
use url::Url;

/// Idle pooled connections live this long once a pool bound is configured.
const POOL_IDLE_LIFETIME: Duration = Duration::from_secs(60);

const REDIRECT_LIMIT: usize = 10;

/// Builds and caches one [`HttpConnection`] per connection identity.
#[derive(Debug, Default)]
pub struct ClientFactory {
    cache: ClientCache<HttpConnection>,
}

impl ClientFactory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_policy(policy: CachePolicy) -> Self {
        Self {
            cache: ClientCache::with_policy(policy),
        }
    }

    /// Cached client for the record's identity, built on first use.
    ///
    /// Concurrent callers with the same identity share a single build; the
    /// cache insert is atomic, so no thundering herd of clients.
    ///
    /// # Errors
    ///
    /// TLS material or context failures, unparsable proxy configuration, and
    /// credentials that cannot form a request header.
    pub async fn get_or_build(&self, config: &ConnectionConfig) -> Result<Arc<HttpConnection>> {
        let fingerprint = Fingerprint::of(config);
        self.cache
            .get_or_try_insert_with(fingerprint, build_connection(config))
            .await
    }

    /// Drop the cached client for this record, if any.
    pub async fn evict(&self, config: &ConnectionConfig) {
        self.cache.remove(&Fingerprint::of(config)).await;
    }

    pub async fn clear(&self) {
        self.cache.clear().await;
    }

    pub async fn cached_clients(&self) -> usize {
        self.cache.len().await
    }
}

async fn build_connection(config: &ConnectionConfig) -> Result<HttpConnection> {
    let mut tls = build_client_tls(config).await?;
    // preconfigured TLS bypasses reqwest's own ALPN setup
    tls.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];

    let mut builder = Client::builder()
        .use_preconfigured_tls(tls)
        .redirect(Policy::limited(REDIRECT_LIMIT));

    if let Some(timeout) = positive_millis(config.connect_timeout_ms) {
        builder = builder.connect_timeout(timeout);
    }
    if let Some(timeout) = positive_millis(config.request_timeout_ms) {
        builder = builder.timeout(timeout);
    }
    if let Some(interval) = positive_millis(config.ping_interval_ms) {
        builder = builder.http2_keep_alive_interval(interval);
    }
    if let Ok(pool) = usize::try_from(config.max_connections)
        && pool > 0
    {
        builder = builder
            .pool_max_idle_per_host(pool)
            .pool_idle_timeout(POOL_IDLE_LIFETIME);
    }
    if let Some(agent) = non_empty(config.user_agent.as_deref()) {
        builder = builder.user_agent(agent);
    }
    builder = apply_proxy(builder, config)?;

    let client = builder
        .build()
        .map_err(|e| Error::TlsConstruction(format!("client construction failed: {e}")))?;
    let auth = auth_header(config)?;
    debug!(url = %config.master_url, "constructed HTTP client");
    Ok(HttpConnection::new(
        client,
        auth,
        config.master_url.clone(),
        config.max_requests_per_host,
    ))
}

fn positive_millis(millis: i64) -> Option<Duration> {
    u64::try_from(millis)
        .ok()
        .filter(|&value| value > 0)
        .map(Duration::from_millis)
}

/// How the proxy settings apply to one target URL.
#[derive(Debug, PartialEq, Eq)]
enum ProxySelection<'a> {
    /// No proxy configured for this target's scheme.
    Unproxied,
    /// Target host matches the no-proxy list; system proxies are bypassed
    /// as well.
    Bypass,
    Use(&'a str),
}

/// Pick the proxy for a target. Only explicit `http://`/`https://` targets
/// participate; `http` targets use the http proxy, everything else the
/// https proxy. A host-suffix match against the no-proxy list wins over
/// both.
///
/// # Errors
///
/// A target that claims an http scheme but does not parse as a URL.
fn select_proxy(config: &ConnectionConfig) -> Result<ProxySelection<'_>> {
    if !(config.master_url.starts_with("http://") || config.master_url.starts_with("https://")) {
        return Ok(ProxySelection::Unproxied);
    }
    let target = Url::parse(&config.master_url).map_err(|e| {
        Error::ProxyConfig(format!("unparsable target URL {}: {e}", config.master_url))
    })?;
    let Some(host) = target.host_str() else {
        return Ok(ProxySelection::Unproxied);
    };

    if config
        .no_proxy
        .iter()
        .any(|suffix| !suffix.is_empty() && host.ends_with(suffix))
    {
        debug!(host = %host, "target host matches the no-proxy list");
        return Ok(ProxySelection::Bypass);
    }

    let proxy_url = if target.scheme() == "http" {
        non_empty(config.http_proxy.as_deref())
    } else {
        non_empty(config.https_proxy.as_deref())
    };
    Ok(proxy_url.map_or(ProxySelection::Unproxied, ProxySelection::Use))
}

fn apply_proxy(builder: ClientBuilder, config: &ConnectionConfig) -> Result<ClientBuilder> {
    match select_proxy(config)? {
        ProxySelection::Unproxied => Ok(builder),
        ProxySelection::Bypass => Ok(builder.no_proxy()),
        ProxySelection::Use(proxy_url) => {
            let mut proxy = Proxy::all(proxy_url)
                .map_err(|e| Error::ProxyConfig(format!("invalid proxy URL {proxy_url}: {e}")))?;
            if let Some(username) = non_empty(config.proxy_username.as_deref()) {
                proxy = proxy.basic_auth(username, config.proxy_password.as_deref().unwrap_or_default());
            }
            debug!(proxy = %proxy_url, "using proxy for target");
            Ok(builder.proxy(proxy))
        }
    }
}

/// Resolved `Authorization` header for a record. Basic credentials win over
/// a bearer token when both are present.
fn auth_header(config: &ConnectionConfig) -> Result<Option<HeaderValue>> {
    let value = if let Some((username, password)) = config.basic_credentials() {
        Some(format!(
            "Basic {}",
            STANDARD.encode(format!("{username}:{password}"))
        ))
    } else {
        config.bearer().map(|token| format!("Bearer {token}"))
    };
    match value {
        Some(value) => {
            let mut header = HeaderValue::from_str(&value).map_err(|e| {
                Error::TlsConstruction(format!("credentials are not header-safe: {e}"))
            })?;
            header.set_sensitive(true);
            Ok(Some(header))
        }
        None => Ok(None),
    }
}
