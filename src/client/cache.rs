//! Client caching keyed by connection fingerprints.
//!
//! Clients are expensive to build (trust stores, TLS contexts, pools), so
//! one is kept per distinct connection identity. Eviction is explicit and
//! injectable through [`CachePolicy`] rather than implied by the map.

use crate::{config::ConnectionConfig, error::Result};
use sha2::{Digest, Sha256};
use std::{
    collections::HashMap,
    fmt,
    future::Future,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::Mutex;
use tracing::debug;

/// Identity of a connection record for cache lookups.
///
/// Only the fields that change the constructed client feed the digest:
/// cluster id, target URL, and credentials, joined with `/`. Unrelated
/// fields can change without invalidating a cached client.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    #[must_use]
    pub fn of(config: &ConnectionConfig) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(config.cluster_id.as_bytes());
        hasher.update(b"/");
        hasher.update(config.master_url.as_bytes());
        hasher.update(b"/");
        hasher.update(config.username.as_deref().unwrap_or_default().as_bytes());
        hasher.update(b"/");
        hasher.update(config.password.as_deref().unwrap_or_default().as_bytes());
        hasher.update(b"/");
        hasher.update(
            config
                .bearer_token
                .as_deref()
                .unwrap_or_default()
                .as_bytes(),
        );
        Self(hex::encode(hasher.finalize()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Eviction behavior for the client cache.
#[derive(Debug, Clone, Copy, Default)]
pub struct CachePolicy {
    /// Entries older than this are dropped and rebuilt on next lookup.
    /// `None` keeps entries forever.
    pub ttl: Option<Duration>,
    /// Oldest entries are dropped so the cache never holds more than this
    /// many clients. `None` leaves the cache unbounded.
    pub max_entries: Option<usize>,
}

struct Entry<T> {
    value: Arc<T>,
    inserted_at: Instant,
}

/// Keyed cache with insert-if-absent semantics.
///
/// A given entry is built at most once even under concurrent lookups: the
/// map lock is held across the build future, so racing callers wait for the
/// winner and then share its client.
pub struct ClientCache<T> {
    entries: Mutex<HashMap<Fingerprint, Entry<T>>>,
    policy: CachePolicy,
}

impl<T> ClientCache<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::with_policy(CachePolicy::default())
    }

    #[must_use]
    pub fn with_policy(policy: CachePolicy) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            policy,
        }
    }

    /// Look up a live entry. Expired entries are dropped, not returned.
    pub async fn get(&self, fingerprint: &Fingerprint) -> Option<Arc<T>> {
        let mut entries = self.entries.lock().await;
        match entries.get(fingerprint) {
            Some(entry) if !self.expired(entry) => Some(Arc::clone(&entry.value)),
            Some(_) => {
                entries.remove(fingerprint);
                None
            }
            None => None,
        }
    }

    /// Return the cached entry for `fingerprint`, building and inserting it
    /// when absent or expired.
    ///
    /// # Errors
    ///
    /// The build future's error, when a fresh entry is needed and the build
    /// fails. Failed builds leave the cache unchanged.
    pub async fn get_or_try_insert_with<F>(
        &self,
        fingerprint: Fingerprint,
        build: F,
    ) -> Result<Arc<T>>
    where
        F: Future<Output = Result<T>>,
    {
        let mut entries = self.entries.lock().await;
        if let Some(entry) = entries.get(&fingerprint) {
            if self.expired(entry) {
                entries.remove(&fingerprint);
                debug!(fingerprint = %fingerprint, "cached client expired, rebuilding");
            } else {
                return Ok(Arc::clone(&entry.value));
            }
        }

        let value = Arc::new(build.await?);
        entries.insert(
            fingerprint,
            Entry {
                value: Arc::clone(&value),
                inserted_at: Instant::now(),
            },
        );
        if let Some(max) = self.policy.max_entries {
            while entries.len() > max {
                let oldest = entries
                    .iter()
                    .min_by_key(|(_, entry)| entry.inserted_at)
                    .map(|(key, _)| key.clone());
                let Some(oldest) = oldest else { break };
                entries.remove(&oldest);
                debug!(fingerprint = %oldest, "evicted oldest cached client");
            }
        }
        Ok(value)
    }

    pub async fn remove(&self, fingerprint: &Fingerprint) -> Option<Arc<T>> {
        self.entries
            .lock()
            .await
            .remove(fingerprint)
            .map(|entry| entry.value)
    }

    pub async fn clear(&self) {
        self.entries.lock().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    fn expired(&self, entry: &Entry<T>) -> bool {
        self.policy
            .ttl
            .is_some_and(|ttl| entry.inserted_at.elapsed() >= ttl)
    }
}

impl<T> Default for ClientCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for ClientCache<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCache")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}
