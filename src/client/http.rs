//! Request helpers over a constructed client.
//!
//! Transport failures are logged and swallowed: every helper returns `None`
//! so probing callers can treat "endpoint unreachable" as an ordinary
//! outcome. A completed exchange with any status code yields `Some`.

use reqwest::{
    Client, StatusCode,
    header::{AUTHORIZATION, CONTENT_TYPE, COOKIE, HeaderMap, HeaderValue},
};
use std::{collections::HashMap, fmt, sync::Arc};
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};
use tracing::{debug, warn};
use url::Url;

/// Outcome of a completed HTTP exchange, whatever the status code.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl HttpResponse {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Caps in-flight requests per target host.
struct HostLimiter {
    permits: usize,
    hosts: Mutex<HashMap<String, Arc<Semaphore>>>,
}

impl HostLimiter {
    fn new(permits: usize) -> Self {
        Self {
            permits,
            hosts: Mutex::new(HashMap::new()),
        }
    }

    /// Waits for a slot on the URL's host. URLs without a parsable host are
    /// not limited.
    async fn acquire(&self, url: &str) -> Option<OwnedSemaphorePermit> {
        let host = Url::parse(url)
            .ok()
            .and_then(|parsed| parsed.host_str().map(str::to_owned))?;
        let semaphore = {
            let mut hosts = self.hosts.lock().await;
            Arc::clone(
                hosts
                    .entry(host)
                    .or_insert_with(|| Arc::new(Semaphore::new(self.permits))),
            )
        };
        semaphore.acquire_owned().await.ok()
    }
}

/// A constructed client bound to its target URL and resolved credentials.
pub struct HttpConnection {
    client: Client,
    auth: Option<HeaderValue>,
    target_url: String,
    host_limits: Option<HostLimiter>,
}

impl HttpConnection {
    pub(crate) fn new(
        client: Client,
        auth: Option<HeaderValue>,
        target_url: String,
        max_requests_per_host: i64,
    ) -> Self {
        let host_limits = usize::try_from(max_requests_per_host)
            .ok()
            .filter(|&permits| permits > 0)
            .map(HostLimiter::new);
        Self {
            client,
            auth,
            target_url,
            host_limits,
        }
    }

    /// The configured target URL, for callers probing the endpoint itself.
    #[must_use]
    pub fn target_url(&self) -> &str {
        &self.target_url
    }

    /// `GET url`. Returns `None` on transport failure.
    pub async fn get(&self, url: &str, headers: Option<&HeaderMap>) -> Option<HttpResponse> {
        let request = self.client.get(url);
        self.execute("GET", url, request, headers, None).await
    }

    /// `POST url` with a JSON body unless the caller overrides the content
    /// type. Returns `None` on transport failure.
    pub async fn post(
        &self,
        url: &str,
        headers: Option<&HeaderMap>,
        body: String,
    ) -> Option<HttpResponse> {
        let request = self
            .client
            .post(url)
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .body(body);
        self.execute("POST", url, request, headers, None).await
    }

    /// `POST url` with form-encoded fields and an optional `Cookie` header.
    /// Returns `None` on transport failure.
    pub async fn form_post(
        &self,
        url: &str,
        fields: &[(String, String)],
        cookie: Option<&str>,
    ) -> Option<HttpResponse> {
        let request = self.client.post(url).form(fields);
        self.execute("POST", url, request, None, cookie).await
    }

    async fn execute(
        &self,
        method: &str,
        url: &str,
        request: reqwest::RequestBuilder,
        headers: Option<&HeaderMap>,
        cookie: Option<&str>,
    ) -> Option<HttpResponse> {
        let _permit = match &self.host_limits {
            Some(limiter) => limiter.acquire(url).await,
            None => None,
        };

        let mut extra = headers.cloned().unwrap_or_default();
        if let Some(cookie) = cookie {
            match HeaderValue::from_str(cookie) {
                Ok(value) => {
                    extra.insert(COOKIE, value);
                }
                Err(err) => {
                    warn!(url = %url, "invalid cookie header value: {err}");
                    return None;
                }
            }
        }
        // resolved credentials win over caller-supplied Authorization
        if let Some(auth) = &self.auth {
            extra.insert(AUTHORIZATION, auth.clone());
        }
        let request = if extra.is_empty() {
            request
        } else {
            request.headers(extra)
        };

        match request.send().await {
            Ok(response) => {
                let status = response.status();
                let headers = response.headers().clone();
                match response.text().await {
                    Ok(body) => {
                        debug!(method, url = %url, status = %status, "request completed");
                        Some(HttpResponse {
                            status,
                            headers,
                            body,
                        })
                    }
                    Err(err) => {
                        warn!(method, url = %url, "failed to read response body: {err}");
                        None
                    }
                }
            }
            Err(err) => {
                warn!(method, url = %url, "request failed: {err}");
                None
            }
        }
    }
}

impl fmt::Debug for HttpConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpConnection")
            .field("target_url", &self.target_url)
            .field("authenticated", &self.auth.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    #[test]
    fn test_response_success_flag() {
        let ok = HttpResponse {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: String::new(),
        };
        assert!(ok.is_success());

        let failed = HttpResponse {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            ..ok
        };
        assert!(!failed.is_success());
    }

    #[tokio::test]
    async fn test_host_limiter_caps_in_flight_requests_per_host() {
        let limiter = HostLimiter::new(1);
        let permit = limiter.acquire("https://api.test/one").await;
        assert!(permit.is_some());

        let blocked = timeout(
            Duration::from_millis(20),
            limiter.acquire("https://api.test/two"),
        )
        .await;
        assert!(blocked.is_err(), "second request should wait for a slot");

        drop(permit);
        let unblocked = timeout(
            Duration::from_millis(200),
            limiter.acquire("https://api.test/three"),
        )
        .await;
        assert!(unblocked.is_ok());
    }

    #[tokio::test]
    async fn test_host_limiter_scopes_slots_by_host() {
        let limiter = HostLimiter::new(1);
        let first = limiter.acquire("https://one.test/").await;
        assert!(first.is_some());

        let other_host = timeout(
            Duration::from_millis(200),
            limiter.acquire("https://two.test/"),
        )
        .await;
        assert!(other_host.is_ok(), "different host must not be limited");
    }

    #[tokio::test]
    async fn test_host_limiter_skips_unparsable_urls() {
        let limiter = HostLimiter::new(1);
        assert!(limiter.acquire("not a url").await.is_none());
    }

    #[test]
    fn test_connection_exposes_target_url_and_redacts_auth() {
        let connection = HttpConnection::new(
            Client::new(),
            Some(HeaderValue::from_static("Basic ****")),
            "https://cluster.test:9090".to_string(),
            0,
        );
        assert_eq!(connection.target_url(), "https://cluster.test:9090");
        let rendered = format!("{connection:?}");
        assert!(rendered.contains("authenticated: true"));
        assert!(!rendered.contains("Basic"));
    }
}
