#![allow(dead_code, clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use promlink::{ConnectionConfig, tls::ensure_crypto_provider};
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use std::{
    net::SocketAddr,
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpListener,
    sync::Mutex,
    task::JoinHandle,
};
use tokio_rustls::TlsAcceptor;

pub fn fixture_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

pub fn fixture(name: &str) -> String {
    std::fs::read_to_string(fixture_path(name)).expect("fixture should be readable")
}

pub fn base_config(url: &str) -> ConnectionConfig {
    ConnectionConfig {
        master_url: url.to_string(),
        cluster_id: "test-cluster".to_string(),
        ..ConnectionConfig::default()
    }
}

/// One observed HTTP exchange: request line, headers, body.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub request_line: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl CapturedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Minimal in-process HTTPS endpoint: a rustls acceptor plus a hand-rolled
/// HTTP/1.1 responder that records every request it serves.
pub struct TestTlsServer {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<CapturedRequest>>>,
    handle: JoinHandle<()>,
}

impl TestTlsServer {
    /// Serve `cert_file`/`key_file` from `tests/fixtures`. When `client_ca`
    /// is given, a verified client certificate is required.
    pub async fn start(cert_file: &str, key_file: &str, client_ca: Option<&str>) -> Self {
        ensure_crypto_provider();

        let certs = load_certs(&fixture_path(cert_file));
        let key = load_key(&fixture_path(key_file));

        let builder = rustls::ServerConfig::builder();
        let config = match client_ca {
            Some(ca_file) => {
                let mut roots = rustls::RootCertStore::empty();
                for cert in load_certs(&fixture_path(ca_file)) {
                    roots.add(cert).unwrap();
                }
                let verifier = rustls::server::WebPkiClientVerifier::builder(Arc::new(roots))
                    .build()
                    .expect("client verifier should build");
                builder
                    .with_client_cert_verifier(verifier)
                    .with_single_cert(certs, key)
                    .expect("server TLS config should build")
            }
            None => builder
                .with_no_client_auth()
                .with_single_cert(certs, key)
                .expect("server TLS config should build"),
        };

        let acceptor = TlsAcceptor::from(Arc::new(config));
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind random local port");
        let addr = listener.local_addr().expect("failed to read local addr");
        let requests = Arc::new(Mutex::new(Vec::new()));

        let seen = Arc::clone(&requests);
        let handle = tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let acceptor = acceptor.clone();
                let seen = Arc::clone(&seen);
                tokio::spawn(async move {
                    if let Ok(mut tls) = acceptor.accept(stream).await
                        && let Some(request) = read_http_request(&mut tls).await
                    {
                        // the /missing path answers 404 so tests can observe
                        // completed-but-unsuccessful exchanges
                        let response = if request.request_line.contains(" /missing") {
                            concat!(
                                "HTTP/1.1 404 Not Found\r\n",
                                "content-type: text/plain\r\n",
                                "content-length: 9\r\n",
                                "connection: close\r\n",
                                "\r\n",
                                "not found",
                            )
                        } else {
                            concat!(
                                "HTTP/1.1 200 OK\r\n",
                                "content-type: text/plain\r\n",
                                "set-cookie: session=abc123\r\n",
                                "content-length: 2\r\n",
                                "connection: close\r\n",
                                "\r\n",
                                "ok",
                            )
                        };
                        let _ = tls.write_all(response.as_bytes()).await;
                        let _ = tls.shutdown().await;
                        seen.lock().await.push(request);
                    }
                });
            }
        });

        Self {
            addr,
            requests,
            handle,
        }
    }

    pub fn url(&self) -> String {
        format!("https://localhost:{}/", self.addr.port())
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub async fn requests(&self) -> Vec<CapturedRequest> {
        self.requests.lock().await.clone()
    }

    pub async fn last_request(&self) -> Option<CapturedRequest> {
        self.requests.lock().await.last().cloned()
    }
}

impl Drop for TestTlsServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn load_certs(path: &Path) -> Vec<CertificateDer<'static>> {
    let data = std::fs::read(path).expect("certificate fixture should be readable");
    rustls_pemfile::certs(&mut data.as_slice())
        .collect::<Result<_, _>>()
        .expect("certificate fixture should be valid PEM")
}

fn load_key(path: &Path) -> PrivateKeyDer<'static> {
    let data = std::fs::read(path).expect("key fixture should be readable");
    rustls_pemfile::private_key(&mut data.as_slice())
        .expect("key fixture should be valid PEM")
        .expect("key fixture should contain a key")
}

async fn read_http_request<S: AsyncReadExt + Unpin>(stream: &mut S) -> Option<CapturedRequest> {
    let mut buffer = Vec::new();
    let mut chunk = [0_u8; 1024];
    let header_end = loop {
        if let Some(position) = find_header_end(&buffer) {
            break position;
        }
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buffer.extend_from_slice(chunk.get(..n)?);
    };

    let head = String::from_utf8_lossy(buffer.get(..header_end)?).to_string();
    let mut lines = head.lines();
    let request_line = lines.next()?.to_string();
    let headers: Vec<(String, String)> = lines
        .filter_map(|line| {
            line.split_once(':')
                .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
        })
        .collect();

    let content_length = headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.parse::<usize>().ok())
        .unwrap_or(0);

    let mut body: Vec<u8> = buffer.get(header_end + 4..)?.to_vec();
    while body.len() < content_length {
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(chunk.get(..n)?);
    }
    body.truncate(content_length);

    Some(CapturedRequest {
        request_line,
        headers,
        body: String::from_utf8_lossy(&body).to_string(),
    })
}

fn find_header_end(buffer: &[u8]) -> Option<usize> {
    buffer.windows(4).position(|window| window == b"\r\n\r\n")
}
