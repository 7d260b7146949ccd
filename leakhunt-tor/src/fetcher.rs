//! Page fetchers for hidden services
//!
//! A [`Fetcher`] turns a URL into a [`FetchResult`]. Failures never escape as
//! errors: they come back as a result with no body and a description, so a
//! crawl can log them and move on.

use async_trait::async_trait;
use reqwest::Client;
use std::fmt;
use tracing::{debug, warn};

use crate::{create_tor_client, TorConfig, TorError};

/// Available fetch backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetcherKind {
    /// Plain HTTP through the SOCKS proxy
    Http,
    /// Headless browser (JavaScript-driven pages)
    HeadlessBrowser,
    /// External rendering service
    RenderingProxy,
}

impl fmt::Display for FetcherKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetcherKind::Http => f.write_str("http"),
            FetcherKind::HeadlessBrowser => f.write_str("headless-browser"),
            FetcherKind::RenderingProxy => f.write_str("rendering-proxy"),
        }
    }
}

/// Outcome of one fetch attempt
#[derive(Debug, Clone)]
pub struct FetchResult {
    /// Requested URL
    pub url: String,
    /// URL after redirects, when a response arrived
    pub final_url: Option<String>,
    /// HTTP status, when a response arrived
    pub status: Option<u16>,
    /// Body text; `None` on any failure
    pub body: Option<String>,
    /// Failure description
    pub error: Option<String>,
}

impl FetchResult {
    pub fn success(url: &str, final_url: String, status: u16, body: String) -> Self {
        Self {
            url: url.to_string(),
            final_url: Some(final_url),
            status: Some(status),
            body: Some(body),
            error: None,
        }
    }

    pub fn failure(url: &str, status: Option<u16>, error: &TorError) -> Self {
        Self {
            url: url.to_string(),
            final_url: None,
            status,
            body: None,
            error: Some(error.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.body.is_some()
    }
}

/// A way of retrieving pages
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Backend identifier
    fn kind(&self) -> FetcherKind;

    /// Fetch a URL; never fails, see [`FetchResult::error`]
    async fn fetch(&self, url: &str) -> FetchResult;
}

/// HTTP fetcher routed through the Tor SOCKS proxy
pub struct HttpFetcher {
    client: Client,
    timeout_secs: u64,
}

impl HttpFetcher {
    /// Build a fetcher with its own client, proxy and cookie store
    pub fn new(config: &TorConfig) -> Result<Self, TorError> {
        Ok(Self {
            client: create_tor_client(config)?,
            timeout_secs: config.timeout_secs,
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    fn kind(&self) -> FetcherKind {
        FetcherKind::Http
    }

    async fn fetch(&self, url: &str) -> FetchResult {
        debug!("Fetching: {}", url);

        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                let status = e.status().map(|s| s.as_u16());
                let error = if e.is_timeout() {
                    TorError::Timeout(self.timeout_secs)
                } else {
                    TorError::Request(e)
                };
                debug!("Request to {} failed: {}", url, error);
                return FetchResult::failure(url, status, &error);
            }
        };

        let status = response.status();
        let final_url = response.url().to_string();

        if !status.is_success() {
            debug!("Fetch of {} returned status: {}", url, status);
            return FetchResult::failure(url, Some(status.as_u16()), &TorError::Status(status.as_u16()));
        }

        match response.text().await {
            Ok(body) => FetchResult::success(url, final_url, status.as_u16(), body),
            Err(e) => {
                let error = TorError::Request(e);
                warn!("Reading body of {} failed: {}", url, error);
                FetchResult::failure(url, Some(status.as_u16()), &error)
            }
        }
    }
}

/// Headless-browser backend. Interface only: no browser is driven.
pub struct HeadlessBrowserFetcher;

#[async_trait]
impl Fetcher for HeadlessBrowserFetcher {
    fn kind(&self) -> FetcherKind {
        FetcherKind::HeadlessBrowser
    }

    async fn fetch(&self, url: &str) -> FetchResult {
        let error = TorError::Unsupported("headless browser rendering".to_string());
        warn!("Cannot fetch {}: {}", url, error);
        FetchResult::failure(url, None, &error)
    }
}

/// Rendering-service backend. Interface only: the endpoint is never called.
pub struct RenderingProxyFetcher {
    endpoint: String,
}

impl RenderingProxyFetcher {
    pub fn new(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
        }
    }
}

#[async_trait]
impl Fetcher for RenderingProxyFetcher {
    fn kind(&self) -> FetcherKind {
        FetcherKind::RenderingProxy
    }

    async fn fetch(&self, url: &str) -> FetchResult {
        let error = TorError::Unsupported(format!("rendering proxy at {}", self.endpoint));
        warn!("Cannot fetch {}: {}", url, error);
        FetchResult::failure(url, None, &error)
    }
}

/// Construct a fetcher of the given kind
pub fn create_fetcher(kind: FetcherKind, config: &TorConfig) -> Result<Box<dyn Fetcher>, TorError> {
    match kind {
        FetcherKind::Http => Ok(Box::new(HttpFetcher::new(config)?)),
        FetcherKind::HeadlessBrowser => Ok(Box::new(HeadlessBrowserFetcher)),
        FetcherKind::RenderingProxy => Ok(Box::new(RenderingProxyFetcher::new(&config.socks_addr))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};
    use std::time::Duration;

    /// Proxy configured, but the local mock server is reached directly
    fn local_config() -> TorConfig {
        TorConfig {
            timeout_secs: 5,
            user_agent: Some("leakhunt-test".to_string()),
            no_proxy: Some("127.0.0.1,localhost".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_fetch_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/index"))
            .and(header("user-agent", "leakhunt-test"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<p>hello</p>"))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(&local_config()).unwrap();
        let result = fetcher.fetch(&format!("{}/index", server.uri())).await;

        assert!(result.is_success());
        assert_eq!(result.status, Some(200));
        assert_eq!(result.body.as_deref(), Some("<p>hello</p>"));
        assert!(result.error.is_none());
    }

    #[tokio::test]
    async fn test_fetch_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/broken"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(&local_config()).unwrap();
        let result = fetcher.fetch(&format!("{}/broken", server.uri())).await;

        assert!(!result.is_success());
        assert_eq!(result.status, Some(500));
        assert!(result.error.unwrap().contains("500"));
    }

    #[tokio::test]
    async fn test_fetch_timeout_is_a_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/slow"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("<p>late</p>")
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let config = TorConfig {
            timeout_secs: 1,
            ..local_config()
        };
        let fetcher = HttpFetcher::new(&config).unwrap();
        let result = fetcher.fetch(&format!("{}/slow", server.uri())).await;

        assert!(!result.is_success());
        assert!(result.body.is_none());
        assert!(result.error.unwrap().contains("Timeout after 1 seconds"));
    }

    #[tokio::test]
    async fn test_redirect_keeps_cookies() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/login"))
            .respond_with(
                ResponseTemplate::new(302)
                    .insert_header("Location", "/home")
                    .insert_header("Set-Cookie", "session=abc; Path=/"),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/home"))
            .and(header("cookie", "session=abc"))
            .respond_with(ResponseTemplate::new(200).set_body_string("welcome back"))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(&local_config()).unwrap();
        let result = fetcher.fetch(&format!("{}/login", server.uri())).await;

        assert_eq!(result.body.as_deref(), Some("welcome back"));
        assert!(result.final_url.unwrap().ends_with("/home"));
    }

    #[tokio::test]
    async fn test_redirect_loop_is_bounded() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/loop"))
            .respond_with(ResponseTemplate::new(302).insert_header("Location", "/loop"))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(&local_config()).unwrap();
        let result = fetcher.fetch(&format!("{}/loop", server.uri())).await;

        assert!(!result.is_success());
        assert!(result.error.is_some());
    }

    #[tokio::test]
    async fn test_unreachable_proxy_is_a_failed_result() {
        let config = TorConfig {
            socks_addr: "socks5h://127.0.0.1:1".to_string(),
            timeout_secs: 5,
            ..Default::default()
        };

        let fetcher = HttpFetcher::new(&config).unwrap();
        let result = fetcher.fetch("http://abc123.onion/").await;

        assert!(result.body.is_none());
        assert!(result.status.is_none());
        assert!(result.error.is_some());
    }

    #[tokio::test]
    async fn test_stub_fetchers() {
        let config = TorConfig::default();

        for kind in [FetcherKind::HeadlessBrowser, FetcherKind::RenderingProxy] {
            let fetcher = create_fetcher(kind, &config).unwrap();
            assert_eq!(fetcher.kind(), kind);

            let result = fetcher.fetch("http://abc123.onion/").await;
            assert!(!result.is_success());
            assert!(result.error.unwrap().contains("not available"));
        }

        let http = create_fetcher(FetcherKind::Http, &config).unwrap();
        assert_eq!(http.kind(), FetcherKind::Http);
    }
}
