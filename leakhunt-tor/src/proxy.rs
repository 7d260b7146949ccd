//! Tor SOCKS5h proxy client
//!
//! Creates HTTP clients that route through Tor for .onion access. The proxy
//! is set on each client; process-wide networking is never touched.

use reqwest::{redirect::Policy, Client, NoProxy, Proxy};
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpStream;
use tracing::debug;

use leakhunt_core::{validate_proxy_address, CrawlConfig, DEFAULT_MAX_REDIRECTS, DEFAULT_PROXY};

/// Timeout of the proxy reachability probe
const PROXY_PROBE_TIMEOUT_SECS: u64 = 5;

/// Tor proxy configuration
#[derive(Debug, Clone)]
pub struct TorConfig {
    /// SOCKS5 proxy address (default: socks5h://127.0.0.1:9050)
    pub socks_addr: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Maximum redirect hops per request
    pub max_redirects: usize,
    /// Verify TLS certificates
    pub verify_tls: bool,
    /// Fixed User-Agent; `None` picks one at random per client
    pub user_agent: Option<String>,
    /// Hosts reached directly instead of through the proxy (NO_PROXY syntax)
    pub no_proxy: Option<String>,
}

impl Default for TorConfig {
    fn default() -> Self {
        Self {
            socks_addr: DEFAULT_PROXY.to_string(),
            timeout_secs: 45,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            verify_tls: false,
            user_agent: None,
            no_proxy: None,
        }
    }
}

impl TorConfig {
    /// Networking settings of a crawl session
    pub fn from_crawl_config(config: &CrawlConfig) -> Self {
        Self {
            socks_addr: config.proxy_address.clone(),
            timeout_secs: config.timeout_seconds,
            max_redirects: config.max_redirects,
            verify_tls: config.verify_tls,
            user_agent: config.user_agent.clone(),
            no_proxy: None,
        }
    }
}

/// Errors from Tor networking
#[derive(Debug, Error)]
pub enum TorError {
    #[error("Failed to build Tor client: {0}")]
    ClientBuild(String),

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Timeout after {0} seconds")]
    Timeout(u64),

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("Invalid proxy address: {0}")]
    InvalidProxy(String),

    #[error("Proxy {address} unreachable: {reason}")]
    ProxyUnreachable { address: String, reason: String },

    #[error("Fetcher not available: {0}")]
    Unsupported(String),
}

/// User agents for rotation
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; rv:91.0) Gecko/20100101 Firefox/91.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:128.0) Gecko/20100101 Firefox/128.0",
    "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14.7; rv:128.0) Gecko/20100101 Firefox/128.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/135.0.0.0 Safari/537.36",
];

/// Get a random user agent
pub fn random_user_agent() -> &'static str {
    use rand::Rng;
    let idx = rand::thread_rng().gen_range(0..USER_AGENTS.len());
    USER_AGENTS[idx]
}

/// Create a Tor-enabled HTTP client.
///
/// Redirects are followed up to `max_redirects` hops and cookies set along
/// the way are kept for the lifetime of the client.
pub fn create_tor_client(config: &TorConfig) -> Result<Client, TorError> {
    validate_proxy_address(&config.socks_addr)
        .map_err(|_| TorError::InvalidProxy(config.socks_addr.clone()))?;

    let mut proxy = Proxy::all(&config.socks_addr)
        .map_err(|e| TorError::ClientBuild(e.to_string()))?;
    if let Some(hosts) = &config.no_proxy {
        proxy = proxy.no_proxy(NoProxy::from_string(hosts));
    }

    let user_agent = config
        .user_agent
        .clone()
        .unwrap_or_else(|| random_user_agent().to_string());

    Client::builder()
        .proxy(proxy)
        .timeout(Duration::from_secs(config.timeout_secs))
        .user_agent(user_agent)
        .redirect(Policy::limited(config.max_redirects))
        .cookie_store(true)
        .danger_accept_invalid_certs(!config.verify_tls) // Many .onion sites have self-signed certs
        .build()
        .map_err(|e| TorError::ClientBuild(e.to_string()))
}

/// Host and port of a socks5(h)://host:port address
pub fn proxy_endpoint(address: &str) -> Option<(String, u16)> {
    let parsed = url::Url::parse(address).ok()?;
    let host = parsed.host_str()?.to_string();
    let port = parsed.port()?;
    Some((host, port))
}

/// Check the proxy accepts TCP connections
pub async fn check_proxy_reachable(address: &str) -> Result<(), TorError> {
    validate_proxy_address(address).map_err(|_| TorError::InvalidProxy(address.to_string()))?;
    let (host, port) =
        proxy_endpoint(address).ok_or_else(|| TorError::InvalidProxy(address.to_string()))?;

    let unreachable = |reason: String| TorError::ProxyUnreachable {
        address: address.to_string(),
        reason,
    };

    let connect = TcpStream::connect((host.as_str(), port));
    match tokio::time::timeout(Duration::from_secs(PROXY_PROBE_TIMEOUT_SECS), connect).await {
        Ok(Ok(_stream)) => {
            debug!("Proxy {} accepted a connection", address);
            Ok(())
        }
        Ok(Err(e)) => Err(unreachable(e.to_string())),
        Err(_) => Err(unreachable(format!(
            "no answer within {} seconds",
            PROXY_PROBE_TIMEOUT_SECS
        ))),
    }
}

/// Check if Tor proxy can reach a hidden service
pub async fn check_tor_connection(config: &TorConfig) -> Result<bool, TorError> {
    let client = create_tor_client(config)?;

    // Try to reach a known .onion address (Tor Project's)
    let result = client
        .get("http://2gzyxa5ihm7nsggfxnu52rck2vv4rvmdlkiu3ber7fzs2xqxczfebsid.onion/")
        .send()
        .await;

    match result {
        Ok(resp) => Ok(resp.status().is_success() || resp.status().is_redirection()),
        Err(_) => Ok(false),
    }
}
