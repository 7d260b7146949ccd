//! Crawl configuration
//!
//! Options arrive as loosely typed host settings (a TOML file, `key=value`
//! overrides). [`CrawlOptions::build`] validates them once into an immutable
//! [`CrawlConfig`] that a crawl session holds for its whole lifetime.

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;
use tracing::warn;

use crate::{ConfigError, DEFAULT_MAX_REDIRECTS, DEFAULT_POLITENESS_DELAY_MS, DEFAULT_PROXY};

const DEFAULT_MAX_DEPTH: i64 = 2;
const DEFAULT_MAX_PAGES: i64 = 5;
const DEFAULT_TIMEOUT_SECS: i64 = 90;
const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; rv:91.0) Gecko/20100101 Firefox/91.0";

/// URL patterns that mark discussion boards
pub const DEFAULT_FORUM_PATTERNS: &[&str] = &[
    r"/forum/",
    r"/board/",
    r"/thread",
    r"/topic",
    r"/index\.php\?topic=",
    r"\.php\?board=",
];

static PROXY_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^socks5h?://[a-zA-Z0-9.\-]+:\d+$").unwrap()
});

/// Which discovered links a crawl may follow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScopeMode {
    /// Any http(s) host ending in .onion
    #[default]
    Onion,
    /// Only the host the crawl started on
    SameDomain,
}

impl ScopeMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "onion" => Some(ScopeMode::Onion),
            "same_domain" | "domain" => Some(ScopeMode::SameDomain),
            _ => None,
        }
    }
}

/// Raw crawl options as the host supplies them
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlOptions {
    /// Comma-separated keywords
    pub keywords: String,
    /// SOCKS proxy, socks5h://host:port
    pub proxy_address: String,
    /// Maximum link depth from the seed
    pub max_depth: i64,
    /// Maximum pages fetched per session
    pub max_pages: i64,
    /// HTTP User-Agent; blank picks a browser agent at random
    pub user_agent: String,
    /// Per-request timeout
    pub timeout_seconds: i64,
    /// Verify TLS certificates
    pub verify_tls: bool,
    /// Regular expressions marking forum URLs
    pub forum_url_patterns: Vec<String>,
    /// Link scope
    pub scope: ScopeMode,
    /// Pause before non-forum requests past the seed
    pub politeness_delay_ms: u64,
    /// Emit RAW_DATA with every fetched body
    pub emit_raw_content: bool,
    /// Write fetched bodies to this directory
    pub dump_dir: Option<PathBuf>,
    /// Probe the proxy before crawling
    pub check_proxy: bool,
    /// Redirect hop limit
    pub max_redirects: i64,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self {
            keywords: String::new(),
            proxy_address: DEFAULT_PROXY.to_string(),
            max_depth: DEFAULT_MAX_DEPTH,
            max_pages: DEFAULT_MAX_PAGES,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_seconds: DEFAULT_TIMEOUT_SECS,
            verify_tls: false,
            forum_url_patterns: DEFAULT_FORUM_PATTERNS.iter().map(|p| p.to_string()).collect(),
            scope: ScopeMode::default(),
            politeness_delay_ms: DEFAULT_POLITENESS_DELAY_MS,
            emit_raw_content: false,
            dump_dir: None,
            check_proxy: true,
            max_redirects: DEFAULT_MAX_REDIRECTS as i64,
        }
    }
}

impl CrawlOptions {
    /// Parse options from TOML text; missing keys keep their defaults
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Load options from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Override one option from its string form.
    ///
    /// Numbers that fail to parse fall back to their default with a warning;
    /// range checks happen in [`CrawlOptions::build`].
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let value = value.trim();
        match key.trim() {
            "keywords" | "keyword" => self.keywords = value.to_string(),
            "proxy_address" | "tor_proxy" => self.proxy_address = value.to_string(),
            "max_depth" => self.max_depth = parse_number(key, value, DEFAULT_MAX_DEPTH),
            "max_pages" => self.max_pages = parse_number(key, value, DEFAULT_MAX_PAGES),
            "user_agent" => self.user_agent = value.to_string(),
            "timeout_seconds" | "timeout" => {
                self.timeout_seconds = parse_number(key, value, DEFAULT_TIMEOUT_SECS)
            }
            "verify_tls" | "verify" => self.verify_tls = parse_flag(key, value)?,
            "forum_url_patterns" | "forum_patterns" => {
                self.forum_url_patterns = value
                    .split(',')
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(str::to_string)
                    .collect()
            }
            "scope" => {
                self.scope = ScopeMode::parse(value).ok_or_else(|| ConfigError::InvalidOption {
                    option: key.to_string(),
                    reason: format!("expected onion or same_domain, got {:?}", value),
                })?
            }
            "politeness_delay_ms" => {
                self.politeness_delay_ms =
                    parse_number(key, value, DEFAULT_POLITENESS_DELAY_MS as i64).max(0) as u64
            }
            "emit_raw_content" => self.emit_raw_content = parse_flag(key, value)?,
            "dump_dir" => {
                self.dump_dir = (!value.is_empty()).then(|| PathBuf::from(value));
            }
            "check_proxy" => self.check_proxy = parse_flag(key, value)?,
            "max_redirects" => {
                self.max_redirects = parse_number(key, value, DEFAULT_MAX_REDIRECTS as i64)
            }
            other => return Err(ConfigError::UnknownOption(other.to_string())),
        }
        Ok(())
    }

    /// Validate into an immutable session configuration
    pub fn build(&self) -> Result<CrawlConfig, ConfigError> {
        validate_proxy_address(&self.proxy_address)?;

        let max_depth = u32::try_from(self.max_depth)
            .map_err(|_| invalid("max_depth", "must be between 0 and 4294967295"))?;
        if self.max_pages < 1 {
            return Err(invalid("max_pages", "must be >= 1"));
        }
        if self.timeout_seconds <= 0 {
            return Err(invalid("timeout_seconds", "must be > 0"));
        }
        if self.max_redirects < 0 {
            return Err(invalid("max_redirects", "must be >= 0"));
        }

        let forum_url_patterns = self
            .forum_url_patterns
            .iter()
            .map(|pattern| {
                RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| ConfigError::InvalidPattern {
                        pattern: pattern.clone(),
                        reason: e.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let user_agent = self.user_agent.trim();

        Ok(CrawlConfig {
            keywords: parse_keywords(&self.keywords),
            proxy_address: self.proxy_address.clone(),
            max_depth,
            max_pages: self.max_pages as usize,
            user_agent: (!user_agent.is_empty()).then(|| user_agent.to_string()),
            timeout_seconds: self.timeout_seconds as u64,
            verify_tls: self.verify_tls,
            forum_url_patterns,
            scope: self.scope,
            politeness_delay: Duration::from_millis(self.politeness_delay_ms),
            emit_raw_content: self.emit_raw_content,
            dump_dir: self.dump_dir.clone(),
            check_proxy: self.check_proxy,
            max_redirects: self.max_redirects as usize,
        })
    }
}

/// Validated, immutable configuration of one crawl session
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Lowercased keywords in configured order; empty means crawl only
    pub keywords: Vec<String>,
    pub proxy_address: String,
    pub max_depth: u32,
    pub max_pages: usize,
    /// `None` picks a browser user agent at random
    pub user_agent: Option<String>,
    pub timeout_seconds: u64,
    pub verify_tls: bool,
    /// Case-insensitive forum URL patterns
    pub forum_url_patterns: Vec<Regex>,
    pub scope: ScopeMode,
    pub politeness_delay: Duration,
    pub emit_raw_content: bool,
    pub dump_dir: Option<PathBuf>,
    pub check_proxy: bool,
    pub max_redirects: usize,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        // Default options always validate
        CrawlOptions::default()
            .build()
            .expect("default crawl options are valid")
    }
}

/// Split a comma-separated keyword option into lowercase keywords.
/// Blank entries and repeats are dropped; order is kept.
pub fn parse_keywords(raw: &str) -> Vec<String> {
    let mut keywords: Vec<String> = Vec::new();
    for keyword in raw.split(',').map(|k| k.trim().to_lowercase()) {
        if !keyword.is_empty() && !keywords.contains(&keyword) {
            keywords.push(keyword);
        }
    }
    keywords
}

/// Check a proxy address has the form socks5://host:port or socks5h://host:port
pub fn validate_proxy_address(address: &str) -> Result<(), ConfigError> {
    if PROXY_REGEX.is_match(address) {
        Ok(())
    } else {
        Err(ConfigError::InvalidProxy(address.to_string()))
    }
}

fn invalid(option: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidOption {
        option: option.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_number(key: &str, value: &str, default: i64) -> i64 {
    match value.parse::<i64>() {
        Ok(n) => n,
        Err(_) => {
            warn!("Invalid value for {} ({}). Using default {}.", key, value, default);
            default
        }
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(invalid(key, "expected a boolean")),
    }
}
