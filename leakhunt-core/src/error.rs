//! Configuration errors

use thiserror::Error;

/// Errors detected while building a crawl configuration or starting a session.
/// Any of these disables crawling for the session; none of them is fatal to the scan.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid proxy address {0:?} - use socks5h://host:port")]
    InvalidProxy(String),

    #[error("Proxy {address} unreachable: {reason}")]
    ProxyUnreachable { address: String, reason: String },

    #[error("Invalid value for {option}: {reason}")]
    InvalidOption { option: String, reason: String },

    #[error("Unknown option: {0}")]
    UnknownOption(String),

    #[error("Invalid forum pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("Invalid seed {0:?}")]
    InvalidSeed(String),

    #[error("Failed to read options file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse options file: {0}")]
    Toml(#[from] toml::de::Error),
}
