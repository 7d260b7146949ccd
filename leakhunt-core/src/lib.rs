//! Leakhunt Core - event model and configuration for Tor leak hunting
//!
//! This crate provides the primitives shared by every module:
//! - Host events and the bus they are emitted onto
//! - The cooperative stop flag polled by long-running crawls
//! - Crawl options, validated into an immutable [`CrawlConfig`]
//! - URL normalization used for visited-state tracking

pub mod bus;
pub mod config;
pub mod error;
pub mod events;
pub mod normalize;
pub mod stop;

pub use bus::*;
pub use config::*;
pub use error::*;
pub use events::*;
pub use normalize::*;
pub use stop::*;

/// Sentinel returned when no snippet could be located for a match
pub const NO_SNIPPET: &str = "No snippet available";

/// Default SOCKS proxy (local Tor daemon)
pub const DEFAULT_PROXY: &str = "socks5h://127.0.0.1:9050";

/// Default redirect hop limit
pub const DEFAULT_MAX_REDIRECTS: usize = 5;

/// Default pause before non-forum requests past the seed
pub const DEFAULT_POLITENESS_DELAY_MS: u64 = 3000;
