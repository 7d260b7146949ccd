//! Leakhunt Tor Layer
//!
//! Provides Tor-based networking for hidden-service crawling:
//! - SOCKS5h proxy client (DNS resolution via Tor), configured per instance
//! - Proxy address validation and reachability probe
//! - Page fetchers behind a common [`Fetcher`] capability

pub mod fetcher;
pub mod proxy;

pub use fetcher::*;
pub use proxy::*;
