//! Leakhunt Modules
//!
//! The onion crawler and the host modules built on it:
//! - **Frontier**: visited tracking, depth and page budgets
//! - **Extractor**: in-scope link discovery
//! - **Classifier**: forum detection
//! - **Matcher**: keyword hits and snippets
//! - **Session**: the crawl loop tying them together
//! - **LeakHunter**: keyword hunting on onion domains and URLs
//! - **LinkSpider**: onion link discovery

pub mod classifier;
pub mod extractor;
pub mod frontier;
pub mod leak_hunter;
pub mod link_spider;
pub mod matcher;
pub mod runner;
pub mod session;
pub mod text;
pub mod traits;

#[cfg(test)]
pub(crate) mod testing;

pub use classifier::*;
pub use extractor::*;
pub use frontier::*;
pub use leak_hunter::*;
pub use link_spider::*;
pub use matcher::*;
pub use runner::*;
pub use session::*;
pub use text::*;
pub use traits::*;
