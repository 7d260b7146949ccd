//! Forum detection
//!
//! A heuristic: a URL pattern hit or a board-style phrase in the page text
//! is enough. False positives are acceptable.

use regex::Regex;

use leakhunt_core::CrawlConfig;

/// Phrases typical of discussion-board pages
pub const FORUM_INDICATORS: &[&str] = &[
    "forum",
    "board",
    "thread",
    "topic",
    "posts:",
    "members:",
    "last post",
    "reply",
    "new topic",
    "page 1 of",
];

/// Classifies pages and links as forum content
#[derive(Debug, Clone)]
pub struct ForumClassifier {
    patterns: Vec<Regex>,
}

impl ForumClassifier {
    /// Patterns are expected to be compiled case-insensitive
    pub fn new(patterns: Vec<Regex>) -> Self {
        Self { patterns }
    }

    pub fn from_config(config: &CrawlConfig) -> Self {
        Self::new(config.forum_url_patterns.clone())
    }

    /// Whether the URL matches a forum pattern
    pub fn is_forum_url(&self, url: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(url))
    }

    /// Whether the page looks like part of a forum
    pub fn is_forum_page(&self, url: &str, text: &str) -> bool {
        if self.is_forum_url(url) {
            return true;
        }

        let text = text.to_lowercase();
        FORUM_INDICATORS.iter().any(|indicator| text.contains(indicator))
    }
}
