//! Host events exchanged between the scan and its modules
//!
//! Every event carries:
//! - A type tag the modules subscribe to
//! - A payload string
//! - The identifier of the module that produced it
//! - A reference to the parent event and the URL it was found on

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use uuid::Uuid;

/// Module identifier used for events submitted by the user
pub const ROOT_MODULE: &str = "root";

/// Event type tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    /// Bare domain name (onion-scoped crawl when it ends in .onion)
    DomainName,
    /// Full URL (general crawl)
    Url,
    /// Onion site announced for link discovery
    TorOnionSite,
    /// Newly discovered .onion link
    TorOnionUrl,
    /// Keyword hit on a fetched page
    LeakedData,
    /// Keyword hit on a page that looks like a forum
    DarknetMentionContent,
    /// Full body of a fetched page
    RawData,
}

impl EventType {
    /// Wire name of the event type
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::DomainName => "DOMAIN_NAME",
            EventType::Url => "URL",
            EventType::TorOnionSite => "TOR_ONION_SITE",
            EventType::TorOnionUrl => "TOR_ONION_URL",
            EventType::LeakedData => "LEAKED_DATA",
            EventType::DarknetMentionContent => "DARKNET_MENTION_CONTENT",
            EventType::RawData => "RAW_DATA",
        }
    }

    /// Parse a wire name, ignoring case
    pub fn parse(name: &str) -> Option<Self> {
        let upper = name.trim().to_ascii_uppercase();
        [
            EventType::DomainName,
            EventType::Url,
            EventType::TorOnionSite,
            EventType::TorOnionUrl,
            EventType::LeakedData,
            EventType::DarknetMentionContent,
            EventType::RawData,
        ]
        .into_iter()
        .find(|t| t.as_str() == upper)
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An event on the host bus
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostEvent {
    /// Unique event instance ID
    pub id: Uuid,

    /// Content hash (type + payload + module) for deduplication
    pub hash: String,

    /// Event type tag
    pub event_type: EventType,

    /// Payload
    pub data: String,

    /// Producing module identifier
    pub module: String,

    /// Hash of the event that triggered this one
    pub parent_hash: Option<String>,

    /// URL the finding was made on
    pub source_url: Option<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl HostEvent {
    /// Create a new event builder
    pub fn builder(event_type: EventType, data: impl Into<String>) -> EventBuilder {
        EventBuilder::new(event_type, data.into())
    }

    /// A user-submitted event with no parent
    pub fn root(event_type: EventType, data: impl Into<String>) -> Self {
        Self::builder(event_type, data).module(ROOT_MODULE).build()
    }

    fn compute_hash(event_type: EventType, data: &str, module: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(event_type.as_str().as_bytes());
        hasher.update([0u8]);
        hasher.update(data.as_bytes());
        hasher.update([0u8]);
        hasher.update(module.as_bytes());
        format!("{:x}", hasher.finalize())[..16].to_string()
    }
}

/// Builder for host events
pub struct EventBuilder {
    event_type: EventType,
    data: String,
    module: String,
    parent_hash: Option<String>,
    source_url: Option<String>,
}

impl EventBuilder {
    pub fn new(event_type: EventType, data: String) -> Self {
        Self {
            event_type,
            data,
            module: String::new(),
            parent_hash: None,
            source_url: None,
        }
    }

    pub fn module(mut self, module: &str) -> Self {
        self.module = module.to_string();
        self
    }

    pub fn parent(mut self, parent: &HostEvent) -> Self {
        self.parent_hash = Some(parent.hash.clone());
        self
    }

    pub fn source_url(mut self, url: &str) -> Self {
        self.source_url = Some(url.to_string());
        self
    }

    pub fn build(self) -> HostEvent {
        let hash = HostEvent::compute_hash(self.event_type, &self.data, &self.module);

        HostEvent {
            id: Uuid::new_v4(),
            hash,
            event_type: self.event_type,
            data: self.data,
            module: self.module,
            parent_hash: self.parent_hash,
            source_url: self.source_url,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_creation() {
        let root = HostEvent::root(EventType::DomainName, "abc123.onion");
        let event = HostEvent::builder(EventType::TorOnionUrl, "http://def456.onion/")
            .module("leak_hunter")
            .parent(&root)
            .source_url("http://abc123.onion/")
            .build();

        assert_eq!(root.module, ROOT_MODULE);
        assert_eq!(event.parent_hash.as_deref(), Some(root.hash.as_str()));
        assert_eq!(event.source_url.as_deref(), Some("http://abc123.onion/"));
        assert_eq!(event.hash.len(), 16);
    }

    #[test]
    fn test_hash_ignores_parent() {
        let a = HostEvent::builder(EventType::TorOnionUrl, "http://x.onion/")
            .module("spider")
            .source_url("http://a.onion/")
            .build();
        let b = HostEvent::builder(EventType::TorOnionUrl, "http://x.onion/")
            .module("spider")
            .source_url("http://b.onion/")
            .build();
        let c = HostEvent::builder(EventType::TorOnionUrl, "http://x.onion/")
            .module("other")
            .build();

        assert_eq!(a.hash, b.hash);
        assert_ne!(a.hash, c.hash);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_event_type_names() {
        assert_eq!(EventType::parse("leaked_data"), Some(EventType::LeakedData));
        assert_eq!(EventType::parse("TOR_ONION_SITE"), Some(EventType::TorOnionSite));
        assert_eq!(EventType::parse("IP_ADDRESS"), None);
        assert_eq!(EventType::DarknetMentionContent.to_string(), "DARKNET_MENTION_CONTENT");

        let json = serde_json::to_string(&EventType::RawData).unwrap();
        assert_eq!(json, "\"RAW_DATA\"");
    }
}
