//! Leak Hunter Module
//!
//! Crawls onion sites for configured keywords.
//! - Watches: DOMAIN_NAME (.onion only), URL
//! - Emits: LEAKED_DATA, DARKNET_MENTION_CONTENT, RAW_DATA, TOR_ONION_URL

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use leakhunt_core::{CrawlOptions, EventBus, EventType, HostEvent, StopFlag};
use leakhunt_tor::Fetcher;

use crate::{CrawlReport, ModuleError, OsintModule, SessionRunner};

/// Default module identifier
pub const LEAK_HUNTER_ID: &str = "leak_hunter";

const WATCHED: &[EventType] = &[EventType::DomainName, EventType::Url];

const PRODUCED: &[EventType] = &[
    EventType::LeakedData,
    EventType::DarknetMentionContent,
    EventType::RawData,
    EventType::TorOnionUrl,
];

/// Keyword hunting crawler
pub struct LeakHunter {
    id: String,
    runner: SessionRunner,
}

impl LeakHunter {
    pub fn new(options: &CrawlOptions) -> Self {
        Self {
            id: LEAK_HUNTER_ID.to_string(),
            runner: SessionRunner::new(options),
        }
    }

    /// Crawl through `fetcher` instead of the Tor proxy
    pub fn with_fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.runner = self.runner.with_fetcher(fetcher);
        self
    }

    pub fn reports(&self) -> &[CrawlReport] {
        self.runner.reports()
    }
}

#[async_trait]
impl OsintModule for LeakHunter {
    fn id(&self) -> &str {
        &self.id
    }

    fn watched_events(&self) -> &[EventType] {
        WATCHED
    }

    fn produced_events(&self) -> &[EventType] {
        PRODUCED
    }

    async fn handle_event(
        &mut self,
        event: &HostEvent,
        bus: &mut EventBus,
        stop: &StopFlag,
    ) -> Result<Vec<String>, ModuleError> {
        match event.event_type {
            EventType::DomainName => {
                let domain = event.data.trim().trim_end_matches('/').to_lowercase();
                if !domain.ends_with(".onion") {
                    debug!("Leak hunter ignoring non-onion domain {}", domain);
                    return Ok(Vec::new());
                }
                info!("Leak hunter received onion domain {}", domain);
                Ok(self.runner.crawl(&self.id, &domain, event, bus, stop).await)
            }
            EventType::Url => {
                info!("Leak hunter received URL {}", event.data);
                Ok(self.runner.crawl(&self.id, &event.data, event, bus, stop).await)
            }
            _ => Ok(Vec::new()),
        }
    }
}
