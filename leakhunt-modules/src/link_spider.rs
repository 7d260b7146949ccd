//! Link Spider Module
//!
//! Maps onion sites without keyword matching.
//! - Watches: TOR_ONION_SITE, URL
//! - Emits: TOR_ONION_URL

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use leakhunt_core::{CrawlOptions, EventBus, EventType, HostEvent, ScopeMode, StopFlag};
use leakhunt_tor::Fetcher;

use crate::{CrawlReport, ModuleError, OsintModule, SessionRunner};

/// Default module identifier
pub const LINK_SPIDER_ID: &str = "link_spider";

const WATCHED: &[EventType] = &[EventType::TorOnionSite, EventType::Url];

const PRODUCED: &[EventType] = &[EventType::TorOnionUrl];

/// Discovery-only crawler reporting every new onion link
pub struct LinkSpider {
    id: String,
    runner: SessionRunner,
}

impl LinkSpider {
    /// Keywords, raw content and scope settings in `options` are overridden
    pub fn new(options: &CrawlOptions) -> Self {
        let mut options = options.clone();
        options.keywords = String::new();
        options.emit_raw_content = false;
        options.scope = ScopeMode::Onion;

        Self {
            id: LINK_SPIDER_ID.to_string(),
            runner: SessionRunner::new(&options),
        }
    }

    pub fn with_fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.runner = self.runner.with_fetcher(fetcher);
        self
    }

    pub fn reports(&self) -> &[CrawlReport] {
        self.runner.reports()
    }
}

#[async_trait]
impl OsintModule for LinkSpider {
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
        if !WATCHED.contains(&event.event_type) {
            return Ok(Vec::new());
        }

        info!("Link spider mapping {}", event.data);
        let emitted = self.runner.crawl(&self.id, &event.data, event, bus, stop).await;
        info!("Link spider reported {} new onion links", emitted.len());
        Ok(emitted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedFetcher;

    fn options() -> CrawlOptions {
        let mut options = CrawlOptions::default();
        options.keywords = "superlist".to_string();
        options.emit_raw_content = true;
        options.max_depth = 1;
        options.politeness_delay_ms = 0;
        options
    }

    #[tokio::test]
    async fn test_reports_onion_links_only() {
        let fetcher = ScriptedFetcher::new().page(
            "http://abc123.onion/",
            r#"<p>superlist</p>
               <a href="http://def456.onion/">a</a>
               <a href="https://example.com/">b</a>"#,
        );
        let mut spider = LinkSpider::new(&options()).with_fetcher(Arc::new(fetcher));
        let mut bus = EventBus::new();
        let event = HostEvent::root(EventType::TorOnionSite, "abc123.onion");

        let emitted = spider
            .handle_event(&event, &mut bus, &StopFlag::new())
            .await
            .unwrap();

        assert_eq!(emitted.len(), 1);
        let link = &bus.events()[0];
        assert_eq!(link.event_type, EventType::TorOnionUrl);
        assert_eq!(link.data, "http://def456.onion/");
        assert_eq!(link.module, LINK_SPIDER_ID);
        assert_eq!(link.source_url.as_deref(), Some("http://abc123.onion/"));
    }

    #[tokio::test]
    async fn test_links_not_reported_twice_across_sessions() {
        let fetcher = ScriptedFetcher::new()
            .page("http://abc123.onion/", r#"<a href="http://shared.onion/">s</a>"#)
            .page("http://def456.onion/", r#"<a href="http://shared.onion/">s</a>"#);
        let mut spider = LinkSpider::new(&options()).with_fetcher(Arc::new(fetcher));
        let mut bus = EventBus::new();
        let stop = StopFlag::new();

        let first = HostEvent::root(EventType::TorOnionSite, "abc123.onion");
        let second = HostEvent::root(EventType::Url, "http://def456.onion/");
        let a = spider.handle_event(&first, &mut bus, &stop).await.unwrap();
        let b = spider.handle_event(&second, &mut bus, &stop).await.unwrap();

        assert_eq!(a.len(), 1);
        assert!(b.is_empty());
        assert_eq!(bus.events_of(EventType::TorOnionUrl).len(), 1);
        assert_eq!(bus.stats().duplicates_suppressed, 1);
        assert_eq!(spider.reports().len(), 2);
    }

    #[tokio::test]
    async fn test_ignores_domain_events() {
        let fetcher = Arc::new(ScriptedFetcher::new());
        let mut spider = LinkSpider::new(&options()).with_fetcher(fetcher.clone());
        let mut bus = EventBus::new();
        let event = HostEvent::root(EventType::DomainName, "abc123.onion");

        let emitted = spider
            .handle_event(&event, &mut bus, &StopFlag::new())
            .await
            .unwrap();

        assert!(emitted.is_empty());
        assert!(fetcher.calls().is_empty());
    }
}
