//! Crawl session - one breadth-first crawl from one seed
//!
//! The session owns its frontier, page counter and configuration. It runs
//! until the frontier is empty, the page budget is spent or the host asks it
//! to stop. No single page failure ends a session.

use tracing::{debug, info, warn};

use leakhunt_core::{
    host_of, is_onion_host, ConfigError, CrawlConfig, EventBus, EventType, HostEvent, ScopeMode,
    StopFlag,
};
use leakhunt_tor::Fetcher;

use crate::{extract_links, match_page, page_text, CrawlTarget, ForumClassifier, Frontier};

/// Lifecycle of a crawl session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Seed queued, nothing fetched
    Idle,
    /// Crawl loop in progress
    Running,
    /// Frontier exhausted or page budget reached
    Completed,
    /// Host requested a stop
    Stopped,
    /// Unusable configuration; nothing was crawled
    Failed,
}

/// Summary of a finished session
#[derive(Debug, Clone)]
pub struct CrawlReport {
    pub seed: String,
    pub state: SessionState,
    /// Fetch attempts, successful or not
    pub pages_fetched: usize,
    pub pages_failed: usize,
    /// Pages with at least one keyword hit
    pub leaks_found: usize,
    /// Links newly queued
    pub links_discovered: usize,
    /// Targets left in the frontier
    pub queued_remaining: usize,
    /// Why the session failed
    pub failure: Option<String>,
}

impl CrawlReport {
    /// Report of a session that could not start
    pub fn failed(seed: &str, reason: &str) -> Self {
        Self {
            seed: seed.to_string(),
            state: SessionState::Failed,
            pages_fetched: 0,
            pages_failed: 0,
            leaks_found: 0,
            links_discovered: 0,
            queued_remaining: 0,
            failure: Some(reason.to_string()),
        }
    }
}

/// One crawl from a seed URL
pub struct CrawlSession {
    module_id: String,
    config: CrawlConfig,
    seed: String,
    scope_domain: Option<String>,
    frontier: Frontier,
    classifier: ForumClassifier,
    state: SessionState,
    pages_fetched: usize,
    pages_failed: usize,
    leaks_found: usize,
    links_discovered: usize,
}

impl CrawlSession {
    /// Create a session with the seed queued at depth 0
    pub fn new(module_id: &str, config: CrawlConfig, seed_url: &str) -> Result<Self, ConfigError> {
        let seed = CrawlTarget::new(seed_url, 0)
            .ok_or_else(|| ConfigError::InvalidSeed(seed_url.to_string()))?;

        let scope_domain = match config.scope {
            ScopeMode::Onion => None,
            ScopeMode::SameDomain => Some(
                host_of(seed.url()).ok_or_else(|| ConfigError::InvalidSeed(seed_url.to_string()))?,
            ),
        };

        let mut frontier = Frontier::new(config.max_pages);
        frontier.push(seed.clone(), false);

        Ok(Self {
            module_id: module_id.to_string(),
            classifier: ForumClassifier::from_config(&config),
            config,
            seed: seed.url().to_string(),
            scope_domain,
            frontier,
            state: SessionState::Idle,
            pages_fetched: 0,
            pages_failed: 0,
            leaks_found: 0,
            links_discovered: 0,
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn frontier(&self) -> &Frontier {
        &self.frontier
    }

    /// Run the crawl loop to completion.
    ///
    /// Findings are emitted onto `bus` as children of `parent`. The stop flag
    /// is checked before every dequeue, again after the politeness wait, and
    /// before link processing; a fetch in progress always finishes and its
    /// page is still processed.
    pub async fn run(
        &mut self,
        fetcher: &dyn Fetcher,
        bus: &mut EventBus,
        stop: &StopFlag,
        parent: &HostEvent,
    ) -> CrawlReport {
        if self.state != SessionState::Idle {
            return self.report();
        }

        self.state = SessionState::Running;
        info!("Starting Tor crawl on: {}", self.seed);

        loop {
            if stop.is_requested() {
                info!("Stop requested, ending crawl of {}", self.seed);
                self.state = SessionState::Stopped;
                break;
            }

            let target = match self.frontier.pop() {
                Some(target) => target,
                None => {
                    self.state = SessionState::Completed;
                    break;
                }
            };

            self.throttle(&target).await;
            if stop.is_requested() {
                info!("Stop requested, {} left unfetched", target.url());
                self.state = SessionState::Stopped;
                break;
            }

            self.pages_fetched += 1;
            let result = fetcher.fetch(target.url()).await;

            let body = match result.body.as_deref() {
                Some(body) => body,
                None => {
                    self.pages_failed += 1;
                    warn!(
                        stage = "fetch",
                        "Fetch of {} failed: {}",
                        target.url(),
                        result.error.as_deref().unwrap_or("no body")
                    );
                    continue;
                }
            };

            info!(
                "Fetched page {}/{}: {}",
                self.pages_fetched,
                self.config.max_pages,
                target.url()
            );

            let base = result.final_url.as_deref().unwrap_or(target.url());
            if base != target.url() && self.frontier.mark_visited(base) {
                debug!("{} redirected to {}", target.url(), base);
            }
            self.process_page(&target, base, body, bus, stop, parent).await;
        }

        let report = self.report();
        info!(
            "Crawl of {} ended {:?}: {} pages fetched, {} failed, {} with leaks, {} links queued",
            report.seed,
            report.state,
            report.pages_fetched,
            report.pages_failed,
            report.leaks_found,
            report.links_discovered
        );
        report
    }

    pub fn report(&self) -> CrawlReport {
        CrawlReport {
            seed: self.seed.clone(),
            state: self.state,
            pages_fetched: self.pages_fetched,
            pages_failed: self.pages_failed,
            leaks_found: self.leaks_found,
            links_discovered: self.links_discovered,
            queued_remaining: self.frontier.len(),
            failure: None,
        }
    }

    async fn process_page(
        &mut self,
        target: &CrawlTarget,
        base: &str,
        body: &str,
        bus: &mut EventBus,
        stop: &StopFlag,
        parent: &HostEvent,
    ) {
        let url = target.url();
        self.dump_page(body).await;

        if self.config.emit_raw_content {
            self.emit(bus, EventType::RawData, body.to_string(), url, parent);
        }

        let (_, text) = page_text(body);
        let is_forum = self.classifier.is_forum_page(url, &text);

        if !self.config.keywords.is_empty() {
            match match_page(body, &self.config.keywords) {
                Some(found) => {
                    self.leaks_found += 1;
                    let keywords = found.keywords.join(", ");
                    info!("Found keywords {} in {}", keywords, url);

                    let leak = format!("KEYWORDS: {}\nURL: {}\nSNIPPET:\n{}", keywords, url, found.snippet);
                    self.emit(bus, EventType::LeakedData, leak, url, parent);

                    if is_forum {
                        let mention = format!(
                            "FORUM LEAK: {}\nURL: {}\nSNIPPET:\n{}",
                            keywords, url, found.snippet
                        );
                        self.emit(bus, EventType::DarknetMentionContent, mention, url, parent);
                    }
                }
                None => debug!("No keywords found in {}", url),
            }
        }

        if target.depth() >= self.config.max_depth {
            return;
        }
        if stop.is_requested() {
            debug!("Stop requested, skipping links of {}", url);
            return;
        }

        self.queue_links(target, base, body, bus, parent);
    }

    fn queue_links(
        &mut self,
        target: &CrawlTarget,
        base: &str,
        body: &str,
        bus: &mut EventBus,
        parent: &HostEvent,
    ) {
        let links = extract_links(base, body, self.scope_domain.as_deref());
        let (forum_links, other_links): (Vec<String>, Vec<String>) = links
            .into_iter()
            .partition(|link| self.classifier.is_forum_url(link));

        debug!(
            "{} links on {} ({} forum)",
            forum_links.len() + other_links.len(),
            target.url(),
            forum_links.len()
        );

        let depth = target.depth() + 1;
        // Front insertion reverses order, so walk forum links backwards
        for link in forum_links.iter().rev() {
            self.enqueue(link, depth, true, target.url(), bus, parent);
        }
        for link in &other_links {
            self.enqueue(link, depth, false, target.url(), bus, parent);
        }
    }

    fn enqueue(
        &mut self,
        link: &str,
        depth: u32,
        priority: bool,
        source_url: &str,
        bus: &mut EventBus,
        parent: &HostEvent,
    ) {
        let target = match CrawlTarget::new(link, depth) {
            Some(target) => target,
            None => return,
        };
        if !self.frontier.push(target, priority) {
            return;
        }

        self.links_discovered += 1;
        if host_of(link).is_some_and(|host| is_onion_host(&host)) {
            self.emit(bus, EventType::TorOnionUrl, link.to_string(), source_url, parent);
        }
    }

    /// Politeness pause before non-forum pages past the seed
    async fn throttle(&self, target: &CrawlTarget) {
        let delay = self.config.politeness_delay;
        if target.depth() == 0 || delay.is_zero() || self.classifier.is_forum_url(target.url()) {
            return;
        }

        debug!("Waiting {:?} before {}", delay, target.url());
        tokio::time::sleep(delay).await;
    }

    /// Write the body to the dump directory, if one is configured
    async fn dump_page(&self, body: &str) {
        let dir = match &self.config.dump_dir {
            Some(dir) => dir,
            None => return,
        };

        let path = dir.join(format!("page_{}.html", self.pages_fetched));

        let written: std::io::Result<()> = async {
            tokio::fs::create_dir_all(dir).await?;
            tokio::fs::write(&path, body).await
        }
        .await;

        if let Err(e) = written {
            warn!("Failed to write {}: {}", path.display(), e);
        }
    }

    fn emit(
        &self,
        bus: &mut EventBus,
        event_type: EventType,
        data: String,
        source_url: &str,
        parent: &HostEvent,
    ) {
        let event = HostEvent::builder(event_type, data)
            .module(&self.module_id)
            .parent(parent)
            .source_url(source_url)
            .build();

        if bus.emit(event).is_none() {
            debug!("Duplicate {} event from {} suppressed", event_type, source_url);
        }
    }
}
