//! Session setup and bookkeeping shared by the crawling modules

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use leakhunt_core::{
    seed_url, ConfigError, CrawlConfig, CrawlOptions, EventBus, HostEvent, StopFlag,
};
use leakhunt_tor::{check_proxy_reachable, Fetcher, HttpFetcher, TorConfig, TorError};

use crate::{CrawlReport, CrawlSession};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Readiness {
    Unchecked,
    Ready,
    Disabled(String),
}

/// Runs one crawl session per distinct seed.
///
/// Configuration and proxy problems are found once, on the first event, and
/// disable the runner: every later seed is recorded as a failed session.
pub struct SessionRunner {
    config: Result<CrawlConfig, String>,
    readiness: Readiness,
    fetcher: Option<Arc<dyn Fetcher>>,
    crawled_roots: HashSet<String>,
    reports: Vec<CrawlReport>,
}

impl SessionRunner {
    pub fn new(options: &CrawlOptions) -> Self {
        Self {
            config: options.build().map_err(|e| e.to_string()),
            readiness: Readiness::Unchecked,
            fetcher: None,
            crawled_roots: HashSet::new(),
            reports: Vec::new(),
        }
    }

    /// Use `fetcher` instead of a proxied HTTP client; skips the proxy probe
    pub fn with_fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn config(&self) -> Option<&CrawlConfig> {
        self.config.as_ref().ok()
    }

    /// Reason the runner is disabled, once known
    pub fn disabled_reason(&self) -> Option<&str> {
        match &self.readiness {
            Readiness::Disabled(reason) => Some(reason),
            _ => None,
        }
    }

    pub fn reports(&self) -> &[CrawlReport] {
        &self.reports
    }

    /// Crawl from an event payload, returning hashes of the events emitted.
    ///
    /// Payloads that do not form a URL and seeds already crawled are skipped.
    pub async fn crawl(
        &mut self,
        module_id: &str,
        payload: &str,
        event: &HostEvent,
        bus: &mut EventBus,
        stop: &StopFlag,
    ) -> Vec<String> {
        let seed = match seed_url(payload) {
            Some(seed) => seed,
            None => {
                warn!("{}: cannot crawl {:?}, not a URL", module_id, payload);
                return Vec::new();
            }
        };

        if !self.crawled_roots.insert(seed.clone()) {
            debug!("{}: {} already crawled", module_id, seed);
            return Vec::new();
        }

        let fetcher = match self.ensure_ready(module_id).await {
            Ok(fetcher) => fetcher,
            Err(reason) => {
                self.reports.push(CrawlReport::failed(&seed, &reason));
                return Vec::new();
            }
        };

        let config = match &self.config {
            Ok(config) => config.clone(),
            Err(reason) => {
                self.reports.push(CrawlReport::failed(&seed, reason));
                return Vec::new();
            }
        };

        let mut session = match CrawlSession::new(module_id, config, &seed) {
            Ok(session) => session,
            Err(e) => {
                error!("{}: {}", module_id, e);
                self.reports.push(CrawlReport::failed(&seed, &e.to_string()));
                return Vec::new();
            }
        };

        let before = bus.len();
        let report = session.run(fetcher.as_ref(), bus, stop, event).await;
        self.reports.push(report);

        bus.events()[before..]
            .iter()
            .map(|e| e.hash.clone())
            .collect()
    }

    /// Validate configuration and build the fetcher on first use
    async fn ensure_ready(&mut self, module_id: &str) -> Result<Arc<dyn Fetcher>, String> {
        if let Readiness::Disabled(reason) = &self.readiness {
            return Err(reason.clone());
        }
        if let (Readiness::Ready, Some(fetcher)) = (&self.readiness, &self.fetcher) {
            return Ok(fetcher.clone());
        }

        match self.prepare().await {
            Ok(fetcher) => {
                info!("{}: ready", module_id);
                self.readiness = Readiness::Ready;
                self.fetcher = Some(fetcher.clone());
                Ok(fetcher)
            }
            Err(reason) => {
                error!("{}: disabled: {}", module_id, reason);
                self.readiness = Readiness::Disabled(reason.clone());
                Err(reason)
            }
        }
    }

    async fn prepare(&self) -> Result<Arc<dyn Fetcher>, String> {
        let config = self.config.as_ref().map_err(|e| e.clone())?;

        if let Some(fetcher) = &self.fetcher {
            return Ok(fetcher.clone());
        }

        if config.check_proxy {
            probe_proxy(&config.proxy_address)
                .await
                .map_err(|e| e.to_string())?;
        }

        let fetcher = HttpFetcher::new(&TorConfig::from_crawl_config(config)).map_err(|e| e.to_string())?;
        Ok(Arc::new(fetcher))
    }
}

/// Reachability probe, reported as a configuration problem
async fn probe_proxy(address: &str) -> Result<(), ConfigError> {
    check_proxy_reachable(address).await.map_err(|e| match e {
        TorError::InvalidProxy(invalid) => ConfigError::InvalidProxy(invalid),
        TorError::ProxyUnreachable { address: probed, reason } => ConfigError::ProxyUnreachable {
            address: probed,
            reason,
        },
        other => ConfigError::ProxyUnreachable {
            address: address.to_string(),
            reason: other.to_string(),
        },
    })
}
