//! Scan Coordinator
//!
//! Dispatches bus events to modules until the bus drains:
//! - Root events are submitted by the caller
//! - Each pending event goes to every module watching its type
//! - A module never receives its own events
//! - The runtime limit requests a cooperative stop

use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, error, info, warn};

use leakhunt_core::{BusStats, EventBus, EventType, HostEvent, StopFlag};
use leakhunt_modules::OsintModule;

/// Scan configuration
#[derive(Debug, Clone, Default)]
pub struct ScanConfig {
    /// Maximum runtime in seconds (0 = unlimited)
    pub max_runtime_secs: u64,
}

/// Errors from submitting root events
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Empty payload for {0} event")]
    EmptyPayload(EventType),

    #[error("Event already submitted: {0}")]
    Duplicate(String),
}

/// Outcome of a scan
#[derive(Debug, Clone)]
pub struct ScanSummary {
    /// Events dispatched to modules
    pub events_processed: usize,
    /// Whether the scan ended on a stop request
    pub stopped: bool,
    pub elapsed: Duration,
    pub stats: BusStats,
}

/// A scan: modules plus the bus they share
pub struct Scan {
    max_runtime_secs: u64,
    bus: EventBus,
    stop: StopFlag,
    modules: Vec<Box<dyn OsintModule>>,
}

impl Scan {
    pub fn new(config: ScanConfig) -> Self {
        Self {
            max_runtime_secs: config.max_runtime_secs,
            bus: EventBus::new(),
            stop: StopFlag::new(),
            modules: Vec::new(),
        }
    }

    /// Register a module
    pub fn add_module(&mut self, module: Box<dyn OsintModule>) {
        info!(
            "Added module {} (watches {:?})",
            module.id(),
            module.watched_events()
        );
        self.modules.push(module);
    }

    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    /// Submit a root event for the scan to start from
    pub fn submit(&mut self, event_type: EventType, data: &str) -> Result<String, ScanError> {
        let data = data.trim();
        if data.is_empty() {
            return Err(ScanError::EmptyPayload(event_type));
        }

        let hash = self
            .bus
            .emit(HostEvent::root(event_type, data))
            .ok_or_else(|| ScanError::Duplicate(data.to_string()))?;

        info!("Submitted {} {} (hash: {})", event_type, data, hash);
        Ok(hash)
    }

    /// Handle for stopping the scan from outside, e.g. on Ctrl-C
    pub fn stop_flag(&self) -> StopFlag {
        self.stop.clone()
    }

    /// Run until no events are pending or a stop is requested
    pub async fn run(&mut self) -> Result<ScanSummary, anyhow::Error> {
        let start = Instant::now();
        let timer = (self.max_runtime_secs > 0).then(|| {
            let stop = self.stop.clone();
            let limit = Duration::from_secs(self.max_runtime_secs);
            tokio::spawn(async move {
                tokio::time::sleep(limit).await;
                warn!("Scan reached maximum runtime");
                stop.request();
            })
        });

        info!("Scan starting with {} modules", self.modules.len());

        let mut events_processed = 0;
        while let Some(event) = self.bus.next_pending() {
            if self.stop.is_requested() {
                warn!("Stop requested, leaving remaining events undispatched");
                break;
            }
            events_processed += 1;

            for module in &mut self.modules {
                if module.id() == event.module || !module.watched_events().contains(&event.event_type) {
                    continue;
                }

                match module.handle_event(&event, &mut self.bus, &self.stop).await {
                    Ok(hashes) => {
                        if !hashes.is_empty() {
                            debug!(
                                "Module {} emitted {} events",
                                module.id(),
                                hashes.len()
                            );
                        }
                    }
                    Err(e) => {
                        error!("Module {} error: {}", module.id(), e);
                    }
                }
            }
        }

        if let Some(timer) = timer {
            timer.abort();
        }

        let summary = ScanSummary {
            events_processed,
            stopped: self.stop.is_requested(),
            elapsed: start.elapsed(),
            stats: self.bus.stats(),
        };
        info!(
            "Scan finished: {} events dispatched, {} on the bus, {} duplicates suppressed",
            summary.events_processed, summary.stats.total_events, summary.stats.duplicates_suppressed
        );
        Ok(summary)
    }

    /// Events gathered so far
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use leakhunt_modules::ModuleError;
    use std::sync::{Arc, Mutex};

    /// Records what it receives and answers with one event per input
    struct Relay {
        id: String,
        watched: Vec<EventType>,
        emits: Vec<EventType>,
        delay: Duration,
        seen: Arc<Mutex<Vec<String>>>,
    }

    impl Relay {
        fn new(id: &str, watched: EventType, emits: Option<EventType>) -> Self {
            Self {
                id: id.to_string(),
                watched: vec![watched],
                emits: emits.into_iter().collect(),
                delay: Duration::ZERO,
                seen: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }
    }

    #[async_trait]
    impl OsintModule for Relay {
        fn id(&self) -> &str {
            &self.id
        }

        fn watched_events(&self) -> &[EventType] {
            &self.watched
        }

        fn produced_events(&self) -> &[EventType] {
            &self.emits
        }

        async fn handle_event(
            &mut self,
            event: &HostEvent,
            bus: &mut EventBus,
            _stop: &StopFlag,
        ) -> Result<Vec<String>, ModuleError> {
            self.seen.lock().unwrap().push(event.data.clone());
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }

            let mut emitted = Vec::new();
            for event_type in &self.emits {
                let reply = HostEvent::builder(*event_type, format!("{}>{}", event.data, self.id))
                    .module(&self.id)
                    .parent(event)
                    .build();
                emitted.extend(bus.emit(reply));
            }
            Ok(emitted)
        }
    }

    struct Failing;

    #[async_trait]
    impl OsintModule for Failing {
        fn id(&self) -> &str {
            "failing"
        }

        fn watched_events(&self) -> &[EventType] {
            &[EventType::DomainName]
        }

        fn produced_events(&self) -> &[EventType] {
            &[]
        }

        async fn handle_event(
            &mut self,
            _event: &HostEvent,
            _bus: &mut EventBus,
            _stop: &StopFlag,
        ) -> Result<Vec<String>, ModuleError> {
            Err(ModuleError::Disabled("no proxy".to_string()))
        }
    }

    #[test]
    fn test_submit() {
        let mut scan = Scan::new(ScanConfig::default());
        let hash = scan.submit(EventType::DomainName, " abc123.onion ").unwrap();

        assert!(!hash.is_empty());
        assert_eq!(scan.bus().events()[0].data, "abc123.onion");
        assert!(matches!(
            scan.submit(EventType::DomainName, "abc123.onion"),
            Err(ScanError::Duplicate(_))
        ));
        assert!(matches!(
            scan.submit(EventType::Url, "  "),
            Err(ScanError::EmptyPayload(EventType::Url))
        ));
    }

    #[tokio::test]
    async fn test_events_flow_between_modules() {
        let hunter = Relay::new("hunter", EventType::DomainName, Some(EventType::TorOnionUrl));
        let sink = Relay::new("sink", EventType::TorOnionUrl, None);
        let sink_seen = sink.seen.clone();
        let hunter_seen = hunter.seen.clone();

        let mut scan = Scan::new(ScanConfig::default());
        scan.add_module(Box::new(hunter));
        scan.add_module(Box::new(sink));
        scan.submit(EventType::DomainName, "abc123.onion").unwrap();

        let summary = scan.run().await.unwrap();

        assert_eq!(summary.events_processed, 2);
        assert!(!summary.stopped);
        assert_eq!(*hunter_seen.lock().unwrap(), vec!["abc123.onion"]);
        assert_eq!(*sink_seen.lock().unwrap(), vec!["abc123.onion>hunter"]);
        assert_eq!(summary.stats.by_type.get(&EventType::TorOnionUrl), Some(&1));
    }

    #[tokio::test]
    async fn test_module_skips_own_events() {
        let echo = Relay::new("echo", EventType::Url, Some(EventType::Url));
        let seen = echo.seen.clone();

        let mut scan = Scan::new(ScanConfig::default());
        scan.add_module(Box::new(echo));
        scan.submit(EventType::Url, "http://abc123.onion/").unwrap();

        let summary = scan.run().await.unwrap();

        assert_eq!(seen.lock().unwrap().len(), 1);
        assert_eq!(summary.events_processed, 2);
        assert_eq!(scan.bus().len(), 2);
    }

    #[tokio::test]
    async fn test_module_errors_do_not_end_scan() {
        let after = Relay::new("after", EventType::DomainName, None);
        let seen = after.seen.clone();

        let mut scan = Scan::new(ScanConfig::default());
        scan.add_module(Box::new(Failing));
        scan.add_module(Box::new(after));
        scan.submit(EventType::DomainName, "abc123.onion").unwrap();

        let summary = scan.run().await.unwrap();

        assert_eq!(summary.events_processed, 1);
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_stop_before_run() {
        let mut scan = Scan::new(ScanConfig::default());
        scan.add_module(Box::new(Relay::new("r", EventType::Url, None)));
        scan.submit(EventType::Url, "http://abc123.onion/").unwrap();
        scan.stop_flag().request();

        let summary = scan.run().await.unwrap();

        assert!(summary.stopped);
        assert_eq!(summary.events_processed, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_max_runtime_stops_scan() {
        // Two relays bounce URL events back and forth forever
        let ping = Relay::new("ping", EventType::Url, Some(EventType::Url)).delay(Duration::from_secs(1));
        let pong = Relay::new("pong", EventType::Url, Some(EventType::Url)).delay(Duration::from_secs(1));

        let mut scan = Scan::new(ScanConfig { max_runtime_secs: 5 });
        scan.add_module(Box::new(ping));
        scan.add_module(Box::new(pong));
        scan.submit(EventType::Url, "http://abc123.onion/").unwrap();

        let summary = scan.run().await.unwrap();

        assert!(summary.stopped);
        assert!(summary.events_processed >= 3);
        assert!(summary.events_processed <= 7);
    }
}
