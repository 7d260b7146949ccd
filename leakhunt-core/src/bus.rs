//! Event bus - where modules publish their findings
//!
//! The bus keeps every accepted event in emission order:
//! - Identical events (same type, payload and module) are accepted once
//! - Newly accepted events wait in a pending queue until the scan dispatches them
//! - Statistics summarise what a scan produced

use std::collections::{BTreeMap, HashSet, VecDeque};

use crate::{EventType, HostEvent};

/// The shared bus modules emit onto
#[derive(Debug, Clone, Default)]
pub struct EventBus {
    /// Accepted events, in emission order
    events: Vec<HostEvent>,

    /// Hashes of accepted events
    seen: HashSet<String>,

    /// Accepted events not yet dispatched to modules
    pending: VecDeque<HostEvent>,

    /// Number of emissions rejected as duplicates
    duplicates: usize,
}

impl EventBus {
    /// Create an empty bus
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit an event onto the bus.
    /// Returns the event hash, or `None` when an identical event was already emitted.
    pub fn emit(&mut self, event: HostEvent) -> Option<String> {
        if !self.seen.insert(event.hash.clone()) {
            self.duplicates += 1;
            return None;
        }

        let hash = event.hash.clone();
        self.pending.push_back(event.clone());
        self.events.push(event);
        Some(hash)
    }

    /// Next accepted event awaiting dispatch
    pub fn next_pending(&mut self) -> Option<HostEvent> {
        self.pending.pop_front()
    }

    /// All accepted events
    pub fn events(&self) -> &[HostEvent] {
        &self.events
    }

    /// Accepted events of one type
    pub fn events_of(&self, event_type: EventType) -> Vec<&HostEvent> {
        self.events
            .iter()
            .filter(|e| e.event_type == event_type)
            .collect()
    }

    /// Count of accepted events
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Get bus statistics
    pub fn stats(&self) -> BusStats {
        let mut by_type = BTreeMap::new();
        for event in &self.events {
            *by_type.entry(event.event_type).or_insert(0) += 1;
        }

        BusStats {
            total_events: self.events.len(),
            duplicates_suppressed: self.duplicates,
            pending: self.pending.len(),
            by_type,
        }
    }
}

/// Bus statistics
#[derive(Debug, Clone)]
pub struct BusStats {
    pub total_events: usize,
    pub duplicates_suppressed: usize,
    pub pending: usize,
    pub by_type: BTreeMap<EventType, usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn onion_url(url: &str) -> HostEvent {
        HostEvent::builder(EventType::TorOnionUrl, url)
            .module("spider")
            .build()
    }

    #[test]
    fn test_bus_emit_and_dispatch() {
        let mut bus = EventBus::new();

        let hash = bus.emit(onion_url("http://a.onion/"));
        assert!(hash.is_some());
        assert_eq!(bus.len(), 1);

        let pending = bus.next_pending().unwrap();
        assert_eq!(pending.data, "http://a.onion/");
        assert!(bus.next_pending().is_none());
        assert_eq!(bus.len(), 1);
    }

    #[test]
    fn test_bus_suppresses_duplicates() {
        let mut bus = EventBus::new();

        bus.emit(onion_url("http://a.onion/"));
        assert!(bus.emit(onion_url("http://a.onion/")).is_none());
        bus.emit(onion_url("http://b.onion/"));

        let stats = bus.stats();
        assert_eq!(stats.total_events, 2);
        assert_eq!(stats.duplicates_suppressed, 1);
        assert_eq!(stats.by_type.get(&EventType::TorOnionUrl), Some(&2));
        assert_eq!(bus.events_of(EventType::LeakedData).len(), 0);
    }
}
