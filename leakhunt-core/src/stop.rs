//! Cooperative stop flag shared between a scan and its modules

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Host-issued cancellation. Crawls poll it; nothing is interrupted.
#[derive(Debug, Clone, Default)]
pub struct StopFlag {
    requested: Arc<AtomicBool>,
}

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask every holder of this flag to stop at its next check
    pub fn request(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }
}
