//! Common traits for host modules

use async_trait::async_trait;
use thiserror::Error;

use leakhunt_core::{ConfigError, EventBus, EventType, HostEvent, StopFlag};
use leakhunt_tor::TorError;

/// Errors from module operations
#[derive(Debug, Error)]
pub enum ModuleError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Network error: {0}")]
    Network(#[from] TorError),

    #[error("Module disabled: {0}")]
    Disabled(String),
}

/// Common interface for all modules plugged into a scan
#[async_trait]
pub trait OsintModule: Send + Sync {
    /// Unique module identifier
    fn id(&self) -> &str;

    /// Event types this module reacts to
    fn watched_events(&self) -> &[EventType];

    /// Event types this module may emit
    fn produced_events(&self) -> &[EventType];

    /// Handle one event, emitting findings onto the bus.
    /// Returns the hashes of newly emitted events.
    async fn handle_event(
        &mut self,
        event: &HostEvent,
        bus: &mut EventBus,
        stop: &StopFlag,
    ) -> Result<Vec<String>, ModuleError>;
}
