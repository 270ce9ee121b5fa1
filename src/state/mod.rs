mod cache;
mod registry;
mod relay;

pub use cache::StateCache;
pub use registry::{BroadcastRegistry, ObserverConnection, ObserverId, Subscription};

use crate::config::RelayConfig;
use std::sync::{Arc, Mutex};

/// Shared relay state, constructed once at startup and handed to every handler
#[derive(Debug, Clone)]
pub struct AppState {
    pub cache: StateCache,
    pub registry: BroadcastRegistry,
    pub config: Arc<RelayConfig>,
    /// Serializes publishes so cache order matches fan-out order
    publish_gate: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(config: RelayConfig) -> Self {
        Self {
            cache: StateCache::new(),
            registry: BroadcastRegistry::new(),
            config: Arc::new(config),
            publish_gate: Arc::new(Mutex::new(())),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(RelayConfig::default())
    }
}
