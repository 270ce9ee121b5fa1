use std::sync::{Arc, PoisonError, RwLock};

use crate::protocol::StatePayload;

/// Single-slot holder for the most recently published state.
///
/// Empty until the first `state` envelope arrives. Readers always see a
/// whole payload, never a partially replaced one.
#[derive(Debug, Clone, Default)]
pub struct StateCache {
    latest: Arc<RwLock<Option<StatePayload>>>,
}

impl StateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current snapshot, or `None` if no state has been published yet
    pub fn get(&self) -> Option<StatePayload> {
        self.latest
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the snapshot unconditionally
    pub fn set(&self, payload: StatePayload) {
        *self.latest.write().unwrap_or_else(PoisonError::into_inner) = Some(payload);
    }
}
