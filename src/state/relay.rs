//! Observer connect and publish flows.

use std::sync::PoisonError;

use super::{AppState, ObserverConnection, Subscription};
use crate::error::RelayResult;
use crate::protocol::Envelope;

impl AppState {
    /// Register a new observer and queue the cached snapshot for it, if any.
    ///
    /// The returned subscription unregisters the observer when dropped.
    pub fn connect_observer(&self) -> Subscription {
        let (conn, frames) = ObserverConnection::open(self.config.observer_buffer);
        let id = conn.id();

        self.registry.register(conn, |conn| {
            let Some(snapshot) = self.cache.get() else {
                return;
            };
            match Envelope::state(snapshot).to_frame() {
                Ok(frame) => {
                    if let Err(e) = conn.send(frame) {
                        tracing::debug!("Snapshot replay failed: {}", e);
                    }
                }
                Err(e) => tracing::error!("Failed to encode snapshot replay: {}", e),
            }
        });

        tracing::info!(observer = %id, live = self.registry.len(), "Observer connected");
        Subscription::new(id, frames, self.registry.clone())
    }

    /// Parse a raw publish body and relay it.
    ///
    /// Malformed input is rejected before anything is touched.
    pub fn publish(&self, body: &[u8]) -> RelayResult<usize> {
        let envelope = Envelope::from_slice(body)?;
        self.publish_envelope(envelope)
    }

    /// Cache `state` envelopes, then fan the envelope out to every observer.
    ///
    /// Returns the number of observers the envelope was offered to.
    pub fn publish_envelope(&self, envelope: Envelope) -> RelayResult<usize> {
        let frame = envelope.to_frame()?;

        let _gate = self
            .publish_gate
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if envelope.is_state() {
            self.cache.set(envelope.payload);
        }
        let observers = self.registry.broadcast(&frame);

        tracing::debug!(kind = %envelope.kind, observers, "Envelope relayed");
        Ok(observers)
    }
}
