//! Registry of live observer connections and the fan-out over them.
//!
//! Every observer owns a private bounded channel. Fan-out pushes into those
//! channels with `try_send`, so one slow observer only loses its own frames
//! and never holds up a publish.

use futures::Stream;
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};
use tokio::sync::mpsc::{self, error::TrySendError};
use ulid::Ulid;

use crate::error::{RelayError, RelayResult};
use crate::protocol::Frame;

/// Identity of one observer connection
pub type ObserverId = Ulid;

/// Write side of one observer's stream
#[derive(Debug, Clone)]
pub struct ObserverConnection {
    id: ObserverId,
    sender: mpsc::Sender<Frame>,
}

impl ObserverConnection {
    /// Open a connection with room for `buffer` undelivered frames
    pub fn open(buffer: usize) -> (Self, mpsc::Receiver<Frame>) {
        let (sender, receiver) = mpsc::channel(buffer.max(1));
        let conn = Self {
            id: Ulid::new(),
            sender,
        };
        (conn, receiver)
    }

    pub fn id(&self) -> ObserverId {
        self.id
    }

    /// False once the reading side (the transport) has gone away
    pub fn is_open(&self) -> bool {
        !self.sender.is_closed()
    }

    /// Queue a frame without waiting
    pub fn send(&self, frame: Frame) -> RelayResult<()> {
        self.sender.try_send(frame).map_err(|e| {
            let reason = match e {
                TrySendError::Full(_) => "buffer full",
                TrySendError::Closed(_) => "connection closed",
            };
            RelayError::TransportWriteFailure {
                id: self.id,
                reason,
            }
        })
    }
}

/// Shared set of observer connections keyed by identity
#[derive(Debug, Clone, Default)]
pub struct BroadcastRegistry {
    observers: Arc<Mutex<HashMap<ObserverId, ObserverConnection>>>,
}

impl BroadcastRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn observers(&self) -> MutexGuard<'_, HashMap<ObserverId, ObserverConnection>> {
        self.observers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a connection.
    ///
    /// `prime` runs under the registry lock before the connection becomes
    /// visible to `broadcast`, so anything it queues is delivered ahead of
    /// all fan-out traffic.
    pub fn register<F>(&self, conn: ObserverConnection, prime: F)
    where
        F: FnOnce(&ObserverConnection),
    {
        let mut observers = self.observers();
        prime(&conn);
        observers.insert(conn.id, conn);
    }

    /// Remove a connection by identity. Returns whether it was present.
    pub fn unregister(&self, id: &ObserverId) -> bool {
        self.observers().remove(id).is_some()
    }

    /// Send `frame` to every connection registered when the call starts.
    ///
    /// Per-observer failures are logged and skipped. Returns how many
    /// connections were attempted.
    pub fn broadcast(&self, frame: &Frame) -> usize {
        let targets: Vec<ObserverConnection> = self.observers().values().cloned().collect();

        for conn in &targets {
            if let Err(e) = conn.send(frame.clone()) {
                if conn.is_open() {
                    tracing::warn!("Dropping frame for slow observer: {}", e);
                } else {
                    tracing::debug!("{}", e);
                }
            }
        }

        targets.len()
    }

    pub fn len(&self) -> usize {
        self.observers().len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers().is_empty()
    }

    pub fn contains(&self, id: &ObserverId) -> bool {
        self.observers().contains_key(id)
    }
}

/// Read side of a registered observer.
///
/// Dropping it is the transport's close signal: the connection is
/// unregistered exactly once, here.
#[derive(Debug)]
pub struct Subscription {
    id: ObserverId,
    frames: mpsc::Receiver<Frame>,
    registry: BroadcastRegistry,
}

impl Subscription {
    pub fn new(id: ObserverId, frames: mpsc::Receiver<Frame>, registry: BroadcastRegistry) -> Self {
        Self {
            id,
            frames,
            registry,
        }
    }

    pub fn id(&self) -> ObserverId {
        self.id
    }
}

impl Stream for Subscription {
    type Item = Frame;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Frame>> {
        self.frames.poll_recv(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.frames.close();
        if self.registry.unregister(&self.id) {
            tracing::info!(
                observer = %self.id,
                live = self.registry.len(),
                "Observer disconnected"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::{FutureExt, StreamExt};

    fn frame(text: &str) -> Frame {
        Frame::from(text)
    }

    fn subscribe(registry: &BroadcastRegistry, buffer: usize) -> Subscription {
        let (conn, rx) = ObserverConnection::open(buffer);
        let id = conn.id();
        registry.register(conn, |_| {});
        Subscription::new(id, rx, registry.clone())
    }

    #[tokio::test]
    async fn test_broadcast_reaches_every_observer() {
        let registry = BroadcastRegistry::new();
        let mut a = subscribe(&registry, 8);
        let mut b = subscribe(&registry, 8);

        assert_eq!(registry.broadcast(&frame("hello")), 2);

        assert_eq!(a.next().await.as_deref(), Some("hello"));
        assert_eq!(b.next().await.as_deref(), Some("hello"));
    }

    #[tokio::test]
    async fn test_broadcast_with_no_observers() {
        let registry = BroadcastRegistry::new();
        assert_eq!(registry.broadcast(&frame("nobody")), 0);
    }

    #[test]
    fn test_unregister_is_idempotent() {
        let registry = BroadcastRegistry::new();
        let (conn, _rx) = ObserverConnection::open(4);
        let id = conn.id();
        registry.register(conn, |_| {});

        assert!(registry.unregister(&id));
        assert!(!registry.unregister(&id));
        assert!(!registry.unregister(&Ulid::new()));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_dropping_subscription_unregisters() {
        let registry = BroadcastRegistry::new();
        let sub = subscribe(&registry, 4);
        let id = sub.id();
        assert!(registry.contains(&id));

        drop(sub);
        assert!(!registry.contains(&id));
        assert_eq!(registry.len(), 0);
    }

    #[tokio::test]
    async fn test_closed_observer_does_not_abort_fanout() {
        let registry = BroadcastRegistry::new();

        // Receiver gone but the connection was never unregistered
        let (dead, rx) = ObserverConnection::open(4);
        let dead_id = dead.id();
        registry.register(dead, |_| {});
        drop(rx);

        let mut alive = subscribe(&registry, 4);

        assert_eq!(registry.broadcast(&frame("still here")), 2);
        assert_eq!(alive.next().await.as_deref(), Some("still here"));

        // Write failures never remove a connection on their own
        assert!(registry.contains(&dead_id));
    }

    #[tokio::test]
    async fn test_slow_observer_only_loses_its_own_frames() {
        let registry = BroadcastRegistry::new();
        let mut slow = subscribe(&registry, 1);
        let mut fast = subscribe(&registry, 8);

        registry.broadcast(&frame("one"));
        registry.broadcast(&frame("two"));

        assert_eq!(fast.next().await.as_deref(), Some("one"));
        assert_eq!(fast.next().await.as_deref(), Some("two"));

        assert_eq!(slow.next().await.as_deref(), Some("one"));
        assert!(slow.next().now_or_never().is_none());
    }

    #[tokio::test]
    async fn test_primed_frame_precedes_broadcast() {
        let registry = BroadcastRegistry::new();
        let (conn, rx) = ObserverConnection::open(4);
        let id = conn.id();
        registry.register(conn, |conn| {
            conn.send(frame("replay")).unwrap();
        });
        let mut sub = Subscription::new(id, rx, registry.clone());

        registry.broadcast(&frame("live"));

        assert_eq!(sub.next().await.as_deref(), Some("replay"));
        assert_eq!(sub.next().await.as_deref(), Some("live"));
    }

    #[test]
    fn test_send_reports_closed_transport() {
        let (conn, rx) = ObserverConnection::open(4);
        assert!(conn.is_open());
        drop(rx);
        assert!(!conn.is_open());

        let err = conn.send(frame("lost")).unwrap_err();
        assert!(matches!(
            err,
            RelayError::TransportWriteFailure {
                reason: "connection closed",
                ..
            }
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_unregister_races_with_broadcast() {
        const PUBLISHERS: usize = 2;
        const FRAMES: usize = 100;

        let registry = BroadcastRegistry::new();
        let mut survivors: Vec<Subscription> = (0..4)
            .map(|_| subscribe(&registry, PUBLISHERS * FRAMES))
            .collect();

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let registry = registry.clone();
            tasks.push(tokio::spawn(async move {
                for _ in 0..200 {
                    let mut sub = subscribe(&registry, 4);
                    tokio::task::yield_now().await;
                    while let Some(Some(_)) = sub.next().now_or_never() {}
                    drop(sub);
                }
            }));
        }
        for publisher in 0..PUBLISHERS {
            let registry = registry.clone();
            tasks.push(tokio::spawn(async move {
                for seq in 0..FRAMES {
                    registry.broadcast(&Frame::from(format!("{publisher}-{seq}")));
                    tokio::task::yield_now().await;
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        // Observers registered for the whole run see every frame, in per-publisher order
        for sub in &mut survivors {
            let mut expected = [0usize; PUBLISHERS];
            for _ in 0..PUBLISHERS * FRAMES {
                let frame = sub.next().await.unwrap();
                let (publisher, seq) = frame.split_once('-').unwrap();
                let publisher: usize = publisher.parse().unwrap();
                let seq: usize = seq.parse().unwrap();
                assert_eq!(seq, expected[publisher]);
                expected[publisher] += 1;
            }
            assert!(sub.next().now_or_never().is_none());
        }

        assert_eq!(registry.len(), survivors.len());
        drop(survivors);
        assert_eq!(registry.len(), 0);
    }
}
