use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc};
use tracing::trace;

pub mod catalog;

pub use catalog::{AutomationEvent, AutomationWarning, EventKind, LifecycleEvents};

/// Trait implemented by payload types that can be carried on the bus.
pub trait Event: Clone + Send + Sync + std::fmt::Debug + 'static {}

impl<T> Event for T where T: Clone + Send + Sync + std::fmt::Debug + 'static {}

#[derive(Debug, Error, Clone)]
pub enum BusError {
    #[error("bus closed")]
    Closed,
}

#[async_trait]
pub trait EventBus<E>: Send + Sync
where
    E: Event,
{
    /// Publish to current subscribers and return how many received the event.
    /// Publishing with nobody listening is not an error.
    async fn publish(&self, event: E) -> Result<usize, BusError>;
    fn subscribe(&self) -> broadcast::Receiver<E>;
}

/// Simple in-memory bus backed by a broadcast channel.
pub struct InMemoryBus<E>
where
    E: Event,
{
    sender: broadcast::Sender<E>,
}

impl<E> InMemoryBus<E>
where
    E: Event,
{
    pub fn new(capacity: usize) -> Arc<Self> {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Arc::new(Self { sender })
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    pub(crate) fn send(&self, event: E) -> usize {
        match self.sender.send(event) {
            Ok(delivered) => delivered,
            Err(broadcast::error::SendError(event)) => {
                trace!(?event, "no subscribers for event");
                0
            }
        }
    }
}

#[async_trait]
impl<E> EventBus<E> for InMemoryBus<E>
where
    E: Event,
{
    async fn publish(&self, event: E) -> Result<usize, BusError> {
        Ok(self.send(event))
    }

    fn subscribe(&self) -> broadcast::Receiver<E> {
        self.sender.subscribe()
    }
}

/// Helper to materialise an mpsc receiver from the bus subscription
/// so callers can await events without handling broadcast semantics directly.
pub fn to_mpsc<E>(bus: Arc<InMemoryBus<E>>, capacity: usize) -> mpsc::Receiver<E>
where
    E: Event,
{
    let mut rx = bus.subscribe();
    let (tx, out_rx) = mpsc::channel(capacity.max(1));
    tokio::spawn(async move {
        while let Ok(ev) = rx.recv().await {
            if tx.send(ev).await.is_err() {
                break;
            }
        }
    });
    out_rx
}

/// Collect everything already buffered on a subscription, in publish order.
pub fn drain<E>(rx: &mut broadcast::Receiver<E>) -> Vec<E>
where
    E: Event,
{
    let mut events = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(event) => events.push(event),
            Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                trace!(skipped, "subscriber lagged behind bus");
            }
            Err(_) => break,
        }
    }
    events
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_without_subscribers_is_ok() {
        let bus = InMemoryBus::<u32>::new(4);
        assert_eq!(bus.publish(7).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn drain_preserves_order() {
        let bus = InMemoryBus::<u32>::new(8);
        let mut rx = bus.subscribe();
        for n in 0..5 {
            bus.publish(n).await.unwrap();
        }
        assert_eq!(drain(&mut rx), vec![0, 1, 2, 3, 4]);
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn mpsc_bridge_forwards_events() {
        let bus = InMemoryBus::<&'static str>::new(8);
        let mut rx = to_mpsc(bus.clone(), 8);
        bus.publish("found").await.unwrap();
        assert_eq!(rx.recv().await, Some("found"));
    }
}
