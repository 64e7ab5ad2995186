//! Typed publish/subscribe bus.
//!
//! SDK adapters and UI components publish [`chatkit_core::ChatEvent`]s; views
//! consume them through a [`Subscription`]. Subscriptions are scoped: dropping
//! one unsubscribes, so a view cannot leak its listener by forgetting to
//! remove it.

use tokio::sync::broadcast::{
    self,
    error::{RecvError, TryRecvError},
};

/// Default number of events buffered per subscriber.
pub const DEFAULT_CAPACITY: usize = 256;

/// Broadcast bus for events of type `E`.
///
/// Cloning the bus yields another handle to the same channel.
#[derive(Debug, Clone)]
pub struct EventBus<E: Clone> {
    sender: broadcast::Sender<E>,
}

impl<E: Clone> Default for EventBus<E> {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl<E: Clone> EventBus<E> {
    /// Create a bus buffering up to `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish `event` to every live subscriber.
    ///
    /// Returns the number of subscribers that will see it. Publishing with no
    /// subscribers is not an error.
    pub fn publish(&self, event: impl Into<E>) -> usize {
        self.sender.send(event.into()).unwrap_or(0)
    }

    /// Subscribe to events published from now on.
    pub fn subscribe(&self, label: &'static str) -> Subscription<E> {
        tracing::trace!(label, "subscribed");
        Subscription { label, receiver: self.sender.subscribe() }
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// Live subscription to an [`EventBus`]. Unsubscribes on drop.
#[derive(Debug)]
pub struct Subscription<E: Clone> {
    label: &'static str,
    receiver: broadcast::Receiver<E>,
}

impl<E: Clone> Subscription<E> {
    /// Name used in logs.
    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Take every event published since the last call, without waiting.
    ///
    /// If the subscriber fell behind, skipped events are logged and the
    /// remaining ones are returned.
    pub fn drain(&mut self) -> Vec<E> {
        let mut events = Vec::new();
        loop {
            match self.receiver.try_recv() {
                Ok(event) => events.push(event),
                Err(TryRecvError::Lagged(skipped)) => {
                    tracing::warn!(label = self.label, skipped, "subscriber lagged, events lost");
                },
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }
        events
    }

    /// Wait for the next event. `None` once every publisher is gone.
    pub async fn recv(&mut self) -> Option<E> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(label = self.label, skipped, "subscriber lagged, events lost");
                },
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

impl<E: Clone> Drop for Subscription<E> {
    fn drop(&mut self) {
        tracing::trace!(label = self.label, "unsubscribed");
    }
}
