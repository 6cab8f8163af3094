//! Bounded, lossy broadcast of [`ChangeEvent`]s.

use super::ChangeEvent;
use log::{debug, warn};
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};

/// Buffer size used when no configuration overrides it.
pub const DEFAULT_EVENT_BUFFER_CAPACITY: usize = 100;

/// Multi-consumer event channel.
///
/// When a subscriber falls more than the buffer capacity behind, its oldest
/// unread events are dropped; publishing never blocks.
#[derive(Debug, Clone)]
pub struct ChangeBus {
    sender: broadcast::Sender<ChangeEvent>,
}

impl ChangeBus {
    /// Creates a bus buffering at least `capacity` events (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn publish(&self, event: ChangeEvent) {
        if self.sender.send(event).is_err() {
            debug!(
                "event=change_publish module=events status=ok subscribers=0 change={}",
                event.name()
            );
        }
    }

    pub fn publish_all(&self, events: impl IntoIterator<Item = ChangeEvent>) {
        for event in events {
            self.publish(event);
        }
    }

    /// Subscribes to events published from now on; history is not replayed.
    pub fn subscribe(&self) -> ChangeSubscription {
        ChangeSubscription {
            receiver: self.sender.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ChangeBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_CAPACITY)
    }
}

/// One independent reader of a [`ChangeBus`].
///
/// When the reader fell behind and events were dropped, it yields one
/// [`ChangeEvent::Unknown`] in their place before the events still held in
/// the buffer, so consumers fall back to a full reload.
#[derive(Debug)]
pub struct ChangeSubscription {
    receiver: broadcast::Receiver<ChangeEvent>,
}

impl ChangeSubscription {
    /// Returns the next buffered event without waiting.
    pub fn try_next(&mut self) -> Option<ChangeEvent> {
        match self.receiver.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Lagged(skipped)) => Some(lagged(skipped)),
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => None,
        }
    }

    /// Takes every currently buffered event.
    pub fn drain(&mut self) -> Vec<ChangeEvent> {
        std::iter::from_fn(|| self.try_next()).collect()
    }

    /// Waits on the current thread for the next event.
    ///
    /// Returns `None` once every bus handle is dropped. Must not be called
    /// from inside an async runtime.
    pub fn next_blocking(&mut self) -> Option<ChangeEvent> {
        match self.receiver.blocking_recv() {
            Ok(event) => Some(event),
            Err(RecvError::Lagged(skipped)) => Some(lagged(skipped)),
            Err(RecvError::Closed) => None,
        }
    }

    /// Waits asynchronously for the next event.
    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        match self.receiver.recv().await {
            Ok(event) => Some(event),
            Err(RecvError::Lagged(skipped)) => Some(lagged(skipped)),
            Err(RecvError::Closed) => None,
        }
    }
}

fn lagged(skipped: u64) -> ChangeEvent {
    warn!("event=change_subscription module=events status=lagged dropped={skipped}");
    ChangeEvent::Unknown
}
