//! # Event bus for broadcasting monitor events.
//!
//! [`Bus`] is a thin wrapper around [`tokio::sync::broadcast`] that lets
//! the loop and its background producers publish without blocking.
//!
//! ## Rules
//! - **Non-blocking publish**: `publish()` never blocks; it calls
//!   `broadcast::Sender::send`.
//! - **Bounded capacity**: a single ring buffer stores recent events for
//!   all receivers; receivers that fall behind observe
//!   `RecvError::Lagged(n)` and skip the `n` oldest items.
//! - **No persistence**: events are lost if no subscriber is active at
//!   send time.
//! - **Self-describing failures**: the subscriber machinery publishes its
//!   own failure reports here ([`SubscriberPanicked`][p] /
//!   [`SubscriberOverflow`][o]), so a bus receiver sees subscriber health
//!   alongside unit lifecycle.
//!
//! [p]: crate::EventKind::SubscriberPanicked
//! [o]: crate::EventKind::SubscriberOverflow

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast channel for monitor events.
///
/// Cheap to clone (internally holds an `Arc`-backed sender); multiple
/// publishers may publish concurrently.
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a new bus with the given channel capacity (min 1, clamped).
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel::<Event>(capacity.max(1));
        Self { tx }
    }

    /// Publishes an event to all active subscribers.
    ///
    /// If there are no receivers the event is dropped; publishing still
    /// returns immediately.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Creates a new receiver observing subsequent events.
    ///
    /// Each call creates an independent receiver that only sees events
    /// sent after it subscribes.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}
