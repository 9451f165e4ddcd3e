//! # Subscriber contract.
//!
//! A [`Subscribe`] implementation observes the monitor's event stream:
//! unit lifecycle, dropped events, producer failures. Each subscriber is
//! fed through its own bounded queue by the
//! [`SubscriberSet`](super::SubscriberSet), so implementations may be
//! arbitrarily slow without holding up the loop — at the price of dropped
//! events once their queue fills (reported as
//! [`EventKind::SubscriberOverflow`](crate::EventKind::SubscriberOverflow)).

use async_trait::async_trait;

use crate::events::Event;

/// An observer of monitor events.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Observes one event. Invoked sequentially per subscriber, in queue
    /// order; a panic here drops the event for this subscriber only.
    async fn on_event(&self, event: &Event);

    /// Name used in failure reports about this subscriber.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Queue depth before events start being dropped for this subscriber.
    fn queue_capacity(&self) -> usize {
        256
    }
}
