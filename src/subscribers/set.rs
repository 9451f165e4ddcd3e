//! # SubscriberSet: non-blocking fan-out over multiple subscribers.
//!
//! [`SubscriberSet`] feeds each monitor event to every registered
//! subscriber through a private bounded queue drained by a dedicated
//! worker task, so a slow or broken subscriber never stalls the loop or
//! its peers.
//!
//! Subscriber failures are themselves monitor events: a panicking
//! subscriber surfaces as [`EventKind::SubscriberPanicked`], a full queue
//! as [`EventKind::SubscriberOverflow`], published on the same bus the
//! set is fed from. Failure reports about the failure kinds themselves are
//! suppressed, so a subscriber that chokes on its own report cannot
//! amplify into a publish storm.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::events::{Bus, Event, EventKind};

use super::Subscribe;

/// One subscriber's queue plus the worker draining it.
struct Feed {
    name: &'static str,
    tx: mpsc::Sender<Arc<Event>>,
    worker: JoinHandle<()>,
}

/// True for the kinds the set itself produces; these never trigger
/// further failure reports.
fn is_feedback(kind: EventKind) -> bool {
    matches!(
        kind,
        EventKind::SubscriberPanicked | EventKind::SubscriberOverflow
    )
}

/// Fan-out of monitor events to registered subscribers.
pub struct SubscriberSet {
    feeds: Vec<Feed>,
    bus: Bus,
}

impl SubscriberSet {
    /// Spawns one worker per subscriber; failure reports go to `bus`.
    pub fn new(subs: Vec<Arc<dyn Subscribe>>, bus: Bus) -> Self {
        let feeds = subs
            .into_iter()
            .map(|sub| spawn_feed(sub, bus.clone()))
            .collect();
        Self { feeds, bus }
    }

    /// Hands one event to every subscriber's queue without waiting.
    ///
    /// A queue with no free slot drops the event for that subscriber and
    /// publishes [`EventKind::SubscriberOverflow`] naming it.
    pub fn emit(&self, event: &Event) {
        let ev = Arc::new(event.clone());
        for feed in &self.feeds {
            if feed.tx.try_send(Arc::clone(&ev)).is_err() && !is_feedback(event.kind) {
                self.bus
                    .publish(Event::new(EventKind::SubscriberOverflow).with_reason(feed.name));
            }
        }
    }

    /// Closes every queue and waits for the workers to drain out.
    pub async fn shutdown(self) {
        for feed in self.feeds {
            drop(feed.tx);
            let _ = feed.worker.await;
        }
    }
}

fn spawn_feed(sub: Arc<dyn Subscribe>, bus: Bus) -> Feed {
    let name = sub.name();
    let (tx, mut rx) = mpsc::channel::<Arc<Event>>(sub.queue_capacity().max(1));
    let worker = tokio::spawn(async move {
        while let Some(ev) = rx.recv().await {
            let delivered = AssertUnwindSafe(sub.on_event(ev.as_ref()))
                .catch_unwind()
                .await;
            if delivered.is_err() && !is_feedback(ev.kind) {
                bus.publish(Event::new(EventKind::SubscriberPanicked).with_reason(sub.name()));
            }
        }
    });
    Feed { name, tx, worker }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;

    struct Recording {
        seen: Mutex<Vec<EventKind>>,
        panic_on: Option<EventKind>,
    }

    impl Recording {
        fn new(panic_on: Option<EventKind>) -> Self {
            Self {
                seen: Mutex::new(Vec::new()),
                panic_on,
            }
        }
    }

    #[async_trait]
    impl Subscribe for Recording {
        async fn on_event(&self, event: &Event) {
            if self.panic_on == Some(event.kind) {
                panic!("refused event");
            }
            self.seen.lock().unwrap().push(event.kind);
        }
        fn name(&self) -> &'static str {
            "recording"
        }
    }

    struct Slow;

    #[async_trait]
    impl Subscribe for Slow {
        async fn on_event(&self, _event: &Event) {
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
        fn name(&self) -> &'static str {
            "slow"
        }
        fn queue_capacity(&self) -> usize {
            1
        }
    }

    #[tokio::test]
    async fn test_panicking_subscriber_is_isolated_and_reported() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let sub = Arc::new(Recording::new(Some(EventKind::UnitCreated)));
        let set = SubscriberSet::new(vec![Arc::clone(&sub) as Arc<dyn Subscribe>], bus.clone());

        set.emit(&Event::new(EventKind::UnitCreated));
        set.emit(&Event::new(EventKind::UnitEvicted));
        // Drains the worker, so both deliveries have been attempted.
        set.shutdown().await;

        assert_eq!(*sub.seen.lock().unwrap(), vec![EventKind::UnitEvicted]);
        let report = rx.recv().await.expect("failure report");
        assert_eq!(report.kind, EventKind::SubscriberPanicked);
        assert_eq!(report.reason.as_deref(), Some("recording"));
    }

    #[tokio::test]
    async fn test_overflowing_queue_drops_and_reports() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let set = SubscriberSet::new(vec![Arc::new(Slow) as Arc<dyn Subscribe>], bus.clone());

        // Capacity 1 and a sleeping worker: the queue is full by the
        // second emit at the latest.
        for _ in 0..4 {
            set.emit(&Event::new(EventKind::UnitCreated));
        }

        let report = rx.recv().await.expect("overflow report");
        assert_eq!(report.kind, EventKind::SubscriberOverflow);
        assert_eq!(report.reason.as_deref(), Some("slow"));
    }
}
