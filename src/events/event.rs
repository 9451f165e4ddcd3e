//! # Runtime events emitted by the monitor loop.
//!
//! [`EventKind`] classifies what happened; [`Event`] carries optional
//! metadata (unit id, command body, failure reason, reference count).
//! The "log and continue" branches of the loop — dropped lock events,
//! unknown unit kinds, failed waits and polls — surface here instead of
//! terminating anything.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases
//! monotonically; use it to restore order when delivery interleaves.

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::SystemTime;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of monitor events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// The loop's cancellation token fired; the loop is exiting.
    ///
    /// Sets: `at`, `seq`.
    ShutdownRequested,

    /// Bootstrap found an existing control entry and injected a synthetic
    /// creation event for it.
    ///
    /// Sets: `unit`, `at`, `seq`.
    BootstrapInjected,

    /// Bootstrap enumeration or lookup failed; remaining entries were
    /// skipped. Live watch delivery is unaffected.
    ///
    /// Sets: `reason`, `at`, `seq`.
    BootstrapFailed,

    /// A unit was created and registered with reference count 1.
    ///
    /// Sets: `unit`, `refs`, `at`, `seq`.
    UnitCreated,

    /// An already-registered unit was resolved again; its reference count
    /// was incremented. Every non-delete control event does this,
    /// regardless of the command it carries.
    ///
    /// Sets: `unit`, `refs`, `at`, `seq`.
    UnitResolved,

    /// A `start` or `stop` command was dispatched to a unit.
    ///
    /// Sets: `unit`, `body`, `at`, `seq`.
    CommandApplied,

    /// A control-entry delete decremented a unit's reference count; the
    /// unit remains registered.
    ///
    /// Sets: `unit`, `refs`, `at`, `seq`.
    UnitReleased,

    /// A unit's reference count dropped to zero: its `stop()` was invoked
    /// once and it was removed from the registry.
    ///
    /// Sets: `unit`, `at`, `seq`.
    UnitEvicted,

    /// A control event named an id with an unknown extension (or a
    /// malformed id); no unit was created.
    ///
    /// Sets: `unit`, `at`, `seq`.
    UnknownUnitKind,

    /// A lock-namespace event arrived for an id with no registered unit
    /// and was dropped without side effects.
    ///
    /// Sets: `unit`, `at`, `seq`.
    LockEventDropped,

    /// A process wait failed; the awaiting exec unit will never receive an
    /// `exited` callback for that pid.
    ///
    /// Sets: `unit`, `reason`, `at`, `seq`.
    WaitFailed,

    /// A descriptor poll failed; no readiness is reported for that
    /// snapshot.
    ///
    /// Sets: `reason`, `at`, `seq`.
    PollFailed,

    /// A subscriber panicked while handling an event; the event was
    /// dropped for that subscriber and its worker keeps running.
    ///
    /// Sets: `reason` (subscriber name), `at`, `seq`.
    SubscriberPanicked,

    /// A subscriber's queue was full; the event was dropped for that
    /// subscriber only.
    ///
    /// Sets: `reason` (subscriber name), `at`, `seq`.
    SubscriberOverflow,
}

/// Monitor event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Unit id, if applicable.
    pub unit: Option<Arc<str>>,
    /// Control command body (`start`, `stop`).
    pub body: Option<Arc<str>>,
    /// Human-readable failure reason.
    pub reason: Option<Arc<str>>,
    /// Reference count after the operation.
    pub refs: Option<i64>,
}

impl Event {
    /// Creates a new event of the given kind with the current timestamp and
    /// the next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            unit: None,
            body: None,
            reason: None,
            refs: None,
        }
    }

    /// Attaches a unit id.
    #[inline]
    pub fn with_unit(mut self, unit: impl Into<Arc<str>>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// Attaches a command body.
    #[inline]
    pub fn with_body(mut self, body: impl Into<Arc<str>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a reference count.
    #[inline]
    pub fn with_refs(mut self, refs: i64) -> Self {
        self.refs = Some(refs);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seq_is_monotonic() {
        let a = Event::new(EventKind::UnitCreated);
        let b = Event::new(EventKind::UnitEvicted);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn test_builder_fields() {
        let ev = Event::new(EventKind::CommandApplied)
            .with_unit("web.service")
            .with_body("start")
            .with_refs(2);
        assert_eq!(ev.kind, EventKind::CommandApplied);
        assert_eq!(ev.unit.as_deref(), Some("web.service"));
        assert_eq!(ev.body.as_deref(), Some("start"));
        assert_eq!(ev.refs, Some(2));
        assert!(ev.reason.is_none());
    }
}
