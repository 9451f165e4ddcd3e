//! # Unit abstractions: the supervised entities.
//!
//! A [`Unit`] is the thing being supervised — a service process, an
//! activation socket, or anything else registered through a [`UnitKind`]
//! factory. The monitor drives units through a fixed capability set and
//! units call back into the monitor through their
//! [`Handle`](crate::Handle).
//!
//! ## Capability traits
//! - [`Unit`] — `dispatch_lock_event` / `start` / `stop` / `tick`
//! - [`ExecUnit`] — a unit additionally notified of child-process
//!   termination via `exited`
//! - [`Readyer`] — any entity (unit or sub-component) notified when a
//!   watched descriptor becomes readable
//!
//! ## Rules
//! - All invocations happen strictly on the loop's task — never
//!   concurrently. Units still need interior mutability for their own state
//!   (the registry hands out `Arc`s), but they never race with themselves.
//! - `start()`/`stop()` must be **idempotent**: bootstrap injection and live
//!   watch delivery can observe the same control entry twice, in either
//!   order. This is a required property of all units, not an optimization.
//! - Timer, reaper and poller results are not cancellable: every unit
//!   method must be safe to invoke on a unit the registry no longer tracks.

mod id;

use std::collections::HashMap;
use std::os::fd::OwnedFd;
use std::sync::Arc;

use async_trait::async_trait;

use crate::core::Handle;
use crate::store::StoreEvent;

pub use id::UnitId;

/// Exit status of a reaped child process.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExitStatus {
    /// Process exited normally with the given code.
    Exited(i32),
    /// Process was terminated by the given signal.
    Signaled(i32),
}

impl ExitStatus {
    /// True for a normal exit with code 0.
    pub fn success(self) -> bool {
        matches!(self, ExitStatus::Exited(0))
    }
}

/// # A supervised entity driven by the monitor loop.
///
/// Implementations are constructed by a registered [`UnitKind`] and owned
/// exclusively by the registry; background producers hold transient `Arc`
/// references inside their in-flight closures.
#[async_trait]
pub trait Unit: Send + Sync + 'static {
    /// The unit's identifier (`<name>.<extension>`).
    fn id(&self) -> &str;

    /// A lock-namespace entry for this unit changed.
    async fn dispatch_lock_event(&self, ev: StoreEvent);

    /// A `start` intent arrived. Must be idempotent.
    async fn start(&self);

    /// A `stop` intent arrived, or the unit was evicted from the registry.
    /// Must be idempotent.
    async fn stop(&self);

    /// A previously scheduled timer fired. May arrive after eviction; the
    /// implementation must tolerate a "no longer tracked" tick.
    async fn tick(&self);

    /// Narrows this unit to its exec capability, if it has one.
    ///
    /// Exec-capable units override this with `Some(self)`.
    fn as_exec(self: Arc<Self>) -> Option<Arc<dyn ExecUnit>> {
        None
    }
}

/// A [`Unit`] additionally notified of child-process termination.
#[async_trait]
pub trait ExecUnit: Unit {
    /// The unit's child process terminated with the given status.
    async fn exited(&self, status: ExitStatus);
}

/// Any entity notified when a watched descriptor becomes readable.
#[async_trait]
pub trait Readyer: Send + Sync + 'static {
    /// The given descriptor was found readable by a poll.
    async fn ready(&self, file: Arc<OwnedFd>);
}

/// Factory for one unit kind, registered under an id extension.
///
/// Replaces string-switch construction with a registry resolved at unit
/// construction time: the monitor looks the extension up in its
/// [`KindSet`] and calls `build` exactly once per unit instance.
pub trait UnitKind: Send + Sync + 'static {
    /// Constructs the unit for `id`, wiring it to the monitor via `handle`.
    fn build(&self, id: &UnitId, handle: Handle) -> Arc<dyn Unit>;
}

/// Unit factories keyed by id extension.
#[derive(Default)]
pub struct KindSet {
    kinds: HashMap<String, Arc<dyn UnitKind>>,
}

impl KindSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a factory for the given extension, replacing any previous
    /// registration for it.
    pub fn register(&mut self, ext: impl Into<String>, kind: Arc<dyn UnitKind>) {
        self.kinds.insert(ext.into(), kind);
    }

    /// Builds a unit for `id`, or `None` when its extension is unknown or
    /// the id is malformed (empty extension).
    pub fn build(&self, id: &UnitId, handle: Handle) -> Option<Arc<dyn Unit>> {
        let ext = id.ext();
        if ext.is_empty() {
            return None;
        }
        self.kinds.get(ext).map(|kind| kind.build(id, handle))
    }
}
