//! # Handle: the unit-facing side of the monitor.
//!
//! Units never touch the registry or the loop directly; they are
//! constructed with a [`Handle`] and call back through it. The handle
//! bundles:
//!
//! - **store helpers** — definition lookups, status publishes, lock
//!   acquire/release — which return store failures to the caller (lock
//!   contention and stale tokens are unit-level concerns, never the
//!   loop's);
//! - **producer spawners** — timers, process waits, readiness polls —
//!   which start ephemeral background tasks feeding the loop's channels.
//!
//! ## Rules
//! - Producers are not cancellable once started; their results are
//!   delivered even if the unit has since been evicted.
//! - Lock/status writes are individually atomic but not transactionally
//!   composed with in-core state: units must treat them as fallible and
//!   independently retryable.
//! - Lock acquisition and release are observed *asynchronously* through
//!   the lock-namespace watch, not synchronously from these calls.

use std::os::fd::OwnedFd;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::error::StoreError;
use crate::events::Bus;
use crate::store::{paths, Cas, Lookup, StoreReader, StoreWriter};
use crate::units::{ExecUnit, ExitStatus, Readyer, Unit};

use super::{poller, reaper, timer};

/// An exit report traveling from a reaper task to the loop.
pub(crate) struct Exit {
    pub unit: Arc<dyn ExecUnit>,
    pub status: ExitStatus,
}

/// A readiness report traveling from a poller task to the loop.
pub(crate) struct Ready {
    pub readyer: Arc<dyn Readyer>,
    pub file: Arc<OwnedFd>,
}

/// Unit-facing accessor bundle; cheap to clone.
#[derive(Clone)]
pub struct Handle {
    node: Arc<str>,
    prefix: Arc<str>,
    reader: Arc<dyn StoreReader>,
    writer: Arc<dyn StoreWriter>,
    clock_tx: mpsc::Sender<Arc<dyn Unit>>,
    exit_tx: mpsc::Sender<Exit>,
    ready_tx: mpsc::Sender<Ready>,
    bus: Bus,
}

impl Handle {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        node: Arc<str>,
        prefix: Arc<str>,
        reader: Arc<dyn StoreReader>,
        writer: Arc<dyn StoreWriter>,
        clock_tx: mpsc::Sender<Arc<dyn Unit>>,
        exit_tx: mpsc::Sender<Exit>,
        ready_tx: mpsc::Sender<Ready>,
        bus: Bus,
    ) -> Self {
        Self {
            node,
            prefix,
            reader,
            writer,
            clock_tx,
            exit_tx,
            ready_tx,
            bus,
        }
    }

    /// This node's identity (the body written into acquired locks).
    pub fn node(&self) -> &str {
        &self.node
    }

    /// The write prefix applied to status and lock paths.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    // ---- Store helpers ----

    /// Reads a definition parameter for a unit (`/mon/def/<id>/<param>`).
    ///
    /// Returns `None` when the parameter is absent or the path is a
    /// directory marker.
    pub async fn lookup_param(&self, id: &str, param: &str) -> Result<Option<String>, StoreError> {
        match self.reader.lookup(&paths::def_path(id, param)).await? {
            Lookup::Value { body, .. } => Ok(Some(body)),
            Lookup::Missing | Lookup::Dir => Ok(None),
        }
    }

    /// Publishes a status parameter (unconditional overwrite).
    pub async fn set_status(&self, id: &str, param: &str, val: &str) -> Result<u64, StoreError> {
        self.writer
            .set(&paths::status_path(&self.prefix, id, param), val, Cas::Clobber)
            .await
    }

    /// Retracts a status parameter (unconditional delete).
    pub async fn del_status(&self, id: &str, param: &str) -> Result<u64, StoreError> {
        self.writer
            .del(&paths::status_path(&self.prefix, id, param), Cas::Clobber)
            .await
    }

    /// Attempts to acquire the cross-node lock for `id` by creating the
    /// lock entry with a must-not-exist precondition.
    ///
    /// A [`StoreError::is_contention`] failure means the lock is held
    /// elsewhere. Acquisition is confirmed asynchronously via the lock
    /// watch, not by this call's success.
    pub async fn try_lock(&self, id: &str) -> Result<u64, StoreError> {
        self.writer
            .set(&paths::lock_path(&self.prefix, id), &self.node, Cas::Missing)
            .await
    }

    /// Releases the lock for `id` with a conditional delete matching a
    /// previously observed CAS token.
    ///
    /// A contention failure means the entry was already mutated or removed
    /// by someone else.
    pub async fn release_lock(&self, id: &str, cas: &str) -> Result<u64, StoreError> {
        self.writer
            .del(
                &paths::lock_path(&self.prefix, id),
                Cas::Token(cas.to_string()),
            )
            .await
    }

    // ---- Producer spawners ----

    /// Schedules a tick for `unit` after `delay`.
    ///
    /// One background task per call; not cancellable. The tick is
    /// delivered even if the unit is evicted in the meantime.
    pub fn schedule(&self, unit: Arc<dyn Unit>, delay: Duration) {
        tokio::spawn(timer::tick_after(unit, delay, self.clock_tx.clone()));
    }

    /// Awaits termination of the child process `pid` and delivers its exit
    /// status to `unit`.
    ///
    /// A wait failure is published as [`EventKind::WaitFailed`](crate::EventKind::WaitFailed)
    /// and the unit is never notified for that pid.
    pub fn await_exit(&self, pid: i32, unit: Arc<dyn ExecUnit>) {
        tokio::spawn(reaper::forward_exit(
            pid,
            unit,
            self.exit_tx.clone(),
            self.bus.clone(),
        ));
    }

    /// Waits for readability across one snapshot of descriptors and
    /// delivers one `ready` callback per ready descriptor.
    ///
    /// Continuous monitoring requires re-invoking `poll` after each batch.
    pub fn poll(&self, files: Vec<Arc<OwnedFd>>, readyer: Arc<dyn Readyer>) {
        tokio::spawn(poller::forward_ready(
            files,
            readyer,
            self.ready_tx.clone(),
            self.bus.clone(),
        ));
    }
}
