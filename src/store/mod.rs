//! # Store contract: the replicated key/value collaborator.
//!
//! The monitor treats the distributed store as a given dependency with a
//! documented contract; its consistency/replication protocol is out of
//! scope. Two traits split the capabilities the way the monitor consumes
//! them:
//!
//! - [`StoreReader`] — one-level glob watches, point lookups and directory
//!   listing (bootstrap enumeration, definition reads).
//! - [`StoreWriter`] — conditional set/del with the two precondition
//!   sentinels ([`Cas::Missing`], [`Cas::Clobber`]) plus token-matched
//!   updates ([`Cas::Token`]).
//!
//! ## Contents
//! - [`Cas`], [`StoreEvent`], [`Lookup`] — the wire-facing data model
//! - [`paths`] — namespace constants and path helpers
//! - [`mem`] — a reference in-memory store for tests and demos

pub mod mem;
pub mod paths;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::StoreError;

/// Write precondition for [`StoreWriter::set`] / [`StoreWriter::del`].
///
/// Two sentinels plus an opaque version token:
/// - [`Cas::Clobber`] — no precondition; always succeeds regardless of the
///   current value (unconditional overwrite / delete).
/// - [`Cas::Missing`] — the key must not currently exist; used for
///   exclusive lock acquisition.
/// - [`Cas::Token`] — the key's current version marker must match; used
///   for conditional release of a previously observed entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Cas {
    /// No precondition ("clobber").
    Clobber,
    /// The key must not exist ("missing" precondition).
    Missing,
    /// The key's CAS token must match.
    Token(String),
}

/// A change notification delivered for a watched path.
///
/// Ephemeral: consumed once by the loop, never retained. Bootstrap-injected
/// events carry `seq == 0` and are otherwise indistinguishable from live
/// creation notifications.
#[derive(Clone, Debug)]
pub struct StoreEvent {
    /// Store sequence number of the mutation (0 for injected events).
    pub seq: u64,
    /// Full path of the mutated entry.
    pub path: String,
    /// New body (empty for deletions).
    pub body: String,
    /// CAS token of the entry after the mutation.
    pub cas: String,
    /// True when the entry was removed.
    pub deleted: bool,
}

impl StoreEvent {
    /// True when this event records a deletion.
    #[inline]
    pub fn is_del(&self) -> bool {
        self.deleted
    }
}

/// Result of a point lookup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Lookup {
    /// No entry at this path.
    Missing,
    /// The path is an interior directory marker, not a leaf entry.
    Dir,
    /// A leaf entry with its body and CAS token.
    Value {
        /// Entry body.
        body: String,
        /// CAS token usable as a [`Cas::Token`] precondition.
        cas: String,
    },
}

/// Read-side capabilities the monitor requires from the store.
#[async_trait]
pub trait StoreReader: Send + Sync + 'static {
    /// Registers a watch for a one-level glob (e.g. `/mon/ctl/*`).
    ///
    /// Every subsequent mutation of a matching path is delivered on `tx`,
    /// in mutation order per watch. Delivery must never require the caller
    /// to be actively receiving: a slow consumer delays delivery but must
    /// not block the store's mutators.
    ///
    /// Ordering is guaranteed **per watch only**. Two watches are
    /// delivered independently even when they feed the same channel, so a
    /// consumer of several watches (the monitor watches the control and
    /// lock namespaces together) may observe mutations from different
    /// namespaces out of their global mutation order.
    async fn watch(&self, glob: &str, tx: mpsc::Sender<StoreEvent>) -> Result<(), StoreError>;

    /// Looks up a single path.
    async fn lookup(&self, path: &str) -> Result<Lookup, StoreError>;

    /// Lists the one-level children of a directory path (leaf names only).
    async fn lookup_dir(&self, path: &str) -> Result<Vec<String>, StoreError>;
}

/// Write-side capabilities the monitor requires from the store.
#[async_trait]
pub trait StoreWriter: Send + Sync + 'static {
    /// Writes `body` at `path` subject to the given precondition.
    ///
    /// Returns the store sequence number of the mutation.
    async fn set(&self, path: &str, body: &str, cas: Cas) -> Result<u64, StoreError>;

    /// Deletes the entry at `path` subject to the given precondition.
    ///
    /// Returns the store sequence number of the mutation.
    async fn del(&self, path: &str, cas: Cas) -> Result<u64, StoreError>;
}
