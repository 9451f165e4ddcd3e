//! Error types used by the monitor runtime and the store contract.
//!
//! Two enums cover the fallible surfaces:
//!
//! - [`MonitorError`] — errors raised by the monitor runtime itself.
//! - [`StoreError`] — errors returned by store operations; lock contention
//!   and stale CAS tokens surface here and must be interpreted by unit
//!   logic, never by the loop.
//!
//! Both provide `as_label()` for stable snake_case labels in logs/metrics.

use thiserror::Error;

/// # Errors produced by the monitor runtime.
///
/// The loop itself never terminates on a bad event; the only runtime error
/// is a failure during the startup protocol, before the loop begins.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum MonitorError {
    /// Registering a namespace watch failed during startup.
    #[error("watch registration for {glob} failed: {source}")]
    Watch {
        /// The one-level glob whose watch could not be registered.
        glob: String,
        /// The underlying store failure.
        source: StoreError,
    },
}

impl MonitorError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            MonitorError::Watch { .. } => "monitor_watch_failed",
        }
    }
}

/// # Errors produced by store operations.
///
/// Store operations are individually atomic but not transactionally composed
/// with in-core state: callers must treat them as fallible and independently
/// retryable by unit logic, not by the core.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum StoreError {
    /// A write precondition did not hold: the key already existed for a
    /// `Missing` precondition, or the CAS token was stale.
    #[error("cas mismatch at {path}")]
    CasMismatch {
        /// Path of the entry whose precondition failed.
        path: String,
    },

    /// No entry exists at the given path.
    #[error("no entry at {path}")]
    Missing {
        /// Path that was looked up.
        path: String,
    },

    /// Backend-specific failure (connectivity, protocol, ...).
    #[error("store backend: {0}")]
    Backend(String),
}

impl StoreError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            StoreError::CasMismatch { .. } => "store_cas_mismatch",
            StoreError::Missing { .. } => "store_missing",
            StoreError::Backend(_) => "store_backend",
        }
    }

    /// True when the failure signals the entry was concurrently created or
    /// mutated by someone else — for a lock acquire, the lock is held
    /// elsewhere; for a release, the entry was already mutated or removed.
    pub fn is_contention(&self) -> bool {
        matches!(self, StoreError::CasMismatch { .. })
    }
}
