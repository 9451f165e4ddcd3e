//! # unitmon
//!
//! **unitmon** is the node-local reconciliation loop of a distributed process
//! supervisor. It watches a replicated, strongly-consistent key/value store
//! for declarative control intents ("this unit should be running / stopped")
//! and drives local units — operating-system processes and activation
//! sockets — to match.
//!
//! ## Architecture
//! ```text
//!            replicated store (external)
//!     /mon/ctl/*  /lock/*        /mon/def  /mon/status
//!         │watch     │watch          ▲ read    ▲ write
//!         ▼          ▼               │         │
//! ┌───────────────────────────────────────────────────────────┐
//! │  Monitor (event loop — the single serialization point)    │
//! │  - Registry (unit map + reference counts, loop-owned)     │
//! │  - KindSet (unit factories keyed by id extension)         │
//! │  - Bus (broadcast events) ──► SubscriberSet ──► LogWriter │
//! └──────┬──────────────┬──────────────┬──────────────────────┘
//!        │ tick chan    │ exit chan    │ ready chan
//! ┌──────┴─────┐  ┌─────┴──────┐  ┌────┴───────┐
//! │   Timer    │  │   Reaper   │  │   Poller   │   (ephemeral
//! │  (sleep)   │  │ (waitpid)  │  │ (poll(2))  │    producers)
//! └────────────┘  └────────────┘  └────────────┘
//! ```
//!
//! The loop is the only reader and the only writer of registry state. The
//! three producers and the store watches only ever *send* into channels the
//! loop owns; all genuinely blocking work (sleeping, waiting on a child
//! process, multiplexed descriptor waits) happens in short-lived background
//! tasks so the loop's responsiveness is never hostage to a single slow
//! unit's I/O.
//!
//! ## Event classes
//! The loop multiplexes four event classes with no priority ordering between
//! them:
//! 1. **Tick** — a scheduled timer fired for a unit → [`Unit::tick`].
//! 2. **Store event** (control or lock namespace) — resolve/create/release
//!    units and dispatch `start`/`stop` intents, or forward lock changes.
//! 3. **Exit** — a child process terminated → [`ExecUnit::exited`].
//! 4. **Ready** — a watched descriptor became readable → [`Readyer::ready`].
//!
//! ## Startup protocol
//! Watches on the control and lock namespaces are registered *before*
//! anything else, so no live change is missed. A concurrent bootstrap task
//! then enumerates existing control entries and injects synthetic creation
//! events for them. Because injection runs concurrently with live watch
//! delivery, a control entry may be observed **twice**, in either order —
//! unit implementations of [`Unit::start`] and [`Unit::stop`] are required
//! to be idempotent against duplicate invocation.
//!
//! ## Example
//! ```no_run
//! use std::sync::Arc;
//! use unitmon::{MemStore, MonitorBuilder, MonitorConfig};
//!
//! # struct ServiceKind;
//! # impl unitmon::UnitKind for ServiceKind {
//! #     fn build(&self, _id: &unitmon::UnitId, _h: unitmon::Handle) -> Arc<dyn unitmon::Unit> {
//! #         unimplemented!()
//! #     }
//! # }
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(MemStore::new());
//!     let monitor = MonitorBuilder::new(MonitorConfig::default(), store.clone(), store)
//!         .register_kind("service", Arc::new(ServiceKind))
//!         .build();
//!     monitor.run_until_signalled().await?;
//!     Ok(())
//! }
//! ```

mod config;
mod core;
mod error;
mod events;
mod store;
mod subscribers;
mod units;

// ---- Public re-exports ----

pub use config::MonitorConfig;
pub use core::{Handle, Monitor, MonitorBuilder};
pub use error::{MonitorError, StoreError};
pub use events::{Bus, Event, EventKind};
pub use store::mem::MemStore;
pub use store::{paths, Cas, Lookup, StoreEvent, StoreReader, StoreWriter};
pub use subscribers::{LogWriter, Subscribe, SubscriberSet};
pub use units::{ExecUnit, ExitStatus, Readyer, Unit, UnitId, UnitKind};
