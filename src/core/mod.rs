//! Runtime core: the event loop and its supporting pieces.
//!
//! Internal modules:
//! - [`monitor`]: the loop itself — startup protocol, four-way multiplex,
//!   control/lock dispatch;
//! - [`registry`]: unit map with reference counting (loop-owned, no locks);
//! - [`handle`]: the unit-facing accessor bundle (store helpers + producer
//!   spawners);
//! - [`timer`] / [`reaper`] / [`poller`]: ephemeral background producers;
//! - [`shutdown`]: cross-platform OS signal helper for
//!   [`Monitor::run_until_signalled`].

mod handle;
mod monitor;
mod poller;
mod reaper;
mod registry;
mod shutdown;
mod timer;

pub use handle::Handle;
pub use monitor::{Monitor, MonitorBuilder};
