//! # Simple logging subscriber for debugging and demos.
//!
//! [`LogWriter`] prints events to stdout in a human-readable format.
//!
//! ## Output format
//! ```text
//! [created] unit=web.service refs=1
//! [command] unit=web.service body=start
//! [released] unit=web.service refs=1
//! [evicted] unit=web.service
//! [lock-dropped] unit=ghost.service
//! [wait-failed] unit=web.service err="ECHILD: No child processes"
//! [shutdown-requested]
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};

use super::Subscribe;

/// Simple stdout logging subscriber.
///
/// Prints human-readable event descriptions for debugging and
/// demonstration purposes. Not intended for production use — implement a
/// custom [`Subscribe`] for structured logging or metrics collection.
pub struct LogWriter;

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let unit = e.unit.as_deref().unwrap_or("?");
        match e.kind {
            EventKind::ShutdownRequested => println!("[shutdown-requested]"),
            EventKind::BootstrapInjected => println!("[injected] unit={unit}"),
            EventKind::BootstrapFailed => {
                println!("[bootstrap-failed] err={:?}", e.reason)
            }
            EventKind::UnitCreated => {
                println!("[created] unit={unit} refs={:?}", e.refs)
            }
            EventKind::UnitResolved => {
                println!("[resolved] unit={unit} refs={:?}", e.refs)
            }
            EventKind::CommandApplied => {
                println!("[command] unit={unit} body={:?}", e.body)
            }
            EventKind::UnitReleased => {
                println!("[released] unit={unit} refs={:?}", e.refs)
            }
            EventKind::UnitEvicted => println!("[evicted] unit={unit}"),
            EventKind::UnknownUnitKind => println!("[unknown-kind] unit={unit}"),
            EventKind::LockEventDropped => println!("[lock-dropped] unit={unit}"),
            EventKind::WaitFailed => {
                println!("[wait-failed] unit={unit} err={:?}", e.reason)
            }
            EventKind::PollFailed => println!("[poll-failed] err={:?}", e.reason),
            EventKind::SubscriberPanicked => {
                println!("[subscriber-panicked] sub={:?}", e.reason)
            }
            EventKind::SubscriberOverflow => {
                println!("[subscriber-overflow] sub={:?}", e.reason)
            }
        }
    }

    fn name(&self) -> &'static str {
        "log_writer"
    }
}
