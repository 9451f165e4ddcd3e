//! # Event subscribers for the monitor runtime.
//!
//! Subscribers are the observability surface: the monitor publishes
//! [`Event`](crate::events::Event)s to its bus, a single listener fans them
//! out to every registered subscriber, and each subscriber processes them
//! on its own worker without ever blocking the loop.
//!
//! ```text
//! Monitor loop ── publish ──► Bus ──► listener ──► SubscriberSet
//!                              ▲                  ┌─────┼─────┐
//!                              │ failure reports  ▼     ▼     ▼
//!                              └───────────── LogWriter metrics custom
//! ```
//!
//! A misbehaving subscriber (panic, full queue) is reported back onto the
//! bus as an event rather than silently dropped, so observers can watch
//! the observability layer itself.

mod log;
mod set;
mod subscribe;

pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;
