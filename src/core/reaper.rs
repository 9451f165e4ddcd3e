//! # Process reaper producer.
//!
//! One ephemeral task per [`Handle::await_exit`](crate::Handle::await_exit)
//! call: block on the given pid until it terminates, then report the exit
//! status on the exit channel.
//!
//! A failed wait (e.g. no such process) publishes [`EventKind::WaitFailed`]
//! and reports nothing — the exec unit never receives an `exited` callback
//! for that pid. Swallow-and-drop, not retry.

use std::sync::Arc;

use nix::sys::wait::{waitpid, WaitStatus};
use nix::unistd::Pid;
use tokio::sync::mpsc;

use crate::events::{Bus, Event, EventKind};
use crate::units::{ExecUnit, ExitStatus};

use super::handle::Exit;

/// Blocks until `pid` terminates (off the async runtime), then forwards
/// the status to the loop's exit channel.
pub(crate) async fn forward_exit(
    pid: i32,
    unit: Arc<dyn ExecUnit>,
    tx: mpsc::Sender<Exit>,
    bus: Bus,
) {
    let waited = tokio::task::spawn_blocking(move || reap(pid)).await;
    match waited {
        Ok(Ok(status)) => {
            let _ = tx.send(Exit { unit, status }).await;
        }
        Ok(Err(err)) => bus.publish(
            Event::new(EventKind::WaitFailed)
                .with_unit(unit.id())
                .with_reason(err.to_string()),
        ),
        Err(join_err) => bus.publish(
            Event::new(EventKind::WaitFailed)
                .with_unit(unit.id())
                .with_reason(join_err.to_string()),
        ),
    }
}

/// Waits for `pid`, re-waiting through stop/continue notifications until a
/// terminal status arrives.
fn reap(pid: i32) -> Result<ExitStatus, nix::Error> {
    let pid = Pid::from_raw(pid);
    loop {
        match waitpid(pid, None)? {
            WaitStatus::Exited(_, code) => return Ok(ExitStatus::Exited(code)),
            WaitStatus::Signaled(_, signal, _) => {
                return Ok(ExitStatus::Signaled(signal as i32));
            }
            _ => continue,
        }
    }
}
