//! # Readiness poller producer.
//!
//! One ephemeral task per [`Handle::poll`](crate::Handle::poll) call:
//! block in `poll(2)` across the descriptor snapshot with no timeout, then
//! report every ready descriptor on the ready channel — a single poll may
//! emit multiple reports. A poll error publishes
//! [`EventKind::PollFailed`] and emits nothing.
//!
//! Each call covers one snapshot; continuous monitoring requires the
//! caller to re-invoke `poll` after handling each readiness batch.

use std::os::fd::{AsFd, OwnedFd};
use std::sync::Arc;

use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use tokio::sync::mpsc;

use crate::events::{Bus, Event, EventKind};
use crate::units::Readyer;

use super::handle::Ready;

/// Blocks until at least one descriptor is readable (off the async
/// runtime), then forwards one report per ready descriptor.
pub(crate) async fn forward_ready(
    files: Vec<Arc<OwnedFd>>,
    readyer: Arc<dyn Readyer>,
    tx: mpsc::Sender<Ready>,
    bus: Bus,
) {
    if files.is_empty() {
        return;
    }

    let snapshot = files.clone();
    let polled = tokio::task::spawn_blocking(move || wait_readable(&snapshot)).await;
    match polled {
        Ok(Ok(ready)) => {
            for idx in ready {
                if let Some(file) = files.get(idx) {
                    let _ = tx
                        .send(Ready {
                            readyer: Arc::clone(&readyer),
                            file: Arc::clone(file),
                        })
                        .await;
                }
            }
        }
        Ok(Err(err)) => {
            bus.publish(Event::new(EventKind::PollFailed).with_reason(err.to_string()));
        }
        Err(join_err) => {
            bus.publish(Event::new(EventKind::PollFailed).with_reason(join_err.to_string()));
        }
    }
}

/// Multiplexed readiness wait with no timeout; returns the indices of
/// every descriptor the kernel reported ready.
fn wait_readable(files: &[Arc<OwnedFd>]) -> Result<Vec<usize>, nix::Error> {
    let mut fds: Vec<PollFd> = files
        .iter()
        .map(|f| PollFd::new(f.as_fd(), PollFlags::POLLIN))
        .collect();
    poll(&mut fds, PollTimeout::NONE)?;
    Ok(fds
        .iter()
        .enumerate()
        .filter(|(_, fd)| fd.revents().is_some_and(|r| !r.is_empty()))
        .map(|(idx, _)| idx)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::os::unix::net::UnixStream;

    #[test]
    fn test_wait_readable_reports_every_ready_descriptor() {
        let (mut w1, r1) = UnixStream::pair().expect("pair");
        let (mut w2, r2) = UnixStream::pair().expect("pair");
        w1.write_all(b"x").expect("write");
        w2.write_all(b"y").expect("write");

        let files: Vec<Arc<OwnedFd>> =
            vec![Arc::new(OwnedFd::from(r1)), Arc::new(OwnedFd::from(r2))];
        let ready = wait_readable(&files).expect("poll");
        assert_eq!(ready, vec![0, 1]);
    }

    #[test]
    fn test_wait_readable_reports_only_ready_descriptors() {
        let (mut w1, r1) = UnixStream::pair().expect("pair");
        let (_w2, r2) = UnixStream::pair().expect("pair");
        w1.write_all(b"x").expect("write");

        let files: Vec<Arc<OwnedFd>> =
            vec![Arc::new(OwnedFd::from(r1)), Arc::new(OwnedFd::from(r2))];
        let ready = wait_readable(&files).expect("poll");
        assert_eq!(ready, vec![0]);
    }
}
