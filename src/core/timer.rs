//! # Timer producer.
//!
//! One ephemeral task per [`Handle::schedule`](crate::Handle::schedule)
//! call: sleep, then report the unit on the tick channel. Not cancellable
//! once started — if the unit has since been evicted, the tick is still
//! delivered and `tick()` is still invoked on the (still-referenced) unit
//! object, which must tolerate a "no longer tracked" tick.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::units::Unit;

/// Sleeps for `delay`, then reports `unit` for ticking.
///
/// The send blocks until the loop consumes it; a send error only means the
/// loop has already exited.
pub(crate) async fn tick_after(
    unit: Arc<dyn Unit>,
    delay: Duration,
    tx: mpsc::Sender<Arc<dyn Unit>>,
) {
    tokio::time::sleep(delay).await;
    let _ = tx.send(unit).await;
}
