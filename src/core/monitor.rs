//! # Monitor: the node-local reconciliation loop.
//!
//! The [`Monitor`] is the single serialization point of the whole system.
//! It owns the unit registry outright, multiplexes four event classes over
//! loop-owned channels, and is the only task that ever invokes unit
//! methods — that exclusive ownership is the sole synchronization
//! mechanism; no lock protects registry state.
//!
//! ## High-level flow
//! ```text
//! MonitorBuilder::build()
//!   - Bus, SubscriberSet, Handle (senders), Registry, KindSet
//!
//! Monitor::run(token):
//!   1. spawn subscriber listener   (Bus ─► SubscriberSet::emit)
//!   2. watch /mon/ctl/* and /lock/*  — BEFORE anything else
//!   3. spawn bootstrap             (list ctl dir ─► inject synthetic events)
//!   4. loop select! {
//!        tick     ─► unit.tick()
//!        store ev ─► control dispatch / lock dispatch
//!        exit     ─► exec.exited(status)
//!        ready    ─► readyer.ready(file)
//!        token    ─► publish ShutdownRequested, break
//!      }
//! ```
//!
//! ## Control dispatch
//! For a control-namespace event on leaf `id`:
//! - delete → decrement-and-possibly-evict (eviction stops the unit once);
//! - otherwise resolve-or-create (incrementing the reference count on
//!   **every** non-delete event, whatever the command — repeated `stop`
//!   commands accumulate references; only deletes decrement), then
//!   dispatch `start`/`stop` on the body; `auto`, an empty body or any
//!   other value is a pure presence bump with no behavioral dispatch.
//!
//! Lock-namespace events for ids with no registered unit are dropped
//! without side effects. No error from any dispatch is fatal to the loop.
//!
//! ## Rules
//! - Events are processed strictly one at a time; relative order *across*
//!   the four classes is unspecified.
//! - Channels to the loop hold a single slot: a producer's final delivery
//!   blocks until the loop consumes it, so a slow loop delays but never
//!   drops.
//! - The loop exits only through its cancellation token.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;

use crate::config::MonitorConfig;
use crate::error::MonitorError;
use crate::events::{Bus, Event, EventKind};
use crate::store::{paths, Lookup, StoreEvent, StoreReader, StoreWriter};
use crate::subscribers::{Subscribe, SubscriberSet};
use crate::units::{KindSet, UnitId, UnitKind};

use super::handle::{Exit, Handle, Ready};
use super::registry::{Decref, Registry};
use super::shutdown;

/// Producer channels hold one slot each: delivery blocks until the loop
/// consumes, so producers rendezvous with the loop instead of queueing.
const CHANNEL_CAPACITY: usize = 1;

/// Builder for constructing a [`Monitor`].
pub struct MonitorBuilder {
    cfg: MonitorConfig,
    reader: Arc<dyn StoreReader>,
    writer: Arc<dyn StoreWriter>,
    kinds: KindSet,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl MonitorBuilder {
    /// Creates a builder over the given store capabilities.
    pub fn new(
        cfg: MonitorConfig,
        reader: Arc<dyn StoreReader>,
        writer: Arc<dyn StoreWriter>,
    ) -> Self {
        Self {
            cfg,
            reader,
            writer,
            kinds: KindSet::new(),
            subscribers: Vec::new(),
        }
    }

    /// Registers a unit factory under an id extension (`service`,
    /// `socket`, ...). Control events for ids with unregistered
    /// extensions resolve to no unit.
    pub fn register_kind(mut self, ext: impl Into<String>, kind: Arc<dyn UnitKind>) -> Self {
        self.kinds.register(ext, kind);
        self
    }

    /// Sets event subscribers for observability.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Builds the monitor, wiring channels, bus and handle.
    pub fn build(self) -> Monitor {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let subs = SubscriberSet::new(self.subscribers, bus.clone());

        let (clock_tx, clock_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (exit_tx, exit_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (ready_tx, ready_rx) = mpsc::channel(CHANNEL_CAPACITY);

        let handle = Handle::new(
            Arc::from(self.cfg.node.as_str()),
            Arc::from(self.cfg.prefix.as_str()),
            Arc::clone(&self.reader),
            Arc::clone(&self.writer),
            clock_tx,
            exit_tx,
            ready_tx,
            bus.clone(),
        );

        Monitor {
            reader: self.reader,
            bus,
            subs,
            handle,
            registry: Registry::new(),
            kinds: self.kinds,
            clock_rx,
            exit_rx,
            ready_rx,
        }
    }
}

/// The node-local reconciliation loop (see module docs).
pub struct Monitor {
    reader: Arc<dyn StoreReader>,
    bus: Bus,
    subs: SubscriberSet,
    handle: Handle,
    registry: Registry,
    kinds: KindSet,
    clock_rx: mpsc::Receiver<Arc<dyn crate::units::Unit>>,
    exit_rx: mpsc::Receiver<Exit>,
    ready_rx: mpsc::Receiver<Ready>,
}

impl Monitor {
    /// The unit-facing accessor bundle. Clone freely; units receive one at
    /// construction time.
    pub fn handle(&self) -> Handle {
        self.handle.clone()
    }

    /// The monitor's event bus, for subscribing out-of-band observers.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Runs the loop until `token` is cancelled.
    ///
    /// Startup protocol: watches on the control and lock namespaces are
    /// registered first, so no live change is missed; bootstrap injection
    /// of pre-existing control entries then runs concurrently with live
    /// watch delivery — an entry may be observed twice, in either order.
    pub async fn run(self, token: CancellationToken) -> Result<(), MonitorError> {
        let Monitor {
            reader,
            bus,
            subs,
            handle,
            registry,
            kinds,
            mut clock_rx,
            mut exit_rx,
            mut ready_rx,
        } = self;

        // The listener gets its own token, cancelled by the loop only
        // after the final publish, so `ShutdownRequested` is in the
        // broadcast ring before the listener starts draining down.
        let listener_token = CancellationToken::new();
        spawn_subscriber_listener(&bus, subs, listener_token.clone());

        // Watch registration precedes bootstrap enumeration; ordering
        // matters for the no-missed-change guarantee.
        let (event_tx, mut event_rx) = mpsc::channel::<StoreEvent>(CHANNEL_CAPACITY);
        for glob in [paths::ctl_glob(), paths::lock_glob()] {
            reader
                .watch(&glob, event_tx.clone())
                .await
                .map_err(|source| MonitorError::Watch { glob, source })?;
        }
        tokio::spawn(inject_existing(
            Arc::clone(&reader),
            event_tx,
            bus.clone(),
        ));

        let mut state = LoopState {
            registry,
            kinds,
            handle,
            bus,
        };

        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    state.bus.publish(Event::new(EventKind::ShutdownRequested));
                    break;
                }
                Some(unit) = clock_rx.recv() => unit.tick().await,
                Some(ev) = event_rx.recv() => state.dispatch(ev).await,
                Some(exit) = exit_rx.recv() => exit.unit.exited(exit.status).await,
                Some(ready) = ready_rx.recv() => ready.readyer.ready(ready.file).await,
            }
        }
        listener_token.cancel();
        Ok(())
    }

    /// Runs the loop until the process receives a termination signal.
    pub async fn run_until_signalled(self) -> Result<(), MonitorError> {
        let token = CancellationToken::new();
        let signal_token = token.clone();
        tokio::spawn(async move {
            // If signal registration fails we simply never self-cancel.
            if shutdown::wait_for_shutdown_signal().await.is_ok() {
                signal_token.cancel();
            }
        });
        self.run(token).await
    }
}

/// Loop-owned mutable state; every unit invocation goes through here, on
/// the loop's task only.
struct LoopState {
    registry: Registry,
    kinds: KindSet,
    handle: Handle,
    bus: Bus,
}

impl LoopState {
    async fn dispatch(&mut self, ev: StoreEvent) {
        let (dir, leaf) = paths::split_path(&ev.path);
        let id = leaf.to_string();
        match dir {
            paths::CTL_DIR => self.control_event(&id, ev).await,
            paths::LOCK_DIR => self.lock_event(&id, ev).await,
            // Foreign namespace: not ours, ignore.
            _ => {}
        }
    }

    async fn control_event(&mut self, id: &str, ev: StoreEvent) {
        if ev.is_del() {
            self.release(id).await;
            return;
        }

        let uid = UnitId::new(id);
        let kinds = &self.kinds;
        let handle = self.handle.clone();
        let resolved = self
            .registry
            .resolve_or_create(id, || kinds.build(&uid, handle));
        let Some(res) = resolved else {
            self.bus
                .publish(Event::new(EventKind::UnknownUnitKind).with_unit(id));
            return;
        };

        let kind = if res.created {
            EventKind::UnitCreated
        } else {
            EventKind::UnitResolved
        };
        self.bus
            .publish(Event::new(kind).with_unit(id).with_refs(res.refs));

        match ev.body.as_str() {
            "start" => {
                self.bus.publish(
                    Event::new(EventKind::CommandApplied)
                        .with_unit(id)
                        .with_body("start"),
                );
                res.unit.start().await;
            }
            "stop" => {
                self.bus.publish(
                    Event::new(EventKind::CommandApplied)
                        .with_unit(id)
                        .with_body("stop"),
                );
                res.unit.stop().await;
            }
            // "auto", empty, or anything else: a pure presence/refcount
            // bump with no behavioral dispatch.
            _ => {}
        }
    }

    async fn lock_event(&mut self, id: &str, ev: StoreEvent) {
        match self.registry.get(id) {
            Some(unit) => unit.dispatch_lock_event(ev).await,
            None => self
                .bus
                .publish(Event::new(EventKind::LockEventDropped).with_unit(id)),
        }
    }

    async fn release(&mut self, id: &str) {
        match self.registry.decref(id) {
            Decref::Absent => {}
            Decref::Retained(refs) => self.bus.publish(
                Event::new(EventKind::UnitReleased)
                    .with_unit(id)
                    .with_refs(refs),
            ),
            Decref::Evicted(unit) => {
                unit.stop().await;
                self.bus
                    .publish(Event::new(EventKind::UnitEvicted).with_unit(id));
            }
        }
    }
}

/// Bootstrap: enumerate current control entries and inject a synthetic
/// creation event for every leaf value, concurrently with live delivery.
async fn inject_existing(reader: Arc<dyn StoreReader>, tx: mpsc::Sender<StoreEvent>, bus: Bus) {
    let ids = match reader.lookup_dir(paths::CTL_KEY).await {
        Ok(ids) => ids,
        Err(err) => {
            bus.publish(Event::new(EventKind::BootstrapFailed).with_reason(err.to_string()));
            return;
        }
    };

    for id in ids {
        let path = paths::ctl_path(&id);
        match reader.lookup(&path).await {
            // Directory markers and vanished entries are skipped.
            Ok(Lookup::Value { body, cas }) => {
                bus.publish(Event::new(EventKind::BootstrapInjected).with_unit(id.as_str()));
                let injected = StoreEvent {
                    seq: 0,
                    path,
                    body,
                    cas,
                    deleted: false,
                };
                if tx.send(injected).await.is_err() {
                    return;
                }
            }
            Ok(Lookup::Dir | Lookup::Missing) => {}
            Err(err) => {
                bus.publish(Event::new(EventKind::BootstrapFailed).with_reason(err.to_string()));
                return;
            }
        }
    }
}

/// Forwards bus events to the subscriber set until cancellation, then
/// drains the set's worker queues. Events already in the broadcast ring at
/// cancellation time are still handed over.
fn spawn_subscriber_listener(bus: &Bus, subs: SubscriberSet, token: CancellationToken) {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    loop {
                        match rx.try_recv() {
                            Ok(ev) => subs.emit(&ev),
                            Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                            Err(_) => break,
                        }
                    }
                    break;
                }
                msg = rx.recv() => match msg {
                    Ok(ev) => subs.emit(&ev),
                    Err(broadcast::error::RecvError::Closed) => break,
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                },
            }
        }
        subs.shutdown().await;
    });
}
