//! # Unit registry: reference-counted unit ownership.
//!
//! The registry maps unit ids to instantiated units plus a reference
//! count. It is owned by the loop and mutated only from the loop's task —
//! that exclusive ownership is the sole synchronization mechanism; no lock
//! protects it.
//!
//! ## Rules
//! - At most one unit instance exists per id at any time; a new instance
//!   is created only when none is registered.
//! - Counts never go negative in the registry: dropping below 1 removes
//!   the slot entirely.
//! - Eviction drops the *registry's* reference only. In-flight producers
//!   may still hold the `Arc` and will deliver to the evicted unit.
//! - Stopping an evicted unit is the caller's job (the loop awaits
//!   `stop()` on [`Decref::Evicted`]); the registry itself never invokes
//!   unit methods, which keeps it free of async plumbing.

use std::collections::HashMap;
use std::sync::Arc;

use crate::units::{ExecUnit, Unit};

struct Slot {
    unit: Arc<dyn Unit>,
    refs: i64,
}

/// Outcome of [`Registry::resolve_or_create`].
pub(crate) struct Resolved {
    /// The registered unit.
    pub unit: Arc<dyn Unit>,
    /// Reference count after the increment.
    pub refs: i64,
    /// True when this call constructed and registered the unit.
    pub created: bool,
}

/// Outcome of [`Registry::decref`].
pub(crate) enum Decref {
    /// No unit registered for the id; no-op.
    Absent,
    /// Count decremented; the unit remains registered with this count.
    Retained(i64),
    /// Count dropped below 1: the slot was removed. The caller must invoke
    /// `stop()` on the returned unit exactly once.
    Evicted(Arc<dyn Unit>),
}

/// Outcome of [`Registry::resolve_exec`].
pub(crate) enum ExecResolve {
    /// The unit is exec-capable.
    Resolved(Arc<dyn ExecUnit>),
    /// The unit exists but lacks the exec capability; the transient
    /// reference taken by resolution was released again. If that release
    /// evicted the unit, it is returned so the caller can stop it.
    Rejected(Option<Arc<dyn Unit>>),
    /// Unknown extension or malformed id; registry unchanged.
    Unknown,
}

/// In-core map from unit id to unit instance plus reference count.
#[derive(Default)]
pub(crate) struct Registry {
    units: HashMap<String, Slot>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a unit without touching its reference count.
    pub fn get(&self, id: &str) -> Option<Arc<dyn Unit>> {
        self.units.get(id).map(|slot| Arc::clone(&slot.unit))
    }

    /// Current reference count for an id (0 when unregistered).
    pub fn refs(&self, id: &str) -> i64 {
        self.units.get(id).map_or(0, |slot| slot.refs)
    }

    /// Resolves the unit for `id`, incrementing its reference count; when
    /// none is registered, constructs one via `build` and registers it
    /// with count 1.
    ///
    /// `build` returning `None` (unknown extension, malformed id) leaves
    /// the registry unchanged and resolves to `None`.
    pub fn resolve_or_create(
        &mut self,
        id: &str,
        build: impl FnOnce() -> Option<Arc<dyn Unit>>,
    ) -> Option<Resolved> {
        if let Some(slot) = self.units.get_mut(id) {
            slot.refs += 1;
            return Some(Resolved {
                unit: Arc::clone(&slot.unit),
                refs: slot.refs,
                created: false,
            });
        }

        let unit = build()?;
        self.units.insert(
            id.to_string(),
            Slot {
                unit: Arc::clone(&unit),
                refs: 1,
            },
        );
        Some(Resolved {
            unit,
            refs: 1,
            created: true,
        })
    }

    /// Decrements the reference count for `id`.
    ///
    /// A count below 1 removes the slot; the caller must stop the returned
    /// unit exactly once. An unregistered id is a no-op.
    pub fn decref(&mut self, id: &str) -> Decref {
        let Some(slot) = self.units.get_mut(id) else {
            return Decref::Absent;
        };
        slot.refs -= 1;
        let refs = slot.refs;
        if refs < 1 {
            match self.units.remove(id) {
                Some(slot) => Decref::Evicted(slot.unit),
                None => Decref::Absent,
            }
        } else {
            Decref::Retained(refs)
        }
    }

    /// Typed accessor: resolve-or-create, then narrow to the exec
    /// capability. A unit of the wrong concrete type has the freshly taken
    /// reference released immediately, so rejection never leaks a count.
    ///
    /// Consumer: exec-capable peer resolution — an activation socket that
    /// accepted a connection resolves the service unit it activates and
    /// hands the connection over through [`ExecUnit`]. Like every registry
    /// call, this runs on the loop task only.
    pub fn resolve_exec(
        &mut self,
        id: &str,
        build: impl FnOnce() -> Option<Arc<dyn Unit>>,
    ) -> ExecResolve {
        let Some(res) = self.resolve_or_create(id, build) else {
            return ExecResolve::Unknown;
        };
        match res.unit.as_exec() {
            Some(exec) => ExecResolve::Resolved(exec),
            None => match self.decref(id) {
                Decref::Evicted(unit) => ExecResolve::Rejected(Some(unit)),
                _ => ExecResolve::Rejected(None),
            },
        }
    }

    /// Number of registered units.
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// True when no unit is registered.
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::store::StoreEvent;
    use crate::units::ExitStatus;

    #[derive(Default)]
    struct Counters {
        starts: AtomicUsize,
        stops: AtomicUsize,
    }

    struct Plain {
        id: String,
        counters: Arc<Counters>,
    }

    #[async_trait]
    impl Unit for Plain {
        fn id(&self) -> &str {
            &self.id
        }
        async fn dispatch_lock_event(&self, _ev: StoreEvent) {}
        async fn start(&self) {
            self.counters.starts.fetch_add(1, Ordering::SeqCst);
        }
        async fn stop(&self) {
            self.counters.stops.fetch_add(1, Ordering::SeqCst);
        }
        async fn tick(&self) {}
    }

    struct Execish {
        id: String,
    }

    #[async_trait]
    impl Unit for Execish {
        fn id(&self) -> &str {
            &self.id
        }
        async fn dispatch_lock_event(&self, _ev: StoreEvent) {}
        async fn start(&self) {}
        async fn stop(&self) {}
        async fn tick(&self) {}
        fn as_exec(self: Arc<Self>) -> Option<Arc<dyn ExecUnit>> {
            Some(self)
        }
    }

    #[async_trait]
    impl ExecUnit for Execish {
        async fn exited(&self, _status: ExitStatus) {}
    }

    fn plain(id: &str, counters: &Arc<Counters>) -> Arc<dyn Unit> {
        Arc::new(Plain {
            id: id.to_string(),
            counters: Arc::clone(counters),
        })
    }

    #[test]
    fn test_unknown_kind_leaves_registry_unchanged() {
        let mut reg = Registry::new();
        assert!(reg.resolve_or_create("bogus", || None).is_none());
        assert!(reg.is_empty());
        assert_eq!(reg.refs("bogus"), 0);
    }

    #[test]
    fn test_double_resolve_returns_same_instance_and_count_two() {
        let mut reg = Registry::new();
        let counters = Arc::new(Counters::default());
        let first = reg
            .resolve_or_create("a.service", || Some(plain("a.service", &counters)))
            .unwrap();
        assert!(first.created);
        assert_eq!(first.refs, 1);

        let second = reg
            .resolve_or_create("a.service", || panic!("must not rebuild"))
            .unwrap();
        assert!(!second.created);
        assert_eq!(second.refs, 2);
        assert!(Arc::ptr_eq(&first.unit, &second.unit));

        // One release keeps the unit registered.
        assert!(matches!(reg.decref("a.service"), Decref::Retained(1)));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_release_to_zero_evicts_once() {
        let mut reg = Registry::new();
        let counters = Arc::new(Counters::default());
        reg.resolve_or_create("a.service", || Some(plain("a.service", &counters)))
            .unwrap();

        let Decref::Evicted(unit) = reg.decref("a.service") else {
            panic!("expected eviction");
        };
        assert_eq!(unit.id(), "a.service");
        assert!(reg.is_empty());

        // A further release on the same id is a no-op.
        assert!(matches!(reg.decref("a.service"), Decref::Absent));
    }

    #[test]
    fn test_every_resolve_increments_regardless_of_command() {
        // The loop resolves on every non-delete control event, so repeated
        // "stop" commands accumulate references; only deletes decrement.
        let mut reg = Registry::new();
        let counters = Arc::new(Counters::default());
        for _ in 0..3 {
            reg.resolve_or_create("a.service", || Some(plain("a.service", &counters)))
                .unwrap();
        }
        assert_eq!(reg.refs("a.service"), 3);
        assert!(matches!(reg.decref("a.service"), Decref::Retained(2)));
        assert!(matches!(reg.decref("a.service"), Decref::Retained(1)));
        assert!(matches!(reg.decref("a.service"), Decref::Evicted(_)));
    }

    #[test]
    fn test_exec_accessor_resolves_exec_units() {
        let mut reg = Registry::new();
        let build = || -> Option<Arc<dyn Unit>> {
            Some(Arc::new(Execish {
                id: "a.service".to_string(),
            }))
        };
        assert!(matches!(
            reg.resolve_exec("a.service", build),
            ExecResolve::Resolved(_)
        ));
        assert_eq!(reg.refs("a.service"), 1);
    }

    #[test]
    fn test_exec_accessor_rejection_leaks_no_reference() {
        let mut reg = Registry::new();
        let counters = Arc::new(Counters::default());

        // Fresh creation rejected: the 1 -> 0 release evicts.
        let res = reg.resolve_exec("a.service", || Some(plain("a.service", &counters)));
        let ExecResolve::Rejected(Some(unit)) = res else {
            panic!("expected rejection with eviction");
        };
        assert_eq!(unit.id(), "a.service");
        assert!(reg.is_empty());

        // Existing unit rejected: count returns to its prior value.
        reg.resolve_or_create("b.service", || Some(plain("b.service", &counters)))
            .unwrap();
        let res = reg.resolve_exec("b.service", || panic!("must not rebuild"));
        assert!(matches!(res, ExecResolve::Rejected(None)));
        assert_eq!(reg.refs("b.service"), 1);
    }
}
