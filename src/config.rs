//! # Monitor configuration.
//!
//! Provides [`MonitorConfig`], the per-node settings the monitor is
//! constructed with: the node identity written into lock entries, the
//! write-prefix prepended to every status/lock write, and the event bus
//! capacity.

/// Per-node configuration for the monitor runtime.
///
/// ## Field semantics
/// - `node`: identity recorded as the body of acquired lock entries, so
///   other nodes can see who holds a lock.
/// - `prefix`: prepended to every write path (status publishes, lock
///   acquire/release). Read paths (control, definition) are *not* prefixed.
/// - `bus_capacity`: ring buffer size of the broadcast event bus (min 1;
///   clamped by the bus).
#[derive(Clone, Debug)]
pub struct MonitorConfig {
    /// Node identity, written as the body of acquired lock entries.
    pub node: String,
    /// Prefix prepended to all store write paths.
    pub prefix: String,
    /// Capacity of the event bus broadcast ring buffer.
    pub bus_capacity: usize,
}

impl MonitorConfig {
    /// Creates a config with the given node identity and write prefix.
    pub fn new(node: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            prefix: prefix.into(),
            ..Self::default()
        }
    }

    /// Node identity taken from the `HOSTNAME` environment variable,
    /// falling back to `"local"` when unset.
    pub fn node_from_env() -> String {
        std::env::var("HOSTNAME").unwrap_or_else(|_| "local".to_string())
    }

    /// Returns the bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for MonitorConfig {
    /// Default configuration:
    /// - `node = "local"`
    /// - `prefix = ""` (writes go to the shared root)
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            node: "local".to_string(),
            prefix: String::new(),
            bus_capacity: 1024,
        }
    }
}
