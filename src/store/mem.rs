//! # In-memory reference store.
//!
//! [`MemStore`] implements both [`StoreReader`] and [`StoreWriter`] over a
//! process-local map. It exists for tests and demos: it honors the full
//! contract — all three [`Cas`] modes, monotonically increasing sequence
//! numbers doubling as CAS tokens, one-level glob watches, and
//! `Missing`/`Dir`/`Value` lookups — without any replication.
//!
//! ## Watch delivery
//! Each registered watch gets its own unbounded queue drained by a
//! forwarding task into the caller's bounded channel. Mutators therefore
//! never block on a slow consumer, and per-watch order is preserved:
//! ```text
//! set()/del() ──► [unbounded queue] ──► forwarder ──► caller's mpsc
//! ```
//! Because each watch has its own forwarder, no ordering is defined
//! *across* watches: two watches feeding the same channel may interleave
//! differently than the underlying mutation order.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};

use super::{Cas, Lookup, StoreEvent, StoreReader, StoreWriter};
use crate::error::StoreError;

struct Entry {
    body: String,
    cas: String,
}

struct Watch {
    /// Directory prefix the one-level glob matches under (trailing slash).
    prefix: String,
    queue: mpsc::UnboundedSender<StoreEvent>,
}

impl Watch {
    /// One-level match: the path extends the prefix by exactly one segment.
    fn matches(&self, path: &str) -> bool {
        path.strip_prefix(self.prefix.as_str())
            .is_some_and(|rest| !rest.is_empty() && !rest.contains('/'))
    }
}

struct Inner {
    seq: u64,
    entries: BTreeMap<String, Entry>,
    watches: Vec<Watch>,
}

impl Inner {
    fn notify(&mut self, ev: &StoreEvent) {
        self.watches
            .retain(|w| !w.matches(&ev.path) || w.queue.send(ev.clone()).is_ok());
    }
}

/// Process-local store honoring the full read/write contract.
pub struct MemStore {
    inner: Mutex<Inner>,
}

impl MemStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                seq: 0,
                entries: BTreeMap::new(),
                watches: Vec::new(),
            }),
        }
    }
}

impl Default for MemStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StoreWriter for MemStore {
    async fn set(&self, path: &str, body: &str, cas: Cas) -> Result<u64, StoreError> {
        let mut inner = self.inner.lock().await;
        match (&cas, inner.entries.get(path)) {
            (Cas::Clobber, _) => {}
            (Cas::Missing, None) => {}
            (Cas::Missing, Some(_)) => {
                return Err(StoreError::CasMismatch { path: path.into() });
            }
            (Cas::Token(t), Some(e)) if e.cas == *t => {}
            (Cas::Token(_), _) => {
                return Err(StoreError::CasMismatch { path: path.into() });
            }
        }

        inner.seq += 1;
        let seq = inner.seq;
        let token = seq.to_string();
        inner.entries.insert(
            path.to_string(),
            Entry {
                body: body.to_string(),
                cas: token.clone(),
            },
        );
        inner.notify(&StoreEvent {
            seq,
            path: path.to_string(),
            body: body.to_string(),
            cas: token,
            deleted: false,
        });
        Ok(seq)
    }

    async fn del(&self, path: &str, cas: Cas) -> Result<u64, StoreError> {
        let mut inner = self.inner.lock().await;
        match (&cas, inner.entries.get(path)) {
            // Unconditional delete of an absent entry is an idempotent no-op.
            (Cas::Clobber, None) => return Ok(inner.seq),
            (Cas::Clobber, Some(_)) => {}
            (Cas::Token(t), Some(e)) if e.cas == *t => {}
            (Cas::Token(_), _) => {
                return Err(StoreError::CasMismatch { path: path.into() });
            }
            (Cas::Missing, _) => {
                return Err(StoreError::Backend(
                    "missing precondition is not valid for delete".to_string(),
                ));
            }
        }

        inner.entries.remove(path);
        inner.seq += 1;
        let seq = inner.seq;
        inner.notify(&StoreEvent {
            seq,
            path: path.to_string(),
            body: String::new(),
            cas: seq.to_string(),
            deleted: true,
        });
        Ok(seq)
    }
}

#[async_trait]
impl StoreReader for MemStore {
    async fn watch(&self, glob: &str, tx: mpsc::Sender<StoreEvent>) -> Result<(), StoreError> {
        let prefix = match glob.strip_suffix('*') {
            Some(p) if p.ends_with('/') => p.to_string(),
            _ => {
                return Err(StoreError::Backend(format!(
                    "unsupported watch glob: {glob}"
                )));
            }
        };

        let (qtx, mut qrx) = mpsc::unbounded_channel::<StoreEvent>();
        // Forwarder: drains the unbounded queue into the caller's bounded
        // channel so mutators never block on a slow consumer.
        tokio::spawn(async move {
            while let Some(ev) = qrx.recv().await {
                if tx.send(ev).await.is_err() {
                    break;
                }
            }
        });

        self.inner.lock().await.watches.push(Watch { prefix, queue: qtx });
        Ok(())
    }

    async fn lookup(&self, path: &str) -> Result<Lookup, StoreError> {
        let inner = self.inner.lock().await;
        if let Some(e) = inner.entries.get(path) {
            return Ok(Lookup::Value {
                body: e.body.clone(),
                cas: e.cas.clone(),
            });
        }
        let dir = format!("{path}/");
        let is_dir = inner
            .entries
            .range(dir.clone()..)
            .next()
            .is_some_and(|(k, _)| k.starts_with(&dir));
        Ok(if is_dir { Lookup::Dir } else { Lookup::Missing })
    }

    async fn lookup_dir(&self, path: &str) -> Result<Vec<String>, StoreError> {
        let inner = self.inner.lock().await;
        let dir = format!("{path}/");
        let mut children: Vec<String> = Vec::new();
        for key in inner.entries.keys() {
            let Some(rest) = key.strip_prefix(&dir) else {
                continue;
            };
            let child = rest.split('/').next().unwrap_or(rest);
            // Keys iterate sorted, so duplicates are adjacent.
            if children.last().map(String::as_str) != Some(child) {
                children.push(child.to_string());
            }
        }
        Ok(children)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_missing_precondition_rejects_existing_key() {
        let st = MemStore::new();
        st.set("/lock/a.service", "node-1", Cas::Missing).await.unwrap();
        let err = st.set("/lock/a.service", "node-2", Cas::Missing).await;
        assert!(matches!(err, Err(StoreError::CasMismatch { .. })));
        // First writer still holds the entry.
        match st.lookup("/lock/a.service").await.unwrap() {
            Lookup::Value { body, .. } => assert_eq!(body, "node-1"),
            other => panic!("expected value, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_stale_token_delete_rejected() {
        let st = MemStore::new();
        st.set("/lock/a.service", "node-1", Cas::Missing).await.unwrap();
        let cas = match st.lookup("/lock/a.service").await.unwrap() {
            Lookup::Value { cas, .. } => cas,
            other => panic!("expected value, got {other:?}"),
        };
        // Someone else mutates the entry; the token goes stale.
        st.set("/lock/a.service", "node-2", Cas::Clobber).await.unwrap();
        let err = st.del("/lock/a.service", Cas::Token(cas)).await;
        assert!(matches!(err, Err(StoreError::CasMismatch { .. })));
    }

    #[tokio::test]
    async fn test_clobber_always_succeeds() {
        let st = MemStore::new();
        st.set("/mon/status/a/pid", "42", Cas::Clobber).await.unwrap();
        st.set("/mon/status/a/pid", "43", Cas::Clobber).await.unwrap();
        st.del("/mon/status/a/pid", Cas::Clobber).await.unwrap();
        // Deleting again is an idempotent no-op.
        st.del("/mon/status/a/pid", Cas::Clobber).await.unwrap();
        assert_eq!(st.lookup("/mon/status/a/pid").await.unwrap(), Lookup::Missing);
    }

    #[tokio::test]
    async fn test_lookup_distinguishes_dir_from_value() {
        let st = MemStore::new();
        st.set("/mon/def/a.service/cmd", "/bin/a", Cas::Clobber)
            .await
            .unwrap();
        assert_eq!(st.lookup("/mon/def/a.service").await.unwrap(), Lookup::Dir);
        assert_eq!(st.lookup("/mon/def/nope").await.unwrap(), Lookup::Missing);
    }

    #[tokio::test]
    async fn test_lookup_dir_lists_one_level_children() {
        let st = MemStore::new();
        st.set("/mon/ctl/a.service", "start", Cas::Clobber).await.unwrap();
        st.set("/mon/ctl/b.socket", "auto", Cas::Clobber).await.unwrap();
        st.set("/mon/def/a.service/cmd", "/bin/a", Cas::Clobber)
            .await
            .unwrap();
        assert_eq!(
            st.lookup_dir("/mon/ctl").await.unwrap(),
            vec!["a.service".to_string(), "b.socket".to_string()]
        );
        // Nested params collapse to one child per id.
        assert_eq!(st.lookup_dir("/mon/def").await.unwrap(), vec!["a.service"]);
    }

    #[tokio::test]
    async fn test_watch_is_one_level_and_ordered() {
        let st = MemStore::new();
        let (tx, mut rx) = mpsc::channel(8);
        st.watch("/mon/ctl/*", tx).await.unwrap();

        st.set("/mon/ctl/a.service", "start", Cas::Clobber).await.unwrap();
        // Two levels below the glob: must not be delivered.
        st.set("/mon/ctl/a.service/extra", "x", Cas::Clobber).await.unwrap();
        // Different namespace: must not be delivered.
        st.set("/lock/a.service", "n", Cas::Clobber).await.unwrap();
        st.del("/mon/ctl/a.service", Cas::Clobber).await.unwrap();

        let first = rx.recv().await.expect("first event");
        assert_eq!(first.path, "/mon/ctl/a.service");
        assert_eq!(first.body, "start");
        assert!(!first.is_del());

        let second = rx.recv().await.expect("second event");
        assert_eq!(second.path, "/mon/ctl/a.service");
        assert!(second.is_del());
        assert!(second.seq > first.seq);

        // Nothing else arrives.
        let extra = tokio::time::timeout(Duration::from_millis(50), rx.recv()).await;
        assert!(extra.is_err());
    }
}
