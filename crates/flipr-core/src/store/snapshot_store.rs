// ── Snapshot store ──
//
// Holds the current snapshot behind a `watch` channel. The sender is the
// single write path: cycle installs and command patches both go through
// `send_modify`, so they never interleave and readers always see one whole
// snapshot.

use std::sync::Arc;

use tokio::sync::watch;

use super::Snapshot;
use crate::model::{DeviceKind, DeviceRecord};
use crate::stream::SnapshotStream;

/// Reactive holder of the current [`Snapshot`].
pub struct SnapshotStore {
    tx: watch::Sender<Arc<Snapshot>>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(Arc::new(Snapshot::empty()));
        Self { tx }
    }

    /// The current snapshot. Never blocks on the network.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.tx.borrow().clone()
    }

    pub fn find(&self, id: &str) -> Option<Arc<DeviceRecord>> {
        self.tx.borrow().find(id).cloned()
    }

    pub fn ids(&self, kind: DeviceKind) -> Vec<String> {
        self.tx.borrow().ids(kind)
    }

    pub fn subscribe(&self) -> SnapshotStream {
        SnapshotStream::new(self.tx.subscribe())
    }

    /// Publish a cycle result, merged against the live snapshot.
    ///
    /// Returns the installed snapshot.
    pub(crate) fn install(&self, next: Snapshot) -> Arc<Snapshot> {
        let mut installed = None;
        self.tx.send_modify(|current| {
            let merged = Arc::new(next.merge_newer(current));
            installed = Some(Arc::clone(&merged));
            *current = merged;
        });
        installed.unwrap_or_else(|| self.snapshot())
    }

    /// Replace one record in the live snapshot.
    ///
    /// Returns `false` (and notifies nobody) when the id vanished or
    /// changed kind since the caller looked.
    pub(crate) fn patch(&self, record: DeviceRecord) -> bool {
        self.tx.send_if_modified(|current| match current.with_record(record) {
            Some(next) => {
                *current = Arc::new(next);
                true
            }
            None => false,
        })
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}
