// ── Device registry snapshot ──
//
// One internally consistent set of device records. Ordered (analysers then
// Hubs, in discovery order) with an id index for O(1) lookup. Ids are
// unique across kinds; construction rejects duplicates.

use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Serialize, Serializer};

use crate::error::CoreError;
use crate::model::{DeviceKind, DeviceRecord};

/// Immutable set of device records produced by one refresh cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    records: IndexMap<String, Arc<DeviceRecord>>,
}

impl Snapshot {
    /// The snapshot held before the first successful refresh.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a snapshot, rejecting duplicate ids.
    pub fn new(records: impl IntoIterator<Item = DeviceRecord>) -> Result<Self, CoreError> {
        let iter = records.into_iter();
        let mut map = IndexMap::with_capacity(iter.size_hint().0);
        for record in iter {
            if map.contains_key(&record.id) {
                return Err(CoreError::DuplicateDevice {
                    identifier: record.id,
                });
            }
            map.insert(record.id.clone(), Arc::new(record));
        }
        Ok(Self { records: map })
    }

    pub fn find(&self, id: &str) -> Option<&Arc<DeviceRecord>> {
        self.records.get(id)
    }

    /// Ids of every record of `kind`, in snapshot order.
    pub fn ids(&self, kind: DeviceKind) -> Vec<String> {
        self.records
            .values()
            .filter(|r| r.kind() == kind)
            .map(|r| r.id.clone())
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<DeviceRecord>> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Copy of this snapshot with `record` replacing the entry of the same
    /// id and kind. `None` when no such entry exists.
    pub(crate) fn with_record(&self, record: DeviceRecord) -> Option<Self> {
        let existing = self.records.get(&record.id)?;
        if existing.kind() != record.kind() {
            return None;
        }
        let mut records = self.records.clone();
        records.insert(record.id.clone(), Arc::new(record));
        Some(Self { records })
    }

    /// Merge a freshly assembled snapshot with the one currently published.
    ///
    /// Membership and order come from `self`. For ids present in both with
    /// the same kind, the record with the newer `last_read` wins, so a
    /// command confirmed while the cycle ran is not rolled back.
    pub(crate) fn merge_newer(mut self, current: &Snapshot) -> Self {
        for (id, record) in &mut self.records {
            if let Some(live) = current.records.get(id) {
                if live.kind() == record.kind() && live.last_read > record.last_read {
                    *record = Arc::clone(live);
                }
            }
        }
        self
    }
}

impl Serialize for Snapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.records.values())
    }
}
