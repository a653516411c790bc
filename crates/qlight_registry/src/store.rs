//! In-memory record store
//!
//! The map from device ID to [`DeviceRecord`]. Every mutation holds the write lock
//! for the whole lookup-and-modify step; reads share the lock and may run together.

use std::collections::hash_map::{Entry, Values};
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::models::{CheckIn, DeviceRecord};

/// Process-wide device map. Records are created once and then only updated.
#[derive(Debug, Default)]
pub struct RecordStore {
    records: RwLock<HashMap<String, DeviceRecord>>,
}

impl RecordStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Load records, typically from a snapshot. A repeated ID keeps the last record seen.
    ///
    /// Returns the number of distinct records now in the store.
    pub fn hydrate(&self, records: impl IntoIterator<Item = DeviceRecord>) -> usize {
        let mut map = self.records.write();
        for record in records {
            map.insert(record.id.clone(), record);
        }
        map.len()
    }

    /// Create-or-update keyed by `candidate.id`.
    ///
    /// Returns the stored record and whether it was newly created.
    pub fn upsert(&self, candidate: CheckIn, now: DateTime<Utc>) -> (DeviceRecord, bool) {
        let mut map = self.records.write();
        match map.entry(candidate.id.clone()) {
            Entry::Occupied(mut entry) => {
                entry.get_mut().apply_check_in(candidate, now);
                (entry.get().clone(), false)
            }
            Entry::Vacant(entry) => {
                let record = entry.insert(DeviceRecord::first_check_in(candidate, now));
                (record.clone(), true)
            }
        }
    }

    /// Update-only variant of [`RecordStore::upsert`]: unknown IDs are left alone.
    pub fn update_existing(&self, candidate: CheckIn, now: DateTime<Utc>) -> Option<DeviceRecord> {
        let mut map = self.records.write();
        let record = map.get_mut(&candidate.id)?;
        record.apply_check_in(candidate, now);
        Some(record.clone())
    }

    pub fn get(&self, id: &str) -> Option<DeviceRecord> {
        self.records.read().get(id).cloned()
    }

    /// A consistent copy of every record, in no particular order.
    pub fn all(&self) -> Vec<DeviceRecord> {
        self.records.read().values().cloned().collect()
    }

    /// Run `f` over the records under the read lock, without cloning them.
    pub fn scan<R>(&self, f: impl FnOnce(Values<'_, String, DeviceRecord>) -> R) -> R {
        let map = self.records.read();
        f(map.values())
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}
