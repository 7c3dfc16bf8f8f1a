//! Record store abstraction.
//!
//! The store owns the authoritative copies of records and pushes full
//! snapshots: sessions are told *that* something changed and re-resolve
//! their record; they never receive deltas.

use recon_types::{Record, RecordId};
use std::sync::Arc;

/// Handle returned by [`RecordStore::on_change`], used to unsubscribe.
pub type ListenerId = u64;

/// Callback invoked after any change in the store.
pub type ChangeListener = Arc<dyn Fn() + Send + Sync>;

/// Source of record snapshots and change notifications.
pub trait RecordStore: Send + Sync {
    /// Finds the record whose field `key` matches `value`.
    fn find_by_key(&self, key: &str, value: &str) -> Option<Record>;

    /// Finds the record with server id `id`.
    fn find_by_id(&self, id: &RecordId) -> Option<Record>;

    /// Registers `listener` to be called after every change.
    fn on_change(&self, listener: ChangeListener) -> ListenerId;

    /// Removes a listener. Unknown ids are ignored.
    fn off_change(&self, id: ListenerId);

    /// Whether a change submitted from this client is still being applied.
    fn is_task_pending(&self, id: &RecordId) -> bool;

    /// Whether the server announced a change that has not arrived yet.
    fn is_remote_update_pending(&self, id: &RecordId) -> bool;
}

/// An in-memory record store.
pub mod memory {
    use super::*;
    use parking_lot::Mutex;
    use recon_types::FieldMap;
    use serde_json::Value;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicU64, Ordering};

    /// Record store held in memory.
    ///
    /// Listeners are snapshotted before each notification and called with no
    /// lock held, so a listener may subscribe or unsubscribe while being
    /// notified.
    pub struct MemoryRecordStore {
        records: Mutex<Vec<Record>>,
        listeners: Mutex<Vec<(ListenerId, ChangeListener)>>,
        next_listener: AtomicU64,
        pending_tasks: Mutex<HashSet<RecordId>>,
        pending_remote: Mutex<HashSet<RecordId>>,
    }

    impl Default for MemoryRecordStore {
        fn default() -> Self {
            Self::new()
        }
    }

    impl MemoryRecordStore {
        pub fn new() -> Self {
            Self {
                records: Mutex::new(Vec::new()),
                listeners: Mutex::new(Vec::new()),
                next_listener: AtomicU64::new(1),
                pending_tasks: Mutex::new(HashSet::new()),
                pending_remote: Mutex::new(HashSet::new()),
            }
        }

        /// Creates a store holding `records`, without notifying anyone.
        pub fn with_records(records: impl IntoIterator<Item = Record>) -> Self {
            let store = Self::new();
            store.records.lock().extend(records);
            store
        }

        /// Inserts or replaces (by id) a record, then notifies listeners.
        pub fn upsert(&self, record: Record) {
            {
                let mut records = self.records.lock();
                let id = record.id();
                match records.iter_mut().find(|r| id.is_some() && r.id() == id) {
                    Some(slot) => *slot = record,
                    None => records.push(record),
                }
            }
            self.emit();
        }

        /// Writes `changes` into the record `id` and notifies listeners.
        /// Returns false when no such record exists.
        pub fn apply_update(&self, id: &RecordId, changes: &FieldMap) -> bool {
            let applied = {
                let mut records = self.records.lock();
                match records.iter_mut().find(|r| r.id().as_ref() == Some(id)) {
                    Some(record) => {
                        *record = record.overlaid(changes);
                        true
                    }
                    None => false,
                }
            };
            if applied {
                self.emit();
            }
            applied
        }

        /// Removes the record `id` and notifies listeners.
        pub fn remove(&self, id: &RecordId) -> Option<Record> {
            let removed = {
                let mut records = self.records.lock();
                let pos = records.iter().position(|r| r.id().as_ref() == Some(id))?;
                records.remove(pos)
            };
            self.emit();
            Some(removed)
        }

        pub fn get(&self, id: &RecordId) -> Option<Record> {
            self.records
                .lock()
                .iter()
                .find(|r| r.id().as_ref() == Some(id))
                .cloned()
        }

        pub fn set_task_pending(&self, id: &RecordId, pending: bool) {
            toggle(&self.pending_tasks, id, pending);
            self.emit();
        }

        pub fn set_remote_update_pending(&self, id: &RecordId, pending: bool) {
            toggle(&self.pending_remote, id, pending);
            self.emit();
        }

        /// Number of currently registered listeners.
        pub fn listener_count(&self) -> usize {
            self.listeners.lock().len()
        }

        /// Notifies every registered listener.
        pub fn emit(&self) {
            let snapshot: Vec<ChangeListener> = {
                let guard = self.listeners.lock();
                guard.iter().map(|(_, cb)| Arc::clone(cb)).collect()
            };
            for cb in snapshot {
                cb();
            }
        }
    }

    fn toggle(set: &Mutex<HashSet<RecordId>>, id: &RecordId, on: bool) {
        let mut set = set.lock();
        if on {
            set.insert(id.clone());
        } else {
            set.remove(id);
        }
    }

    /// Routing parameters are text; numeric fields match their decimal form.
    fn value_matches(field: &Value, wanted: &str) -> bool {
        match field {
            Value::String(s) => s == wanted,
            Value::Number(n) => n.to_string() == wanted,
            Value::Bool(b) => b.to_string() == wanted,
            _ => false,
        }
    }

    impl RecordStore for MemoryRecordStore {
        fn find_by_key(&self, key: &str, value: &str) -> Option<Record> {
            self.records
                .lock()
                .iter()
                .find(|r| r.get(key).is_some_and(|v| value_matches(v, value)))
                .cloned()
        }

        fn find_by_id(&self, id: &RecordId) -> Option<Record> {
            self.get(id)
        }

        fn on_change(&self, listener: ChangeListener) -> ListenerId {
            let id = self.next_listener.fetch_add(1, Ordering::Relaxed);
            self.listeners.lock().push((id, listener));
            id
        }

        fn off_change(&self, id: ListenerId) {
            self.listeners.lock().retain(|(lid, _)| *lid != id);
        }

        fn is_task_pending(&self, id: &RecordId) -> bool {
            self.pending_tasks.lock().contains(id)
        }

        fn is_remote_update_pending(&self, id: &RecordId) -> bool {
            self.pending_remote.lock().contains(id)
        }
    }
}
