//! Tests for store.rs: the in-memory record store and its listeners.

use recon_editor::RecordStore;
use recon_editor::store::memory::MemoryRecordStore;
use recon_types::{FieldMap, Record, RecordId};
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

fn record(value: Value) -> Record {
    Record::from_value(value).unwrap()
}

fn store() -> MemoryRecordStore {
    MemoryRecordStore::with_records([
        record(json!({"id": 1, "username": "bob", "locked": false})),
        record(json!({"id": 2, "username": "eve", "locked": true})),
    ])
}

fn counter(store: &MemoryRecordStore) -> (Arc<AtomicUsize>, u64) {
    let count = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&count);
    let id = store.on_change(Arc::new(move || {
        seen.fetch_add(1, Ordering::SeqCst);
    }));
    (count, id)
}

#[test]
fn find_by_key_matches_strings_and_numbers() {
    let store = store();

    let by_name = store.find_by_key("username", "eve").unwrap();
    assert_eq!(by_name.id(), Some(RecordId::from(2)));

    let by_id = store.find_by_key("id", "1").unwrap();
    assert_eq!(by_id.get_str("username"), Some("bob"));

    assert!(store.find_by_key("username", "mallory").is_none());
    assert!(store.find_by_key("uid", "1").is_none());
}

#[test]
fn find_by_id_follows_renamed_record() {
    let store = store();
    let mut changes = FieldMap::new();
    changes.insert("username".into(), json!("robert"));
    store.apply_update(&RecordId::from(1), &changes);

    assert!(store.find_by_key("username", "bob").is_none());
    let renamed = store.find_by_id(&RecordId::from(1)).unwrap();
    assert_eq!(renamed.get_str("username"), Some("robert"));
    assert!(store.find_by_id(&RecordId::from(9)).is_none());
}

#[test]
fn apply_update_overlays_and_notifies() {
    let store = store();
    let (count, _) = counter(&store);
    let mut changes = FieldMap::new();
    changes.insert("locked".into(), json!(true));

    assert!(store.apply_update(&RecordId::from(1), &changes));

    let bob = store.get(&RecordId::from(1)).unwrap();
    assert_eq!(bob.get_bool("locked"), Some(true));
    assert_eq!(bob.get_str("username"), Some("bob"));
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[test]
fn apply_update_for_missing_record_is_silent() {
    let store = store();
    let (count, _) = counter(&store);

    assert!(!store.apply_update(&RecordId::from(9), &FieldMap::new()));
    assert_eq!(count.load(Ordering::SeqCst), 0);
}

#[test]
fn upsert_replaces_by_id() {
    let store = store();
    store.upsert(record(json!({"id": 1, "username": "robert"})));
    store.upsert(record(json!({"id": 3, "username": "mallory"})));

    assert_eq!(
        store.get(&RecordId::from(1)).unwrap().get_str("username"),
        Some("robert")
    );
    assert!(store.find_by_key("username", "mallory").is_some());
    assert!(store.find_by_key("username", "bob").is_none());
}

#[test]
fn remove_notifies_only_when_present() {
    let store = store();
    let (count, _) = counter(&store);

    assert!(store.remove(&RecordId::from(2)).is_some());
    assert!(store.remove(&RecordId::from(2)).is_none());
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[test]
fn off_change_stops_notifications() {
    let store = store();
    let (count, id) = counter(&store);
    assert_eq!(store.listener_count(), 1);

    store.off_change(id);
    store.off_change(id);
    store.emit();

    assert_eq!(store.listener_count(), 0);
    assert_eq!(count.load(Ordering::SeqCst), 0);
}

#[test]
fn listener_may_unsubscribe_during_notification() {
    let store = Arc::new(store());
    let slot = Arc::new(parking_lot::Mutex::new(None::<u64>));

    let store_ref = Arc::clone(&store);
    let slot_ref = Arc::clone(&slot);
    let id = store.on_change(Arc::new(move || {
        if let Some(id) = slot_ref.lock().take() {
            store_ref.off_change(id);
        }
    }));
    *slot.lock() = Some(id);

    store.emit();

    assert_eq!(store.listener_count(), 0);
}

#[test]
fn pending_flags_are_per_record() {
    let store = store();
    let bob = RecordId::from(1);
    let eve = RecordId::from(2);

    store.set_task_pending(&bob, true);
    store.set_remote_update_pending(&eve, true);

    assert!(store.is_task_pending(&bob));
    assert!(!store.is_task_pending(&eve));
    assert!(store.is_remote_update_pending(&eve));
    assert!(!store.is_remote_update_pending(&bob));

    store.set_task_pending(&bob, false);
    assert!(!store.is_task_pending(&bob));
}
