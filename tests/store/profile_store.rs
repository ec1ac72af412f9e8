use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{json, Value};

use meditrack::error::ProfileError;
use meditrack::store::{ProfileStore, StoreEvent};
use meditrack::sync::PartitionSource;
use meditrack::types::{PartitionData, PartitionKey, SaveAck};

fn obj(value: Value) -> PartitionData {
    value.as_object().cloned().unwrap_or_default()
}

fn account() -> Value {
    json!({
        "firstName": "Ada",
        "lastName": "Lovelace",
        "emailId": "ada@example.com",
        "phone": "555-0100",
        "address": {"street": "1 Analytical Way", "city": "London"},
        "emergencyContact": {"name": "Charles", "relationship": "friend", "phone": "555-0199"},
        "medicalProfile": {"bloodPressure": "120/80", "allergies": []},
        "accountSettings": {"theme": "light"},
        "securitySettings": {"twoFactor": false}
    })
}

fn recording(store: &Arc<ProfileStore>) -> Arc<Mutex<Vec<StoreEvent>>> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    store.subscribe(move |event| sink.lock().push(event.clone()));
    events
}

fn ack(store: &ProfileStore, key: PartitionKey) -> SaveAck {
    SaveAck {
        key,
        revision: store.partition(key).revision,
    }
}

// ============================================================================
// Construction and hydration
// ============================================================================

#[test]
fn new_store_is_empty_and_clean() {
    let store = ProfileStore::new();
    assert!(store.dirty_keys().is_empty());
    for key in PartitionKey::ALL {
        assert!(store.data(key).is_empty());
    }
}

#[test]
fn initialize_populates_every_partition_clean() {
    let store = Arc::new(ProfileStore::new());
    let events = recording(&store);

    store.initialize(&account()).unwrap();

    assert!(store.dirty_keys().is_empty());
    assert_eq!(store.data(PartitionKey::PersonalInfo)["primaryPhone"], json!("555-0100"));
    assert_eq!(
        store.data(PartitionKey::MedicalProfile)["bloodPressure"],
        json!("120/80")
    );
    assert_eq!(store.data(PartitionKey::AccountSettings), obj(json!({"theme": "light"})));
    assert_eq!(*events.lock(), vec![StoreEvent::Hydrated]);
}

#[test]
fn initialize_discards_pending_edits() {
    let store = ProfileStore::new();
    store.update_account(obj(json!({"theme": "dark"})));
    assert!(store.is_dirty(PartitionKey::AccountSettings));

    store.initialize(&account()).unwrap();

    assert!(!store.is_dirty(PartitionKey::AccountSettings));
    assert_eq!(store.data(PartitionKey::AccountSettings), obj(json!({"theme": "light"})));
}

#[test]
fn failed_initialize_leaves_state_untouched() {
    let store = ProfileStore::new();
    store.update_security(obj(json!({"twoFactor": true})));

    let err = store.initialize(&json!({"firstName": "Ada"})).unwrap_err();

    assert!(matches!(err, ProfileError::MissingSection("address")));
    assert!(store.is_dirty(PartitionKey::SecuritySettings));
}

// ============================================================================
// Edits
// ============================================================================

#[test]
fn update_replaces_data_and_marks_dirty() {
    let store = ProfileStore::new();
    store.initialize(&account()).unwrap();

    store.update_personal(obj(json!({"firstName": "Augusta"})));

    assert_eq!(store.data(PartitionKey::PersonalInfo), obj(json!({"firstName": "Augusta"})));
    assert_eq!(store.dirty_keys(), vec![PartitionKey::PersonalInfo]);
}

#[test]
fn medical_updates_merge() {
    let store = ProfileStore::new();
    store.initialize(&account()).unwrap();

    store.update_medical(obj(json!({"allergies": ["latex"], "height": 170})));

    assert_eq!(
        store.data(PartitionKey::MedicalProfile),
        obj(json!({"bloodPressure": "120/80", "allergies": ["latex"], "height": 170}))
    );
    assert!(store.is_dirty(PartitionKey::MedicalProfile));
}

#[test]
fn every_edit_bumps_the_revision() {
    let store = ProfileStore::new();
    let before = store.partition(PartitionKey::SecuritySettings).revision;

    store.update_security(obj(json!({"twoFactor": true})));
    store.merge(PartitionKey::SecuritySettings, obj(json!({"sessionTimeout": 30})));

    assert_eq!(store.partition(PartitionKey::SecuritySettings).revision, before + 2);
}

#[test]
fn untyped_edits_require_an_object() {
    let store = ProfileStore::new();

    let err = store
        .update_value(PartitionKey::AccountSettings, json!(["dark"]))
        .unwrap_err();
    assert!(matches!(err, ProfileError::NotAnObject(ref k) if k == "accountSettings"));
    assert!(!store.is_dirty(PartitionKey::AccountSettings));

    store
        .merge_value(PartitionKey::AccountSettings, json!({"theme": "dark"}))
        .unwrap();
    assert!(store.is_dirty(PartitionKey::AccountSettings));
}

#[test]
fn listeners_see_the_dirty_flag_already_set() {
    let store = Arc::new(ProfileStore::new());
    let seen = Arc::new(Mutex::new(Vec::new()));

    let weak = Arc::downgrade(&store);
    let sink = seen.clone();
    store.subscribe(move |event| {
        if let (StoreEvent::Edited { key }, Some(store)) = (event, weak.upgrade()) {
            sink.lock().push(store.is_dirty(*key));
        }
    });

    store.update_personal(obj(json!({"gender": "female"})));

    assert_eq!(*seen.lock(), vec![true]);
}

#[test]
fn unsubscribed_listener_is_not_called() {
    let store = ProfileStore::new();
    let calls = Arc::new(Mutex::new(0));
    let c = calls.clone();
    let id = store.subscribe(move |_| *c.lock() += 1);

    store.update_account(obj(json!({})));
    store.unsubscribe(id);
    store.update_account(obj(json!({})));

    assert_eq!(*calls.lock(), 1);
    assert_eq!(store.listener_count(), 0);
}

#[test]
fn listener_added_inside_a_callback_hears_the_next_event() {
    let store = Arc::new(ProfileStore::new());
    let heard = Arc::new(Mutex::new(Vec::new()));

    let weak = Arc::downgrade(&store);
    let sink = heard.clone();
    store.subscribe(move |event| {
        sink.lock().push(format!("outer:{event:?}"));
        if let (StoreEvent::Hydrated, Some(store)) = (event, weak.upgrade()) {
            let sink = sink.clone();
            store.subscribe(move |event| sink.lock().push(format!("inner:{event:?}")));
        }
    });

    store.initialize(&account()).unwrap();
    store.update_account(obj(json!({"theme": "dark"})));

    let edited = format!(
        "{:?}",
        StoreEvent::Edited {
            key: PartitionKey::AccountSettings
        }
    );
    assert_eq!(
        *heard.lock(),
        vec![
            "outer:Hydrated".to_string(),
            format!("outer:{edited}"),
            format!("inner:{edited}"),
        ]
    );
    assert_eq!(store.listener_count(), 2);
}

#[test]
fn listener_may_edit_the_store_it_listens_to() {
    let store = Arc::new(ProfileStore::new());
    let weak = Arc::downgrade(&store);
    store.subscribe(move |event| {
        if let (StoreEvent::Edited { key: PartitionKey::PersonalInfo }, Some(store)) =
            (event, weak.upgrade())
        {
            store.update_security(obj(json!({"reviewRequired": true})));
        }
    });

    store.update_personal(obj(json!({"firstName": "Ada"})));

    assert_eq!(
        store.dirty_keys(),
        vec![PartitionKey::PersonalInfo, PartitionKey::SecuritySettings]
    );
}

// ============================================================================
// Acknowledgement
// ============================================================================

#[test]
fn mark_saved_clears_acknowledged_partitions_only() {
    let store = Arc::new(ProfileStore::new());
    store.update_personal(obj(json!({"firstName": "Ada"})));
    store.update_account(obj(json!({"theme": "dark"})));
    let events = recording(&store);

    let cleared = store.mark_saved(&[ack(&store, PartitionKey::PersonalInfo)]);

    assert_eq!(cleared, vec![PartitionKey::PersonalInfo]);
    assert_eq!(store.dirty_keys(), vec![PartitionKey::AccountSettings]);
    assert_eq!(
        *events.lock(),
        vec![StoreEvent::Saved {
            keys: vec![PartitionKey::PersonalInfo]
        }]
    );
}

#[test]
fn stale_ack_keeps_newer_edit_dirty() {
    let store = Arc::new(ProfileStore::new());
    store.update_personal(obj(json!({"firstName": "Ada"})));
    let sent = ack(&store, PartitionKey::PersonalInfo);

    store.update_personal(obj(json!({"firstName": "Augusta"})));
    let events = recording(&store);

    assert!(store.mark_saved(&[sent]).is_empty());
    assert!(store.is_dirty(PartitionKey::PersonalInfo));
    assert!(events.lock().is_empty(), "no Saved event when nothing cleared");
}

#[test]
fn mark_all_saved_clears_everything() {
    let store = ProfileStore::new();
    for key in PartitionKey::ALL {
        store.update(key, obj(json!({"touched": true})));
    }

    store.mark_all_saved();

    assert!(store.dirty_keys().is_empty());
    assert_eq!(store.data(PartitionKey::MedicalProfile), obj(json!({"touched": true})));
}

// ============================================================================
// Snapshots and serialization
// ============================================================================

#[test]
fn snapshot_lists_partitions_in_payload_order() {
    let store = ProfileStore::new();
    store.update_security(obj(json!({"twoFactor": true})));

    let snapshot = PartitionSource::snapshot(&store);
    let keys: Vec<PartitionKey> = snapshot.iter().map(|p| p.key).collect();
    assert_eq!(keys, PartitionKey::ALL.to_vec());
    assert!(snapshot[3].is_edited);
    assert!(!snapshot[0].is_edited);
}

#[test]
fn state_serializes_without_revisions() {
    let store = ProfileStore::new();
    store.update_account(obj(json!({"theme": "dark"})));

    let value = serde_json::to_value(store.state()).unwrap();

    assert_eq!(
        value,
        json!({
            "personalInfo": {"data": {}, "isEdited": false},
            "medicalProfile": {"data": {}, "isEdited": false},
            "accountSettings": {"data": {"theme": "dark"}, "isEdited": true},
            "securitySettings": {"data": {}, "isEdited": false}
        })
    );
}
