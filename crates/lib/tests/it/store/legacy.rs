//! Loading payloads written with older record layouts.

use recordvault::{Container, EncryptionScheme, constants::MAIN_STORE_KEY};
use serde_json::json;

use crate::container::helpers::Note;
use crate::helpers::*;

/// Seal an arbitrary JSON payload the way a main store envelope looks.
async fn main_envelope(password: &str, payload: serde_json::Value) -> Vec<u8> {
    let mut container =
        Container::new(EncryptionScheme::PasswordDerived).with_kdf_params(test_kdf_params());
    container.set_password(password).expect("set password");
    let note = Note::new(MAIN_STORE_KEY, &serde_json::to_vec(&payload).expect("json"));
    container.set(&note).await.expect("seal");
    container.serialize().expect("serialize")
}

#[tokio::test]
async fn test_uuid_and_category_are_migrated() {
    let raw = main_envelope(
        "pw",
        json!({
            "created": "2019-01-01T00:00:00Z",
            "updated": "2019-06-01T00:00:00Z",
            "records": [{
                "uuid": "legacy-1",
                "name": "Old bank",
                "fields": [{"name": "password", "value": "1234", "masked": true}],
                "category": "Finance"
            }]
        }),
    )
    .await;

    let mut store = test_main_store("pw");
    store.deserialize(&raw).await.expect("Failed to load legacy payload");

    let record = store.get("legacy-1").expect("Record should keep its uuid as id");
    assert_eq!(record.name, "Old bank");
    assert_eq!(record.tags.iter().collect::<Vec<_>>(), vec!["Finance"]);
    assert!(record.fields[0].masked);
    assert!(!record.removed);
    // No record timestamp: defaulted to the time of loading.
    assert!(record.updated > at(0));
}

#[tokio::test]
async fn test_record_without_any_id_gets_one() {
    let raw = main_envelope(
        "pw",
        json!({ "records": [{"name": "anonymous"}, {"name": "also anonymous"}] }),
    )
    .await;

    let mut store = test_main_store("pw");
    store.deserialize(&raw).await.expect("load");
    assert_eq!(store.len(), 2);
    assert!(store.records().all(|r| !r.id.is_empty()));
}

#[tokio::test]
async fn test_mixed_current_and_legacy_records() {
    let current = {
        let store = test_plain_store("scratch");
        record_at(&store, "current", at(100))
    };
    let raw = main_envelope(
        "pw",
        json!({
            "records": [
                serde_json::to_value(&current).expect("json"),
                {"id": "old", "name": "old", "tags": ["a,b"], "updated": 1_704_067_200_000i64}
            ]
        }),
    )
    .await;

    let mut store = test_main_store("pw");
    store.deserialize(&raw).await.expect("load");
    assert_eq!(store.get(&current.id), Some(&current));
    let old = store.get("old").expect("old");
    assert_eq!(old.tags.iter().collect::<Vec<_>>(), vec!["ab"]);
    assert_eq!(old.updated, at(0));
}

#[tokio::test]
async fn test_garbage_payload_is_a_store_error() {
    let raw = main_envelope("pw", json!({ "records": "not a list" })).await;
    let mut store = test_main_store("pw");
    let err = store.deserialize(&raw).await.unwrap_err();
    assert!(err.is_store_error());
    assert!(store.is_empty());
}
