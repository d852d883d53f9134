//! SharedStore tests: creation, membership and opening as a member.

use recordvault::{Identity, SharedStore, store::StoreError};

use crate::helpers::*;

#[tokio::test]
async fn test_member_added_later_reads_earlier_records() {
    let (mut store, alice) = test_shared_store("alice");
    let early = record_at(&store, "early", at(0));
    store.add_record(early.clone());
    let before = store.serialize().await.expect("serialize");

    // Alice reopens the old snapshot and invites bob.
    let bob = test_account("bob");
    let mut as_alice = SharedStore::open(&before, &alice).await.expect("open as alice");
    as_alice.add_member(&bob.to_public_account()).expect("add bob");
    let after = as_alice.serialize().await.expect("serialize");

    let as_bob = SharedStore::open(&after, &bob).await.expect("open as bob");
    assert_eq!(as_bob.get(&early.id), Some(&early));
    assert!(as_bob.is_member("alice"));
    assert!(as_bob.is_member("bob"));
    assert_eq!(
        as_bob.container().key_fingerprint(),
        store.container().key_fingerprint()
    );
}

#[tokio::test]
async fn test_any_member_can_write_and_add_members() {
    let (mut store, _alice) = test_shared_store("alice");
    let bob = test_account("bob");
    let carol = test_account("carol");
    store.add_member(&bob).expect("add bob");
    let raw = store.serialize().await.expect("serialize");

    let mut as_bob = SharedStore::open(&raw, &bob).await.expect("open as bob");
    as_bob.add_record(record_at(&as_bob, "from bob", at(1)));
    as_bob.add_member(&carol).expect("bob adds carol");
    let raw = as_bob.serialize().await.expect("serialize");

    let as_carol = SharedStore::open(&raw, &carol).await.expect("open as carol");
    assert_eq!(as_carol.len(), 1);
    assert_eq!(as_carol.members().len(), 3);
    assert_eq!(as_carol.container().participants().len(), 3);
}

#[tokio::test]
async fn test_outsider_cannot_open() {
    let (mut store, _alice) = test_shared_store("alice");
    let raw = store.serialize().await.expect("serialize");

    let err = SharedStore::open(&raw, &test_account("mallory"))
        .await
        .unwrap_err();
    assert!(err.is_key_not_found());
}

#[tokio::test]
async fn test_re_adding_member_keeps_lists_in_lock_step() {
    let (mut store, _alice) = test_shared_store("alice");
    let bob = test_account("bob");
    store.add_member(&bob).expect("add");
    store.add_member(&bob).expect("re-add");
    assert_eq!(store.members().len(), 2);
    assert_eq!(store.container().participants().len(), 2);

    let raw = store.serialize().await.expect("serialize");
    SharedStore::open(&raw, &bob).await.expect("bob still opens");
}

#[tokio::test]
async fn test_locked_store_rejects_members() {
    let mut store = SharedStore::new("locked");
    let err = store.add_member(&test_account("bob")).unwrap_err();
    assert!(err.is_not_unlocked());
    assert!(store.members().is_empty());
}

#[tokio::test]
async fn test_load_then_unlock_then_read() {
    let (mut store, alice) = test_shared_store("alice");
    store.add_record(record_at(&store, "x", at(0)));
    let raw = store.serialize().await.expect("serialize");

    let mut reopened = SharedStore::new(store.id());
    reopened.load(&raw).expect("load");
    assert!(reopened.read().await.unwrap_err().is_not_unlocked());
    reopened.unlock(&alice).expect("unlock");
    reopened.read().await.expect("read");
    assert_eq!(reopened.len(), 1);
}

#[tokio::test]
async fn test_tampered_membership_is_rejected() {
    let (mut store, alice) = test_shared_store("alice");
    let raw = store.serialize().await.expect("serialize");

    // Add a participant entry that no sealed member backs.
    let mut envelope: serde_json::Value = serde_json::from_slice(&raw).expect("json");
    let mallory = test_account("mallory");
    let mut forged = envelope["participants"][0].clone();
    forged["publicIdentity"] =
        serde_json::to_value(mallory.to_public_account()).expect("json");
    envelope["participants"]
        .as_array_mut()
        .expect("participants")
        .push(forged);
    let tampered = serde_json::to_vec(&envelope).expect("json");

    let err = SharedStore::open(&tampered, &alice).await.unwrap_err();
    assert!(matches!(
        err,
        recordvault::Error::Store(StoreError::MembershipMismatch { .. })
    ));
}

/// Member ids of a store and participant ids of its container, sorted.
fn membership(store: &SharedStore) -> (Vec<String>, Vec<String>) {
    let mut members: Vec<String> = store.members().iter().map(|m| m.id.clone()).collect();
    let mut participants: Vec<String> = store
        .container()
        .participants()
        .iter()
        .map(|p| p.public_identity.id.clone())
        .collect();
    members.sort();
    participants.sort();
    (members, participants)
}

/// Drop `id` from an envelope's participant list.
fn without_participant(raw: &[u8], id: &str) -> serde_json::Value {
    let mut envelope: serde_json::Value = serde_json::from_slice(raw).expect("json");
    envelope["participants"]
        .as_array_mut()
        .expect("participants")
        .retain(|p| p["publicIdentity"]["id"] != id);
    envelope
}

#[tokio::test]
async fn test_failed_deserialize_leaves_membership_intact() {
    let (mut store, alice) = test_shared_store("alice");
    let bob = test_account("bob");
    store.add_member(&bob).expect("add bob");
    store.add_record(record_at(&store, "kept", at(0)));
    let raw = store.serialize().await.expect("serialize");

    let mut corrupted = without_participant(&raw, "bob");
    corrupted["data"]["ciphertext"] = serde_json::Value::String("AAAAAAAAAAAAAAAAAAAAAAAA".into());
    let corrupted = serde_json::to_vec(&corrupted).expect("json");
    let err = store.deserialize(&corrupted).await.unwrap_err();
    assert!(err.is_decryption_failed());

    let expected = (
        vec!["alice".to_string(), "bob".to_string()],
        vec!["alice".to_string(), "bob".to_string()],
    );
    assert_eq!(membership(&store), expected);

    // Participants dropped without a matching payload change fail validation.
    let mismatched = serde_json::to_vec(&without_participant(&raw, "bob")).expect("json");
    let err = store.deserialize(&mismatched).await.unwrap_err();
    assert!(matches!(
        err,
        recordvault::Error::Store(StoreError::MembershipMismatch { .. })
    ));
    assert_eq!(membership(&store), expected);

    let raw = store.serialize().await.expect("serialize");
    for account in [&alice, &bob] {
        let opened = SharedStore::open(&raw, account).await.expect("member opens");
        assert_eq!(opened.len(), 1);
    }
}

#[tokio::test]
async fn test_older_snapshot_keeps_member_added_since() {
    let (mut store, alice) = test_shared_store("alice");
    store.add_record(record_at(&store, "early", at(0)));
    let before_bob = store.serialize().await.expect("serialize");

    let bob = test_account("bob");
    store.add_member(&bob).expect("add bob");
    store
        .deserialize(&before_bob)
        .await
        .expect("merge older snapshot");

    assert_eq!(
        membership(&store),
        (
            vec!["alice".to_string(), "bob".to_string()],
            vec!["alice".to_string(), "bob".to_string()],
        )
    );

    let raw = store.serialize().await.expect("serialize");
    let as_bob = SharedStore::open(&raw, &bob).await.expect("bob opens");
    assert_eq!(as_bob.len(), 1);
    SharedStore::open(&raw, &alice).await.expect("alice opens");
}

#[tokio::test]
async fn test_relabeled_envelope_id_is_rejected() {
    let (mut store, alice) = test_shared_store("alice");
    let raw = store.serialize().await.expect("serialize");

    let mut envelope: serde_json::Value = serde_json::from_slice(&raw).expect("json");
    envelope["id"] = serde_json::Value::String("hijacked".into());
    let relabeled = serde_json::to_vec(&envelope).expect("json");

    let err = SharedStore::open(&relabeled, &alice).await.unwrap_err();
    assert!(err.is_decryption_failed());
}
