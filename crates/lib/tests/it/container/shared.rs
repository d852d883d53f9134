//! Shared-scheme participant tests.

use recordvault::{Container, EncryptionScheme, Identity};

use super::helpers::*;
use crate::helpers::*;

fn shared_container() -> Container {
    let mut container = Container::new(EncryptionScheme::Shared);
    container
        .initialize_key()
        .expect("Failed to generate content key");
    container
}

#[tokio::test]
async fn test_each_participant_can_unlock() {
    let alice = test_account("alice");
    let bob = test_account("bob");
    let mut container = shared_container();
    container.add_participant(&alice).expect("add alice");
    container.add_participant(&bob).expect("add bob");
    let raw = sealed_envelope(&mut container, b"team secret").await;

    for account in [&alice, &bob] {
        let mut reopened = Container::new(EncryptionScheme::Shared);
        reopened.deserialize(&raw).expect("Failed to load envelope");
        reopened.unlock(account).expect("Failed to unlock");
        assert_eq!(reopened.key_fingerprint(), container.key_fingerprint());
        assert_eq!(read_note(&mut reopened).await.expect("read"), b"team secret");
    }
}

#[tokio::test]
async fn test_late_participant_reads_earlier_data() {
    let alice = test_account("alice");
    let carol = test_account("carol");
    let mut container = shared_container();
    container.add_participant(&alice).expect("add alice");
    let before = sealed_envelope(&mut container, b"written before carol").await;

    // Alice reopens the old envelope and adds carol.
    let mut as_alice = Container::new(EncryptionScheme::Shared);
    as_alice.deserialize(&before).expect("load");
    as_alice.unlock(&alice).expect("unlock");
    as_alice.add_participant(&carol.to_public_account()).expect("add carol");
    let after = as_alice.serialize().expect("serialize");

    let mut as_carol = Container::new(EncryptionScheme::Shared);
    as_carol.deserialize(&after).expect("load");
    as_carol.unlock(&carol).expect("Carol should be able to unlock");
    assert_eq!(
        read_note(&mut as_carol).await.expect("read"),
        b"written before carol"
    );
}

#[tokio::test]
async fn test_outsider_gets_key_not_found() {
    let alice = test_account("alice");
    let mut container = shared_container();
    container.add_participant(&alice).expect("add alice");
    let raw = sealed_envelope(&mut container, b"x").await;

    let mut reopened = Container::new(EncryptionScheme::Shared);
    reopened.deserialize(&raw).expect("load");
    let err = reopened.unlock(&test_account("mallory")).unwrap_err();
    assert!(err.is_key_not_found());
    assert!(!reopened.is_unlocked());
}

#[tokio::test]
async fn test_mismatched_key_pair_is_decryption_failure() {
    let alice = test_account("alice");
    let mut container = shared_container();
    container.add_participant(&alice).expect("add alice");
    let raw = sealed_envelope(&mut container, b"x").await;

    // Same id, different key pair.
    let impostor = test_account("alice");
    let mut reopened = Container::new(EncryptionScheme::Shared);
    reopened.deserialize(&raw).expect("load");
    let err = reopened.unlock(&impostor).unwrap_err();
    assert!(err.is_decryption_failed());
}

#[test]
fn test_adding_participant_requires_unlock() {
    let mut container = Container::new(EncryptionScheme::Shared);
    let err = container
        .add_participant(&test_account("alice"))
        .unwrap_err();
    assert!(err.is_not_unlocked());
    assert!(container.participants().is_empty());
}

#[test]
fn test_re_adding_replaces_wrapped_key() {
    let alice = test_account("alice");
    let mut container = shared_container();
    container.add_participant(&alice).expect("add");
    container.add_participant(&alice).expect("re-add");
    assert_eq!(container.participants().len(), 1);

    // Re-adding under a new key pair re-targets the entry.
    let rotated = test_account("alice");
    container.add_participant(&rotated).expect("re-add rotated");
    assert_eq!(container.participants().len(), 1);
    assert_eq!(
        &container.participant("alice").expect("entry").public_identity.public_key,
        rotated.public_key()
    );
    container.clear();
    assert!(container.unlock(&alice).unwrap_err().is_decryption_failed());
    container.unlock(&rotated).expect("Rotated key should unlock");
}

#[tokio::test]
async fn test_participants_are_serialized() {
    let alice = test_account("alice");
    let mut container = shared_container();
    container.add_participant(&alice).expect("add");
    let raw = sealed_envelope(&mut container, b"x").await;

    let json: serde_json::Value = serde_json::from_slice(&raw).expect("json");
    assert_eq!(json["scheme"], "shared");
    let participants = json["participants"].as_array().expect("participants");
    assert_eq!(participants.len(), 1);
    assert_eq!(participants[0]["publicIdentity"]["id"], "alice");
    assert!(participants[0]["wrappedKey"]["ephemeralKey"].is_string());
}
