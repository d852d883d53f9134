//! Scheme-specific key handling: simple, password-derived and shared.

use recordvault::{Container, EncryptionScheme, StoreKind};

use super::helpers::*;
use crate::helpers::*;

#[test]
fn test_store_kinds_select_schemes() {
    assert_eq!(StoreKind::Plain.scheme(), EncryptionScheme::Simple);
    assert_eq!(StoreKind::Main.scheme(), EncryptionScheme::PasswordDerived);
    assert_eq!(StoreKind::Shared.scheme(), EncryptionScheme::Shared);
}

#[tokio::test]
async fn test_simple_container_round_trip() {
    let mut container = Container::new(EncryptionScheme::Simple);
    let raw = sealed_envelope(&mut container, b"scratch").await;
    assert!(!raw.windows(7).any(|w| w == b"scratch"));

    container.deserialize(&raw).expect("Failed to load envelope");
    assert_eq!(read_note(&mut container).await.expect("read"), b"scratch");
}

#[tokio::test]
async fn test_password_container_reopens_with_same_password() {
    let mut container = password_container("hunter2");
    let raw = sealed_envelope(&mut container, b"top secret").await;

    let mut reopened = password_container("hunter2");
    reopened.deserialize(&raw).expect("Failed to load envelope");
    assert!(!reopened.is_unlocked());
    let body = read_note(&mut reopened).await.expect("Failed to decrypt");
    assert_eq!(body, b"top secret");
    assert!(reopened.is_unlocked());
    assert_eq!(reopened.key_fingerprint(), container.key_fingerprint());
}

#[tokio::test]
async fn test_wrong_password_is_decryption_failure() {
    let mut container = password_container("right");
    let raw = sealed_envelope(&mut container, b"data").await;

    let mut reopened = password_container("wrong");
    reopened.deserialize(&raw).expect("Failed to load envelope");
    let err = read_note(&mut reopened).await.unwrap_err();
    assert!(err.is_decryption_failed());

    // A corrected password works on the same instance.
    reopened.set_password("right").expect("set password");
    assert_eq!(read_note(&mut reopened).await.expect("read"), b"data");
}

#[tokio::test]
async fn test_setting_password_drops_cached_key() {
    let mut container = password_container("one");
    sealed_envelope(&mut container, b"data").await;
    assert!(container.is_unlocked());

    container.set_password("two").expect("set password");
    assert!(!container.is_unlocked());
    assert_eq!(container.password().map(|p| p.as_str()), Some("two"));
}

#[tokio::test]
async fn test_password_container_without_password_is_not_unlocked() {
    let mut sealed = password_container("pw");
    let raw = sealed_envelope(&mut sealed, b"data").await;

    let mut container =
        Container::new(EncryptionScheme::PasswordDerived).with_kdf_params(test_kdf_params());
    container.deserialize(&raw).expect("Failed to load envelope");
    let err = read_note(&mut container).await.unwrap_err();
    assert!(err.is_not_unlocked());
}

#[tokio::test]
async fn test_clear_requires_rederivation() {
    let mut container = password_container("pw");
    let raw = sealed_envelope(&mut container, b"data").await;

    container.clear();
    assert!(!container.is_unlocked());
    assert!(container.password().is_none());
    assert!(read_note(&mut container).await.unwrap_err().is_not_unlocked());

    container.deserialize(&raw).expect("Failed to load envelope");
    container.set_password("pw").expect("set password");
    assert_eq!(read_note(&mut container).await.expect("read"), b"data");
}

#[tokio::test]
async fn test_kdf_params_travel_with_envelope() {
    let mut container = password_container("pw");
    let raw = sealed_envelope(&mut container, b"data").await;

    // A container configured with default costs still derives with the
    // costs the envelope was sealed under.
    let mut reopened = Container::new(EncryptionScheme::PasswordDerived);
    reopened.set_password("pw").expect("set password");
    reopened.deserialize(&raw).expect("Failed to load envelope");
    assert_eq!(reopened.kdf_params(), &test_kdf_params());
    assert_eq!(read_note(&mut reopened).await.expect("read"), b"data");
}
