//! Content-key wrapping for shared containers.
//!
//! A content key is wrapped for a recipient with an ephemeral-static X25519
//! exchange:
//!
//! ```text
//! E        = fresh ephemeral X25519 key pair
//! shared   = X25519(E.secret, recipient.public)
//! kek      = HKDF-SHA256(salt = E.public || recipient.public, ikm = shared, info = WRAP_INFO)
//! wrapped  = AES-256-GCM(kek, nonce, content_key)
//! ```
//!
//! Only the holder of the recipient's private key can recompute `kek`.

use hkdf::Hkdf;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use x25519_dalek::{EphemeralSecret, PublicKey as X25519Public, SharedSecret};
use zeroize::Zeroizing;

use super::aead::{self, ContentKey, KEY_LENGTH, Sealed};
use super::errors::CryptoError;
use crate::Result;
use crate::account::{PrivateKey, PublicKey};
use crate::constants::WRAP_INFO;

/// A content key wrapped under one participant's public key.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WrappedKey {
    /// Ephemeral X25519 public key used for this wrap.
    #[serde(with = "crate::encoding::base64")]
    pub ephemeral_key: Vec<u8>,
    /// The sealed content key.
    #[serde(flatten)]
    pub sealed: Sealed,
}

fn key_encryption_key(
    shared: &SharedSecret,
    ephemeral: &[u8; 32],
    recipient: &[u8; 32],
) -> Result<ContentKey> {
    if !shared.was_contributory() {
        return Err(CryptoError::DecryptionFailed.into());
    }

    let mut salt = [0u8; 64];
    salt[..32].copy_from_slice(ephemeral);
    salt[32..].copy_from_slice(recipient);

    let hk = Hkdf::<Sha256>::new(Some(&salt), shared.as_bytes());
    let mut okm = Zeroizing::new([0u8; KEY_LENGTH]);
    hk.expand(WRAP_INFO, okm.as_mut_slice())
        .map_err(|e| CryptoError::EncryptionFailed {
            reason: format!("HKDF expand failed: {e}"),
        })?;
    Ok(ContentKey::from_bytes(*okm))
}

/// Wrap `content_key` so that only the owner of `recipient` can unwrap it.
pub fn wrap_key(content_key: &ContentKey, recipient: &PublicKey) -> Result<WrappedKey> {
    let PublicKey::X25519(recipient_key) = recipient;

    let ephemeral = EphemeralSecret::random_from_rng(OsRng);
    let ephemeral_public = X25519Public::from(&ephemeral);
    let shared = ephemeral.diffie_hellman(recipient_key);

    let kek = key_encryption_key(&shared, ephemeral_public.as_bytes(), recipient_key.as_bytes())
        .map_err(|_| CryptoError::EncryptionFailed {
            reason: "recipient public key is not contributory".to_string(),
        })?;
    let sealed = aead::seal(&kek, content_key.as_bytes())?;

    Ok(WrappedKey {
        ephemeral_key: ephemeral_public.as_bytes().to_vec(),
        sealed,
    })
}

/// Recover a content key wrapped for the owner of `private_key`.
///
/// Any failure, including a mismatched key pair, is reported as
/// [`CryptoError::DecryptionFailed`].
pub fn unwrap_key(wrapped: &WrappedKey, private_key: &PrivateKey) -> Result<ContentKey> {
    let ephemeral: [u8; 32] = wrapped
        .ephemeral_key
        .as_slice()
        .try_into()
        .map_err(|_| CryptoError::DecryptionFailed)?;
    let ephemeral_public = X25519Public::from(ephemeral);

    let secret = private_key.x25519();
    let recipient_public = X25519Public::from(secret);
    let shared = secret.diffie_hellman(&ephemeral_public);

    let kek = key_encryption_key(&shared, &ephemeral, recipient_public.as_bytes())?;
    let plaintext = aead::open(&kek, &wrapped.sealed)?;
    ContentKey::try_from_slice(&plaintext).map_err(|_| CryptoError::DecryptionFailed.into())
}
