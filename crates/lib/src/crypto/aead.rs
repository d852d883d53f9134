//! Content keys and AES-256-GCM sealing.
//!
//! Every call to [`seal`] draws a fresh random 96-bit nonce, so sealing the
//! same plaintext twice yields different ciphertexts. [`open`] authenticates
//! before returning anything and reports every failure as
//! [`CryptoError::DecryptionFailed`].

use std::fmt;

use aes_gcm::{
    Aes256Gcm, KeyInit, Nonce,
    aead::{Aead, AeadCore, OsRng, Payload},
};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use super::errors::CryptoError;
use crate::Result;

/// Symmetric key length for AES-256 (32 bytes)
pub const KEY_LENGTH: usize = 32;

/// Nonce length for AES-GCM (12 bytes standard)
pub const NONCE_LENGTH: usize = 12;

/// The symmetric key that directly encrypts a store payload.
///
/// Zeroized on drop. `Debug` never prints key bytes.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct ContentKey([u8; KEY_LENGTH]);

impl ContentKey {
    /// Generate a fresh random content key.
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_LENGTH];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Build a key from raw bytes.
    pub fn from_bytes(bytes: [u8; KEY_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Build a key from a byte slice, rejecting wrong lengths.
    pub fn try_from_slice(bytes: &[u8]) -> Result<Self> {
        let array: [u8; KEY_LENGTH] =
            bytes
                .try_into()
                .map_err(|_| CryptoError::InvalidKeyFormat {
                    reason: format!("expected {KEY_LENGTH} key bytes, got {}", bytes.len()),
                })?;
        Ok(Self(array))
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_LENGTH] {
        &self.0
    }

    fn cipher(&self) -> Result<Aes256Gcm> {
        Aes256Gcm::new_from_slice(&self.0).map_err(|e| {
            CryptoError::EncryptionFailed {
                reason: format!("Failed to create cipher: {e}"),
            }
            .into()
        })
    }
}

impl PartialEq for ContentKey {
    fn eq(&self, other: &Self) -> bool {
        self.0
            .iter()
            .zip(other.0.iter())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}

impl Eq for ContentKey {}

impl fmt::Debug for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ContentKey(<redacted>)")
    }
}

/// An authenticated ciphertext together with the nonce it was sealed under.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Sealed {
    /// 12-byte AES-GCM nonce, unique per encryption.
    #[serde(with = "crate::encoding::base64")]
    pub nonce: Vec<u8>,
    /// Ciphertext with the 16-byte authentication tag appended.
    #[serde(with = "crate::encoding::base64")]
    pub ciphertext: Vec<u8>,
}

/// Encrypt `plaintext` under `key` with a fresh random nonce.
pub fn seal(key: &ContentKey, plaintext: &[u8]) -> Result<Sealed> {
    seal_with_aad(key, plaintext, &[])
}

/// Encrypt `plaintext`, authenticating `aad` alongside it.
///
/// The same `aad` must be passed to [`open_with_aad`].
pub fn seal_with_aad(key: &ContentKey, plaintext: &[u8], aad: &[u8]) -> Result<Sealed> {
    let cipher = key.cipher()?;
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
    let ciphertext = cipher
        .encrypt(
            &nonce,
            Payload {
                msg: plaintext,
                aad,
            },
        )
        .map_err(|e| CryptoError::EncryptionFailed {
            reason: format!("Encryption failed: {e}"),
        })?;

    Ok(Sealed {
        nonce: nonce.to_vec(),
        ciphertext,
    })
}

/// Authenticate and decrypt `sealed` under `key`.
pub fn open(key: &ContentKey, sealed: &Sealed) -> Result<Zeroizing<Vec<u8>>> {
    open_with_aad(key, sealed, &[])
}

/// Authenticate `sealed` together with `aad` and decrypt it.
pub fn open_with_aad(key: &ContentKey, sealed: &Sealed, aad: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    if sealed.nonce.len() != NONCE_LENGTH {
        return Err(CryptoError::DecryptionFailed.into());
    }

    let cipher = key.cipher()?;
    let nonce = Nonce::from_slice(&sealed.nonce);
    cipher
        .decrypt(
            nonce,
            Payload {
                msg: sealed.ciphertext.as_slice(),
                aad,
            },
        )
        .map(Zeroizing::new)
        .map_err(|_| CryptoError::DecryptionFailed.into())
}
