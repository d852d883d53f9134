//! Password-based key derivation (Argon2id).
//!
//! Deriving twice from the same password, salt and parameters yields the same
//! [`ContentKey`]; a fresh salt yields a different one. The parameters are
//! persisted next to the salt so that changing the defaults never breaks
//! existing containers.

use std::fmt;

use argon2::{Algorithm, Argon2, Params, Version};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::aead::{ContentKey, KEY_LENGTH};
use super::errors::CryptoError;
use crate::Result;

/// Salt length in bytes
pub const SALT_LENGTH: usize = 16;

/// Default Argon2 memory cost in KiB (19 MiB)
pub const DEFAULT_ARGON2_M_COST: u32 = 19 * 1024;
/// Default Argon2 time cost (iterations)
pub const DEFAULT_ARGON2_T_COST: u32 = 2;
/// Default Argon2 parallelism
pub const DEFAULT_ARGON2_P_COST: u32 = 1;

/// Largest accepted Argon2 memory cost in KiB (1 GiB)
pub const MAX_ARGON2_M_COST: u32 = 1024 * 1024;
/// Largest accepted Argon2 time cost
pub const MAX_ARGON2_T_COST: u32 = 16;
/// Largest accepted Argon2 parallelism
pub const MAX_ARGON2_P_COST: u32 = 16;

/// Argon2id cost parameters.
///
/// Missing fields in older envelopes fall back to the defaults.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct KdfParams {
    /// Memory cost in KiB
    #[serde(default = "default_m_cost")]
    pub m_cost: u32,
    /// Time cost (iterations)
    #[serde(default = "default_t_cost")]
    pub t_cost: u32,
    /// Parallelism
    #[serde(default = "default_p_cost")]
    pub p_cost: u32,
}

fn default_m_cost() -> u32 {
    DEFAULT_ARGON2_M_COST
}

fn default_t_cost() -> u32 {
    DEFAULT_ARGON2_T_COST
}

fn default_p_cost() -> u32 {
    DEFAULT_ARGON2_P_COST
}

impl KdfParams {
    pub fn new(m_cost: u32, t_cost: u32, p_cost: u32) -> Self {
        Self {
            m_cost,
            t_cost,
            p_cost,
        }
    }

    /// Describe the first cost above the accepted maximum, if any.
    ///
    /// Parameters read from an envelope must pass this before any derivation.
    pub fn limit_violation(&self) -> Option<String> {
        if self.m_cost > MAX_ARGON2_M_COST {
            Some(format!(
                "m_cost {} exceeds maximum {MAX_ARGON2_M_COST}",
                self.m_cost
            ))
        } else if self.t_cost > MAX_ARGON2_T_COST {
            Some(format!(
                "t_cost {} exceeds maximum {MAX_ARGON2_T_COST}",
                self.t_cost
            ))
        } else if self.p_cost > MAX_ARGON2_P_COST {
            Some(format!(
                "p_cost {} exceeds maximum {MAX_ARGON2_P_COST}",
                self.p_cost
            ))
        } else {
            None
        }
    }

    fn argon2(&self) -> Result<Argon2<'static>> {
        if let Some(reason) = self.limit_violation() {
            return Err(CryptoError::KeyDerivationFailed { reason }.into());
        }
        let params = Params::new(self.m_cost, self.t_cost, self.p_cost, Some(KEY_LENGTH))
            .map_err(|e| CryptoError::KeyDerivationFailed {
                reason: format!("Invalid Argon2 parameters: {e}"),
            })?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }
}

impl Default for KdfParams {
    fn default() -> Self {
        Self::new(
            DEFAULT_ARGON2_M_COST,
            DEFAULT_ARGON2_T_COST,
            DEFAULT_ARGON2_P_COST,
        )
    }
}

/// Random per-container salt.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Salt([u8; SALT_LENGTH]);

impl Salt {
    /// Generate a fresh random salt.
    pub fn generate() -> Self {
        let mut bytes = [0u8; SALT_LENGTH];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; SALT_LENGTH]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; SALT_LENGTH] {
        &self.0
    }
}

impl fmt::Debug for Salt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Salt({})", hex::encode(self.0))
    }
}

impl Serialize for Salt {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        crate::encoding::base64::serialize(&self.0, serializer)
    }
}

impl<'de> Deserialize<'de> for Salt {
    fn deserialize<D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        let bytes = crate::encoding::base64::deserialize(deserializer)?;
        let array: [u8; SALT_LENGTH] = bytes.try_into().map_err(|v: Vec<u8>| {
            serde::de::Error::custom(format!(
                "salt must be {SALT_LENGTH} bytes, got {}",
                v.len()
            ))
        })?;
        Ok(Salt(array))
    }
}

/// A user-supplied password, zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Password(String);

impl Password {
    pub fn new(password: impl Into<String>) -> Self {
        Self(password.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(<redacted>)")
    }
}

impl PartialEq for Password {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl From<&str> for Password {
    fn from(value: &str) -> Self {
        Password::new(value)
    }
}

impl From<String> for Password {
    fn from(value: String) -> Self {
        Password::new(value)
    }
}

/// Derive a content key from a password and salt.
///
/// This is CPU and memory hard; async callers should use [`derive_key_async`].
pub fn derive_key(password: &Password, salt: &Salt, params: &KdfParams) -> Result<ContentKey> {
    let argon2 = params.argon2()?;
    let mut key = [0u8; KEY_LENGTH];
    let derived = argon2
        .hash_password_into(password.as_str().as_bytes(), salt.as_bytes(), &mut key)
        .map_err(|e| CryptoError::KeyDerivationFailed {
            reason: format!("Key derivation failed: {e}"),
        });
    let result = derived.map(|_| ContentKey::from_bytes(key));
    key.zeroize();
    Ok(result?)
}

/// Derive a content key on the blocking thread pool.
pub async fn derive_key_async(
    password: Password,
    salt: Salt,
    params: KdfParams,
) -> Result<ContentKey> {
    tokio::task::spawn_blocking(move || derive_key(&password, &salt, &params))
        .await
        .map_err(|e| CryptoError::KeyDerivationFailed {
            reason: format!("Derivation task failed: {e}"),
        })?
}
