//! Encryption scheme selection.
//!
//! A store's kind fully determines how its content key is obtained:
//!
//! | Kind | Scheme | Content key |
//! |---|---|---|
//! | [`StoreKind::Plain`] | [`EncryptionScheme::Simple`] | random, not bound to anything |
//! | [`StoreKind::Main`] | [`EncryptionScheme::PasswordDerived`] | Argon2id(password, salt) |
//! | [`StoreKind::Shared`] | [`EncryptionScheme::Shared`] | random, wrapped per participant |

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::CryptoError;
use crate::constants::{SCHEME_PASSWORD, SCHEME_SHARED, SCHEME_SIMPLE};

/// Cryptographic construction used by a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EncryptionScheme {
    /// Random content key with no external binding.
    Simple,
    /// Content key derived from a password and a random per-container salt.
    PasswordDerived,
    /// Random content key distributed to participants by public-key wrapping.
    Shared,
}

impl EncryptionScheme {
    /// The tag written into serialized envelopes.
    pub fn as_tag(&self) -> &'static str {
        match self {
            EncryptionScheme::Simple => SCHEME_SIMPLE,
            EncryptionScheme::PasswordDerived => SCHEME_PASSWORD,
            EncryptionScheme::Shared => SCHEME_SHARED,
        }
    }

    /// Whether the content key comes from a password.
    pub fn is_password_derived(&self) -> bool {
        matches!(self, EncryptionScheme::PasswordDerived)
    }

    /// Whether the content key is wrapped for participants.
    pub fn uses_participants(&self) -> bool {
        matches!(self, EncryptionScheme::Shared)
    }
}

impl fmt::Display for EncryptionScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tag())
    }
}

impl FromStr for EncryptionScheme {
    type Err = CryptoError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag {
            SCHEME_SIMPLE => Ok(EncryptionScheme::Simple),
            SCHEME_PASSWORD => Ok(EncryptionScheme::PasswordDerived),
            SCHEME_SHARED => Ok(EncryptionScheme::Shared),
            other => Err(CryptoError::UnsupportedScheme {
                scheme: other.to_string(),
            }),
        }
    }
}

impl Serialize for EncryptionScheme {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_tag())
    }
}

impl<'de> Deserialize<'de> for EncryptionScheme {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        tag.parse().map_err(serde::de::Error::custom)
    }
}

/// The kinds of store this crate knows how to persist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKind {
    /// Ephemeral store not bound to any identity.
    Plain,
    /// The private root store of a local identity.
    Main,
    /// A store shared between several accounts.
    Shared,
}

impl StoreKind {
    /// Select the encryption scheme for this store kind.
    pub const fn scheme(self) -> EncryptionScheme {
        match self {
            StoreKind::Plain => EncryptionScheme::Simple,
            StoreKind::Main => EncryptionScheme::PasswordDerived,
            StoreKind::Shared => EncryptionScheme::Shared,
        }
    }
}
