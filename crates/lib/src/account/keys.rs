//! Key-pair types for account identities.
//!
//! The `PublicKey` and `PrivateKey` enums keep the wire format algorithm-tagged
//! (`"x25519:<base64>"`) so further algorithms can be added without breaking
//! stored envelopes.

use std::fmt;

use base64ct::{Base64, Encoding};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use x25519_dalek::StaticSecret;
use zeroize::Zeroizing;

use crate::Result;
use crate::crypto::CryptoError;

/// Size of X25519 keys in bytes
pub const X25519_KEY_SIZE: usize = 32;

/// Algorithm-agnostic public key used to wrap content keys.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PublicKey {
    /// X25519 public key (32 bytes)
    X25519(x25519_dalek::PublicKey),
}

impl PublicKey {
    /// Format the public key as a prefixed string (e.g. `"x25519:base64..."`).
    pub fn to_prefixed_string(&self) -> String {
        match self {
            PublicKey::X25519(key) => {
                format!("x25519:{}", Base64::encode_string(key.as_bytes()))
            }
        }
    }

    /// Parse a public key from a prefixed string (e.g. `"x25519:base64..."`).
    pub fn from_prefixed_string(s: &str) -> Result<Self> {
        let (prefix, data) = split_prefixed(s)?;
        match prefix {
            "x25519" => {
                let bytes = decode_key_bytes(data)?;
                Ok(PublicKey::X25519(x25519_dalek::PublicKey::from(*bytes)))
            }
            _ => Err(unknown_prefix(prefix)),
        }
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8; X25519_KEY_SIZE] {
        match self {
            PublicKey::X25519(key) => key.as_bytes(),
        }
    }

    /// Short hex fingerprint, safe to log.
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.as_bytes());
        hex::encode(&digest[..8])
    }

    /// Get the algorithm name for this key.
    pub fn algorithm(&self) -> &'static str {
        match self {
            PublicKey::X25519(_) => "x25519",
        }
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_prefixed_string())
    }
}

impl serde::Serialize for PublicKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_prefixed_string())
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        PublicKey::from_prefixed_string(&s).map_err(serde::de::Error::custom)
    }
}

/// Algorithm-agnostic private key used to unwrap content keys.
///
/// Secret material is zeroed on drop by the inner key type.
#[non_exhaustive]
#[derive(Clone)]
pub enum PrivateKey {
    /// X25519 static secret (32 bytes)
    X25519(StaticSecret),
}

impl PrivateKey {
    /// Generate a new random private key.
    pub fn generate() -> Self {
        PrivateKey::X25519(StaticSecret::random_from_rng(rand::rngs::OsRng))
    }

    /// The matching public key.
    pub fn public_key(&self) -> PublicKey {
        match self {
            PrivateKey::X25519(secret) => PublicKey::X25519(x25519_dalek::PublicKey::from(secret)),
        }
    }

    pub(crate) fn x25519(&self) -> &StaticSecret {
        match self {
            PrivateKey::X25519(secret) => secret,
        }
    }

    /// Format the private key as a prefixed string. The result holds secret
    /// material and is zeroized on drop.
    pub fn to_prefixed_string(&self) -> Zeroizing<String> {
        match self {
            PrivateKey::X25519(secret) => {
                let bytes = Zeroizing::new(secret.to_bytes());
                Zeroizing::new(format!("x25519:{}", Base64::encode_string(&bytes[..])))
            }
        }
    }

    /// Parse a private key from a prefixed string.
    pub fn from_prefixed_string(s: &str) -> Result<Self> {
        let (prefix, data) = split_prefixed(s)?;
        match prefix {
            "x25519" => {
                let bytes = decode_key_bytes(data)?;
                Ok(PrivateKey::X25519(StaticSecret::from(*bytes)))
            }
            _ => Err(unknown_prefix(prefix)),
        }
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrivateKey({}:<redacted>)", self.public_key().algorithm())
    }
}

impl PartialEq for PrivateKey {
    fn eq(&self, other: &Self) -> bool {
        self.public_key() == other.public_key()
    }
}

impl Eq for PrivateKey {}

impl serde::Serialize for PrivateKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_prefixed_string())
    }
}

impl<'de> Deserialize<'de> for PrivateKey {
    fn deserialize<D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        let s = Zeroizing::new(String::deserialize(deserializer)?);
        PrivateKey::from_prefixed_string(&s).map_err(serde::de::Error::custom)
    }
}

/// Generate a new key pair.
pub fn generate_keypair() -> (PrivateKey, PublicKey) {
    let private_key = PrivateKey::generate();
    let public_key = private_key.public_key();
    (private_key, public_key)
}

fn split_prefixed(s: &str) -> Result<(&str, &str)> {
    s.split_once(':').ok_or_else(|| {
        CryptoError::InvalidKeyFormat {
            reason: "Expected 'algorithm:key' format".to_string(),
        }
        .into()
    })
}

fn unknown_prefix(prefix: &str) -> crate::Error {
    CryptoError::InvalidKeyFormat {
        reason: format!("Unknown key algorithm prefix: '{prefix}'"),
    }
    .into()
}

fn decode_key_bytes(data: &str) -> Result<Zeroizing<[u8; X25519_KEY_SIZE]>> {
    let bytes = Zeroizing::new(Base64::decode_vec(data).map_err(|e| {
        CryptoError::InvalidKeyFormat {
            reason: format!("Invalid base64 for key: {e}"),
        }
    })?);
    let array: [u8; X25519_KEY_SIZE] =
        bytes
            .as_slice()
            .try_into()
            .map_err(|_| CryptoError::InvalidKeyFormat {
                reason: format!(
                    "X25519 key must be {X25519_KEY_SIZE} bytes, got {}",
                    bytes.len()
                ),
            })?;
    Ok(Zeroizing::new(array))
}
