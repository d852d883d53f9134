//! Cryptographic building blocks for containers.
//!
//! - [`scheme`]: store kind to encryption scheme policy
//! - [`aead`]: content keys and AES-256-GCM sealing
//! - [`kdf`]: Argon2id password derivation
//! - [`wrap`]: X25519 + HKDF content-key wrapping for participants

pub mod aead;
pub mod errors;
pub mod kdf;
pub mod scheme;
pub mod wrap;

pub use aead::{ContentKey, Sealed, open, open_with_aad, seal, seal_with_aad};
pub use errors::CryptoError;
pub use kdf::{
    KdfParams, MAX_ARGON2_M_COST, MAX_ARGON2_P_COST, MAX_ARGON2_T_COST, Password, Salt, derive_key,
    derive_key_async,
};
pub use scheme::{EncryptionScheme, StoreKind};
pub use wrap::{WrappedKey, unwrap_key, wrap_key};
