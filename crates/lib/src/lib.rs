//!
//! Recordvault: an encrypted, mergeable record store.
//! This library provides the core components for keeping a collection of
//! records private at rest while allowing independent copies to converge.
//!
//! ## Core Concepts
//!
//! * **Records (`store::Record`)**: The unit of user data. A record carries a
//!   unique id, a name, fields, tags and an `updated` timestamp that drives
//!   last-write-wins merging. Deleting a record leaves a tombstone so the
//!   deletion propagates.
//! * **Containers (`container::Container`)**: An encryption envelope around a
//!   [`container::Storable`] payload. The envelope's scheme decides how the
//!   content key is obtained: generated at random, derived from a password, or
//!   wrapped individually for each participant account.
//! * **Stores (`store::Store`)**: A record collection bound to a container.
//!   Serializing a store seals its records; deserializing merges the decrypted
//!   records into whatever the store already holds.
//!     * **MainStore (`store::MainStore`)**: The private, password-protected root
//!       store of a local identity. It also keeps the identity's private key and
//!       its trusted accounts.
//!     * **SharedStore (`store::SharedStore`)**: A store shared between several
//!       accounts, each holding its own wrapped copy of the content key.
//! * **Accounts (`account::Account`)**: Identities with an X25519 key pair used
//!   to wrap and unwrap content keys.

pub mod account;
pub mod clock;
pub mod constants;
pub mod container;
pub mod crypto;
mod encoding;
pub mod store;

pub use account::{Account, Identity, PublicAccount};
pub use clock::{Clock, SystemClock};
#[cfg(any(test, feature = "testing"))]
pub use clock::FixedClock;
pub use container::{Container, Participant, Storable};
pub use crypto::{EncryptionScheme, KdfParams, Password, StoreKind};
pub use store::{Field, MainStore, PlainStore, Record, SharedStore, Store};

/// Result type used throughout the Recordvault library.
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for the Recordvault library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Structured errors from the crypto and container layer
    #[error(transparent)]
    Crypto(crypto::CryptoError),

    /// Structured errors from the store layer
    #[error(transparent)]
    Store(store::StoreError),
}

impl Error {
    /// Get the originating module for this error.
    pub fn module(&self) -> &'static str {
        match self {
            Error::Crypto(_) => "crypto",
            Error::Store(_) => "store",
            Error::Serialize(_) => "serialize",
        }
    }

    /// Check if this error is an authenticated decryption failure.
    ///
    /// Wrong passwords, wrong key pairs and tampered ciphertext all land here.
    pub fn is_decryption_failed(&self) -> bool {
        match self {
            Error::Crypto(crypto_err) => crypto_err.is_decryption_failed(),
            _ => false,
        }
    }

    /// Check if this error indicates the account has no wrapped key.
    pub fn is_key_not_found(&self) -> bool {
        match self {
            Error::Crypto(crypto_err) => crypto_err.is_key_not_found(),
            _ => false,
        }
    }

    /// Check if this error indicates missing key material.
    pub fn is_not_unlocked(&self) -> bool {
        match self {
            Error::Crypto(crypto_err) => crypto_err.is_not_unlocked(),
            _ => false,
        }
    }

    /// Check if this error indicates an unknown envelope scheme.
    pub fn is_unsupported_scheme(&self) -> bool {
        match self {
            Error::Crypto(crypto_err) => crypto_err.is_unsupported_scheme(),
            _ => false,
        }
    }

    /// Check if this error indicates a record was not found.
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::Store(store_err) => store_err.is_not_found(),
            _ => false,
        }
    }

    /// Check if this error is caused by malformed input.
    pub fn is_format_error(&self) -> bool {
        match self {
            Error::Crypto(crypto_err) => crypto_err.is_format_error(),
            Error::Store(store_err) => store_err.is_serialization_error(),
            Error::Serialize(_) => true,
        }
    }

    /// Check if this error is store-related.
    pub fn is_store_error(&self) -> bool {
        matches!(self, Error::Store(_))
    }
}
