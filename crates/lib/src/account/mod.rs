//! Account identities consumed by containers and stores.
//!
//! Accounts are owned by the identity subsystem; this module only models what
//! the store core needs from them. A [`PublicAccount`] is enough to add a
//! participant or match a wrapped-key entry. An [`Account`] additionally holds
//! the private key needed to unwrap a content key.

pub mod keys;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use keys::{PrivateKey, PublicKey, generate_keypair};

/// Anything that exposes a stable public identity.
pub trait Identity {
    /// Stable account identifier used to match participant entries.
    fn identity(&self) -> &str;

    /// Public key content keys are wrapped under.
    fn public_key(&self) -> &PublicKey;

    /// Project onto the public half of the identity.
    fn to_public_account(&self) -> PublicAccount {
        PublicAccount {
            id: self.identity().to_string(),
            public_key: *self.public_key(),
        }
    }
}

/// The public half of an account.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicAccount {
    pub id: String,
    pub public_key: PublicKey,
}

impl PublicAccount {
    pub fn new(id: impl Into<String>, public_key: PublicKey) -> Self {
        Self {
            id: id.into(),
            public_key,
        }
    }
}

impl Identity for PublicAccount {
    fn identity(&self) -> &str {
        &self.id
    }

    fn public_key(&self) -> &PublicKey {
        &self.public_key
    }
}

/// A local account with its private key.
#[derive(Clone)]
pub struct Account {
    id: String,
    public_key: PublicKey,
    private_key: PrivateKey,
}

impl Account {
    /// Build an account from an existing private key.
    pub fn new(id: impl Into<String>, private_key: PrivateKey) -> Self {
        Self {
            id: id.into(),
            public_key: private_key.public_key(),
            private_key,
        }
    }

    /// Create an account with a freshly generated key pair.
    pub fn generate(id: impl Into<String>) -> Self {
        Self::new(id, PrivateKey::generate())
    }

    pub fn private_key(&self) -> &PrivateKey {
        &self.private_key
    }
}

impl Identity for Account {
    fn identity(&self) -> &str {
        &self.id
    }

    fn public_key(&self) -> &PublicKey {
        &self.public_key
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("id", &self.id)
            .field("public_key", &self.public_key.fingerprint())
            .finish_non_exhaustive()
    }
}
