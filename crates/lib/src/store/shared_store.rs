//! Stores shared between several accounts.
//!
//! Every member holds a copy of the content key wrapped under their public
//! key. The store's `members` list and the container's participants are kept
//! in lock-step: [`SharedStore::add_member`] updates both, and loading a
//! payload whose members disagree with the envelope's participants fails with
//! [`StoreError::MembershipMismatch`].

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Store, StoreError, StoreExtension};
use crate::Result;
use crate::account::{Account, Identity, PublicAccount};
use crate::container::Container;
use crate::crypto::StoreKind;

/// Group-shared store.
pub type SharedStore = Store<SharedData>;

/// Fields the shared store adds to the store payload.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedData {
    #[serde(default)]
    members: Vec<PublicAccount>,
}

impl SharedData {
    fn upsert_member(&mut self, member: PublicAccount) {
        match self.members.iter_mut().find(|m| m.id == member.id) {
            Some(existing) => *existing = member,
            None => self.members.push(member),
        }
    }
}

impl StoreExtension for SharedData {
    const KIND: StoreKind = StoreKind::Shared;

    // Membership only grows: a snapshot that predates a local addition must
    // not drop it. The container keeps the matching participants.
    fn absorb(&mut self, incoming: Self) {
        for member in incoming.members {
            self.upsert_member(member);
        }
    }

    fn validate(&self, store: &str, container: &Container) -> Result<()> {
        let mismatch = |reason: String| -> crate::Error {
            StoreError::MembershipMismatch {
                store: store.to_string(),
                reason,
            }
            .into()
        };

        let members: HashSet<&PublicAccount> = self.members.iter().collect();
        if members.len() != self.members.len() {
            return Err(mismatch("duplicate member entries".to_string()));
        }

        let participants: HashSet<&PublicAccount> = container
            .participants()
            .iter()
            .map(|p| &p.public_identity)
            .collect();

        if let Some(missing) = members.difference(&participants).next() {
            return Err(mismatch(format!("member '{}' has no wrapped key", missing.id)));
        }
        if let Some(extra) = participants.difference(&members).next() {
            return Err(mismatch(format!(
                "participant '{}' is not a member",
                extra.id
            )));
        }
        Ok(())
    }

    // Members mirror the container's participants, which survive a clear.
    fn clear(&mut self) {}
}

impl Store<SharedData> {
    /// A locked shared store with a known id, ready to load an envelope.
    pub fn new(id: impl Into<String>) -> Self {
        Self::with_id(id)
    }

    /// Start a new shared store with a fresh id and content key.
    ///
    /// The creator becomes the first member.
    pub fn create(creator: &Account) -> Result<Self> {
        let mut store = Self::with_id(uuid::Uuid::new_v4().to_string());
        store.container.initialize_key()?;
        store.add_member(creator)?;
        debug!(store = %store.data.id, creator = %creator.identity(), "Created shared store");
        Ok(store)
    }

    /// Load an envelope, unlock it as `account` and read its records.
    pub async fn open(raw: &[u8], account: &Account) -> Result<Self> {
        let mut store = Self::with_id("");
        store.load(raw)?;
        store.unlock(account)?;
        store.read().await?;
        Ok(store)
    }

    /// Recover the content key from `account`'s wrapped copy.
    ///
    /// After [`Store::load`] this unlocks the loaded envelope, which
    /// [`Store::read`] then decrypts.
    pub fn unlock(&mut self, account: &Account) -> Result<()> {
        self.staging_container_mut().unlock(account)
    }

    /// Give another account access to this store.
    ///
    /// Requires the store to be unlocked. Adding an existing member re-wraps
    /// the key for it without creating a second entry.
    pub fn add_member(&mut self, account: &impl Identity) -> Result<()> {
        self.container.add_participant(account)?;

        self.data
            .extension
            .upsert_member(account.to_public_account());
        self.data.touch();
        debug!(
            store = %self.data.id,
            account = %account.identity(),
            members = self.data.extension.members.len(),
            "Added member"
        );
        Ok(())
    }

    pub fn members(&self) -> &[PublicAccount] {
        &self.data.extension.members
    }

    pub fn is_member(&self, id: &str) -> bool {
        self.members().iter().any(|m| m.id == id)
    }
}
