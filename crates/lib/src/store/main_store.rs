//! The private root store of a local identity.
//!
//! There is exactly one main store per identity, persisted under
//! [`MAIN_STORE_KEY`] and sealed with a key derived from the user's password.
//! Besides the user's own records it holds the identity's private key and the
//! accounts the user has chosen to trust.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Store, StoreExtension};
use crate::Result;
use crate::account::{Account, Identity, PrivateKey, PublicAccount};
use crate::constants::MAIN_STORE_KEY;
use crate::crypto::{KdfParams, Password, StoreKind};

/// Password-protected root store.
pub type MainStore = Store<MainData>;

/// Fields the main store adds to the store payload.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MainData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    private_key: Option<PrivateKey>,
    #[serde(default)]
    trusted_accounts: Vec<PublicAccount>,
}

impl MainData {
    fn upsert_trusted(&mut self, account: PublicAccount) -> bool {
        match self.trusted_accounts.iter_mut().find(|a| a.id == account.id) {
            Some(existing) if *existing == account => false,
            Some(existing) => {
                *existing = account;
                true
            }
            None => {
                self.trusted_accounts.push(account);
                true
            }
        }
    }
}

impl StoreExtension for MainData {
    const KIND: StoreKind = StoreKind::Main;

    fn absorb(&mut self, incoming: Self) {
        if incoming.private_key.is_some() {
            self.private_key = incoming.private_key;
        }
        for account in incoming.trusted_accounts {
            self.upsert_trusted(account);
        }
    }
}

impl Store<MainData> {
    /// Create an empty, locked main store.
    pub fn new() -> Self {
        Self::with_id(MAIN_STORE_KEY)
    }

    /// Use non-default Argon2 parameters when sealing new envelopes.
    ///
    /// A password set earlier is kept.
    pub fn with_kdf_params(mut self, params: KdfParams) -> Self {
        self.container.set_kdf_params(params);
        self
    }

    /// Set the password the content key is derived from.
    ///
    /// Also applies to an envelope that has been loaded but not yet read.
    pub fn set_password(&mut self, password: impl Into<Password>) -> Result<()> {
        let password = password.into();
        self.container.set_password(password.clone())?;
        if let Some(pending) = self.pending.as_mut() {
            pending.set_password(password)?;
        }
        Ok(())
    }

    pub fn password(&self) -> Option<&Password> {
        self.container.password()
    }

    pub fn private_key(&self) -> Option<&PrivateKey> {
        self.data.extension.private_key.as_ref()
    }

    pub fn set_private_key(&mut self, private_key: PrivateKey) {
        self.data.extension.private_key = Some(private_key);
        self.data.touch();
    }

    /// Rebuild the local account from the stored private key.
    pub fn account(&self, id: impl Into<String>) -> Option<Account> {
        self.private_key()
            .map(|private_key| Account::new(id, private_key.clone()))
    }

    pub fn trusted_accounts(&self) -> &[PublicAccount] {
        &self.data.extension.trusted_accounts
    }

    /// Add or update a trusted account.
    pub fn trust_account(&mut self, account: &impl Identity) {
        let public = account.to_public_account();
        let id = public.id.clone();
        if self.data.extension.upsert_trusted(public) {
            self.data.touch();
            debug!(store = %self.data.id, account = %id, "Trusted account");
        }
    }

    pub fn is_trusted(&self, id: &str) -> bool {
        self.trusted_accounts().iter().any(|a| a.id == id)
    }
}

impl Default for Store<MainData> {
    fn default() -> Self {
        Self::new()
    }
}
