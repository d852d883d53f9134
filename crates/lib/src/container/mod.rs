//! Encryption envelopes around storable payloads.
//!
//! A [`Container`] seals the serialized form of a [`Storable`] under a content
//! key and serializes the result, together with the public material needed to
//! recover that key, into a self-describing envelope.
//!
//! How the content key is obtained depends on the container's
//! [`EncryptionScheme`]:
//!
//! - `Simple`: generated on first [`Container::set`], never persisted.
//! - `PasswordDerived`: derived from [`Container::set_password`] and the
//!   envelope salt each time the key is missing.
//! - `Shared`: generated once by [`Container::initialize_key`], then wrapped for
//!   every participant and recovered with [`Container::unlock`].
//!
//! The cached content key and password never leave memory and are dropped by
//! [`Container::clear`].

mod envelope;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, trace, warn};
use zeroize::Zeroizing;

use crate::Result;
use crate::account::{Account, Identity, PublicAccount};
use crate::constants::ENVELOPE_VERSION;
use crate::crypto::{
    self, ContentKey, CryptoError, EncryptionScheme, KdfParams, Password, Salt, Sealed, WrappedKey,
};
use envelope::{Envelope, KdfInfo, header_aad};

/// A payload that can be sealed inside a [`Container`].
#[async_trait]
pub trait Storable: Send + Sync {
    /// Identifier the envelope is persisted under.
    fn storage_key(&self) -> &str;

    /// Kind tag written into the envelope.
    fn storage_kind(&self) -> &str;

    /// Produce the plaintext to be sealed.
    async fn serialize(&self) -> Result<Vec<u8>>;

    /// Absorb a decrypted plaintext.
    async fn deserialize(&mut self, raw: &[u8]) -> Result<()>;
}

/// A participant's wrapped copy of a shared content key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub public_identity: PublicAccount,
    pub wrapped_key: WrappedKey,
}

/// An encryption envelope for one storable payload.
#[derive(Clone)]
pub struct Container {
    scheme: EncryptionScheme,
    id: String,
    kind: String,
    key: Option<ContentKey>,
    password: Option<Password>,
    salt: Option<Salt>,
    kdf_params: KdfParams,
    participants: Vec<Participant>,
    sealed: Option<Sealed>,
}

impl Container {
    /// Create an empty, locked container for the given scheme.
    pub fn new(scheme: EncryptionScheme) -> Self {
        Self {
            scheme,
            id: String::new(),
            kind: String::new(),
            key: None,
            password: None,
            salt: None,
            kdf_params: KdfParams::default(),
            participants: Vec::new(),
            sealed: None,
        }
    }

    /// Use non-default Argon2 parameters for new envelopes.
    ///
    /// Envelopes that are deserialized later carry their own parameters and
    /// override these.
    pub fn with_kdf_params(mut self, params: KdfParams) -> Self {
        self.set_kdf_params(params);
        self
    }

    /// Change the Argon2 parameters used for the next seal.
    ///
    /// The password is kept. A cached key derived under other parameters is
    /// dropped.
    pub fn set_kdf_params(&mut self, params: KdfParams) {
        if self.kdf_params != params {
            self.kdf_params = params;
            if self.scheme.is_password_derived() {
                self.key = None;
            }
        }
    }

    /// Bind a fresh container to the storage key of its owner.
    pub(crate) fn with_storage_key(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn scheme(&self) -> EncryptionScheme {
        self.scheme
    }

    /// Storage key of the last payload set or loaded.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn kdf_params(&self) -> &KdfParams {
        &self.kdf_params
    }

    pub fn salt(&self) -> Option<&Salt> {
        self.salt.as_ref()
    }

    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    /// Look up the participant entry for an account id.
    pub fn participant(&self, identity: &str) -> Option<&Participant> {
        self.participants
            .iter()
            .find(|p| p.public_identity.id == identity)
    }

    /// Whether a content key is currently cached.
    pub fn is_unlocked(&self) -> bool {
        self.key.is_some()
    }

    /// Whether the container holds sealed data.
    pub fn has_payload(&self) -> bool {
        self.sealed.is_some()
    }

    /// Short hash of the cached content key.
    ///
    /// Lets two holders check they recovered the same key without revealing it.
    pub fn key_fingerprint(&self) -> Option<String> {
        self.key.as_ref().map(|key| {
            let digest = Sha256::digest(key.as_bytes());
            hex::encode(&digest[..8])
        })
    }

    /// Set the password of a password-derived container.
    ///
    /// Any cached key is dropped; the next `set` or `get` derives a new one.
    pub fn set_password(&mut self, password: impl Into<Password>) -> Result<()> {
        self.require_scheme(EncryptionScheme::PasswordDerived)?;
        self.password = Some(password.into());
        self.key = None;
        Ok(())
    }

    pub fn password(&self) -> Option<&Password> {
        self.password.as_ref()
    }

    /// Generate the content key of a new shared or simple container.
    ///
    /// A no-op when a key is already cached. Fails with `NotUnlocked` if the
    /// container already has participants, since their wrapped keys must be
    /// recovered with [`Container::unlock`] instead.
    pub fn initialize_key(&mut self) -> Result<()> {
        if self.scheme.is_password_derived() {
            return Err(CryptoError::SchemeMismatch {
                expected: format!("{} or {}", EncryptionScheme::Simple, EncryptionScheme::Shared),
                actual: self.scheme.to_string(),
            }
            .into());
        }
        if self.key.is_some() {
            return Ok(());
        }
        if !self.participants.is_empty() {
            return Err(CryptoError::not_unlocked("initialize_key").into());
        }
        self.key = Some(ContentKey::generate());
        debug!(container = %self.id, scheme = %self.scheme, "Generated content key");
        Ok(())
    }

    /// Recover the shared content key using the account's private key.
    pub fn unlock(&mut self, account: &Account) -> Result<()> {
        self.require_scheme(EncryptionScheme::Shared)?;

        let participant =
            self.participant(account.identity())
                .ok_or_else(|| CryptoError::KeyNotFound {
                    identity: account.identity().to_string(),
                })?;

        let key = crypto::unwrap_key(&participant.wrapped_key, account.private_key()).inspect_err(
            |_| {
                warn!(
                    container = %self.id,
                    account = %account.identity(),
                    "Failed to unwrap content key"
                )
            },
        )?;

        self.key = Some(key);
        debug!(container = %self.id, account = %account.identity(), "Unlocked container");
        Ok(())
    }

    /// Wrap the cached content key for another account.
    ///
    /// Adding an account that is already a participant replaces its entry, so
    /// each account holds at most one wrapped key.
    pub fn add_participant(&mut self, identity: &impl Identity) -> Result<()> {
        self.require_scheme(EncryptionScheme::Shared)?;
        let key = self
            .key
            .as_ref()
            .ok_or_else(|| CryptoError::not_unlocked("add_participant"))?;

        let wrapped_key = crypto::wrap_key(key, identity.public_key())?;
        let public_identity = identity.to_public_account();

        match self
            .participants
            .iter_mut()
            .find(|p| p.public_identity.id == public_identity.id)
        {
            Some(existing) => {
                existing.public_identity = public_identity;
                existing.wrapped_key = wrapped_key;
                debug!(container = %self.id, account = %identity.identity(), "Re-wrapped key for participant");
            }
            None => {
                self.participants.push(Participant {
                    public_identity,
                    wrapped_key,
                });
                debug!(container = %self.id, account = %identity.identity(), "Added participant");
            }
        }
        Ok(())
    }

    /// Serialize `storable` and seal it under the content key.
    pub async fn set<S: Storable + ?Sized>(&mut self, storable: &S) -> Result<()> {
        let plaintext = Zeroizing::new(storable.serialize().await?);
        self.ensure_key("set", true).await?;
        let key = self
            .key
            .as_ref()
            .ok_or_else(|| CryptoError::not_unlocked("set"))?;

        let id = storable.storage_key().to_string();
        let kind = storable.storage_kind().to_string();
        let aad = header_aad(&id, &kind, self.scheme);
        self.sealed = Some(crypto::seal_with_aad(key, &plaintext, &aad)?);
        self.id = id;
        self.kind = kind;
        trace!(container = %self.id, bytes = plaintext.len(), "Sealed payload");
        Ok(())
    }

    /// Decrypt the sealed payload into `storable`.
    pub async fn get<S: Storable + ?Sized>(&mut self, storable: &mut S) -> Result<()> {
        if self.sealed.is_none() {
            return Err(CryptoError::InvalidEnvelope {
                reason: "container holds no sealed data".to_string(),
            }
            .into());
        }
        self.ensure_key("get", false).await?;

        let key = self
            .key
            .as_ref()
            .ok_or_else(|| CryptoError::not_unlocked("get"))?;
        let sealed = self.sealed.as_ref().ok_or_else(|| CryptoError::InvalidEnvelope {
            reason: "container holds no sealed data".to_string(),
        })?;

        let aad = header_aad(&self.id, &self.kind, self.scheme);
        let plaintext = match crypto::open_with_aad(key, sealed, &aad) {
            Ok(plaintext) => plaintext,
            Err(err) => {
                warn!(container = %self.id, scheme = %self.scheme, "Failed to decrypt payload");
                // A key derived from a wrong password must not stay cached.
                if self.scheme.is_password_derived() {
                    self.key = None;
                }
                return Err(err);
            }
        };

        trace!(container = %self.id, bytes = plaintext.len(), "Opened payload");
        storable.deserialize(&plaintext).await
    }

    /// Write the envelope. Requires a prior [`Container::set`] or
    /// [`Container::deserialize`].
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let data = self
            .sealed
            .clone()
            .ok_or_else(|| CryptoError::InvalidEnvelope {
                reason: "nothing to serialize; set a payload first".to_string(),
            })?;

        let kdf = if self.scheme.is_password_derived() {
            let salt = self.salt.ok_or_else(|| CryptoError::InvalidEnvelope {
                reason: "password-derived container has no salt".to_string(),
            })?;
            Some(KdfInfo {
                salt,
                params: self.kdf_params,
            })
        } else {
            None
        };

        let envelope = Envelope {
            version: ENVELOPE_VERSION,
            id: self.id.clone(),
            kind: self.kind.clone(),
            scheme: self.scheme.as_tag().to_string(),
            kdf,
            participants: self.participants.clone(),
            data,
        };
        Ok(serde_json::to_vec(&envelope)?)
    }

    /// Load an envelope. Only public material is read; call
    /// [`Container::get`] to decrypt.
    ///
    /// A cached key is kept only while it can still match: a password-derived
    /// key survives if salt and parameters are unchanged, a shared key if the
    /// container id is unchanged.
    pub fn deserialize(&mut self, raw: &[u8]) -> Result<()> {
        let (scheme, envelope) = envelope::parse(raw)?;
        if scheme != self.scheme {
            return Err(CryptoError::SchemeMismatch {
                expected: self.scheme.to_string(),
                actual: scheme.to_string(),
            }
            .into());
        }

        match scheme {
            EncryptionScheme::PasswordDerived => {
                if let Some(kdf) = envelope.kdf {
                    if self.salt != Some(kdf.salt) || self.kdf_params != kdf.params {
                        self.key = None;
                    }
                    self.salt = Some(kdf.salt);
                    self.kdf_params = kdf.params;
                }
            }
            EncryptionScheme::Shared => {
                if !self.id.is_empty() && self.id != envelope.id {
                    self.key = None;
                }
                self.participants = envelope.participants;
            }
            EncryptionScheme::Simple => {}
        }

        self.id = envelope.id;
        self.kind = envelope.kind;
        self.sealed = Some(envelope.data);
        debug!(
            container = %self.id,
            scheme = %self.scheme,
            participants = self.participants.len(),
            "Loaded envelope"
        );
        Ok(())
    }

    /// Carry over participants of `previous` that this container lacks.
    ///
    /// Only applies when both describe the same shared container, so a
    /// participant granted locally survives loading an older envelope.
    pub(crate) fn keep_participants_from(&mut self, previous: &Container) {
        if !self.scheme.uses_participants() || previous.id != self.id {
            return;
        }
        for participant in &previous.participants {
            if self.participant(&participant.public_identity.id).is_none() {
                trace!(
                    container = %self.id,
                    account = %participant.public_identity.id,
                    "Keeping local participant"
                );
                self.participants.push(participant.clone());
            }
        }
    }

    /// Drop the cached content key and password.
    pub fn clear(&mut self) {
        self.key = None;
        self.password = None;
        trace!(container = %self.id, "Cleared key material");
    }

    fn require_scheme(&self, expected: EncryptionScheme) -> Result<()> {
        if self.scheme != expected {
            return Err(CryptoError::SchemeMismatch {
                expected: expected.to_string(),
                actual: self.scheme.to_string(),
            }
            .into());
        }
        Ok(())
    }

    async fn ensure_key(&mut self, operation: &str, sealing: bool) -> Result<()> {
        if self.key.is_some() {
            return Ok(());
        }

        match self.scheme {
            EncryptionScheme::PasswordDerived => {
                let password = self
                    .password
                    .clone()
                    .ok_or_else(|| CryptoError::not_unlocked(operation))?;
                let salt = match self.salt {
                    Some(salt) => salt,
                    None if sealing => {
                        let salt = Salt::generate();
                        self.salt = Some(salt);
                        salt
                    }
                    None => {
                        return Err(CryptoError::InvalidEnvelope {
                            reason: "password-derived container has no salt".to_string(),
                        }
                        .into());
                    }
                };
                debug!(container = %self.id, "Deriving content key from password");
                self.key = Some(crypto::derive_key_async(password, salt, self.kdf_params).await?);
            }
            EncryptionScheme::Simple if sealing => {
                self.key = Some(ContentKey::generate());
            }
            _ => return Err(CryptoError::not_unlocked(operation).into()),
        }
        Ok(())
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("scheme", &self.scheme)
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("unlocked", &self.is_unlocked())
            .field("participants", &self.participants.len())
            .finish_non_exhaustive()
    }
}
