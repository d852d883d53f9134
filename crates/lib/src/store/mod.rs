//! Versioned, mergeable record collections.
//!
//! A [`Store`] owns a map of [`Record`]s and the [`Container`] its payload is
//! sealed in. Specialized stores add their own fields to the payload through a
//! [`StoreExtension`]:
//!
//! - [`PlainStore`]: ephemeral store under the simple scheme
//! - [`MainStore`]: password-protected root store of a local identity
//! - [`SharedStore`]: store shared between member accounts
//!
//! Records merge by last-write-wins on their `updated` timestamp. Merging is
//! commutative and idempotent, so replicas that exchange snapshots converge no
//! matter the order in which they apply them.

mod errors;
pub mod main_store;
mod record;
pub mod shared_store;

pub use errors::StoreError;
pub use main_store::{MainData, MainStore};
pub use record::{Field, Record, normalize_tag};
pub use shared_store::{SharedData, SharedStore};

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::Result;
use crate::clock::{Clock, SystemClock};
use crate::constants::STORE_KIND;
use crate::container::{Container, Storable};
use crate::crypto::StoreKind;
use record::{RecordOut, StoredRecord};

/// Extra payload carried by a specialized store.
///
/// The extension's fields are flattened into the store payload next to
/// `created`, `updated` and `records`.
pub trait StoreExtension:
    Serialize + DeserializeOwned + Default + fmt::Debug + Send + Sync + 'static
{
    /// Store kind, which selects the encryption scheme.
    const KIND: StoreKind;

    /// Fold a freshly loaded extension into the current one.
    fn absorb(&mut self, incoming: Self) {
        *self = incoming;
    }

    /// Check a loaded extension against the envelope it was read from.
    fn validate(&self, _store: &str, _container: &Container) -> Result<()> {
        Ok(())
    }

    /// Erase extension state when the store is cleared.
    fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Extension of the plain store: nothing beyond the records.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoExtension {}

impl StoreExtension for NoExtension {
    const KIND: StoreKind = StoreKind::Plain;
}

#[derive(Serialize)]
struct PayloadOut<'a, E> {
    created: DateTime<Utc>,
    updated: DateTime<Utc>,
    records: Vec<RecordOut<'a>>,
    #[serde(flatten)]
    extension: &'a E,
}

#[derive(Deserialize)]
#[serde(bound(deserialize = "E: DeserializeOwned"))]
struct PayloadIn<E> {
    #[serde(default)]
    created: Option<DateTime<Utc>>,
    #[serde(default)]
    updated: Option<DateTime<Utc>>,
    #[serde(default)]
    records: Vec<StoredRecord>,
    #[serde(flatten)]
    extension: E,
}

fn parse_payload<E: StoreExtension>(store: &str, raw: &[u8]) -> Result<PayloadIn<E>> {
    serde_json::from_slice(raw).map_err(|e| {
        StoreError::DeserializationFailed {
            store: store.to_string(),
            reason: e.to_string(),
        }
        .into()
    })
}

/// The storable part of a store: everything that goes into the payload.
struct StoreData<E> {
    id: String,
    created: DateTime<Utc>,
    updated: DateTime<Utc>,
    records: HashMap<String, Record>,
    extension: E,
    clock: Arc<dyn Clock>,
}

impl<E: StoreExtension> StoreData<E> {
    /// Apply last-write-wins to each record. Returns how many were taken.
    fn merge_records(&mut self, records: impl IntoIterator<Item = Record>) -> usize {
        let mut applied = 0;
        for record in records {
            let take = match self.records.get(&record.id) {
                Some(existing) => record.supersedes(existing),
                None => true,
            };
            trace!(store = %self.id, record = %record.id, take, "Merge decision");
            if take {
                self.records.insert(record.id.clone(), record);
                applied += 1;
            }
        }
        applied
    }

    fn apply(&mut self, payload: PayloadIn<E>) -> usize {
        let now = self.clock.now();
        let mut migrated = 0usize;
        let records: Vec<Record> = payload
            .records
            .into_iter()
            .map(|stored| {
                let (record, legacy) = stored.resolve(now);
                if legacy {
                    migrated += 1;
                }
                record
            })
            .collect();
        if migrated > 0 {
            warn!(store = %self.id, records = migrated, "Migrated records from a legacy layout");
        }

        if let Some(created) = payload.created {
            self.created = self.created.min(created);
        }
        if let Some(updated) = payload.updated {
            self.updated = self.updated.max(updated);
        }
        self.extension.absorb(payload.extension);

        let total = records.len();
        let applied = self.merge_records(records);
        debug!(store = %self.id, records = total, applied, "Merged payload");
        applied
    }

    fn touch(&mut self) {
        self.updated = self.updated.max(self.clock.now());
    }
}

#[async_trait]
impl<E: StoreExtension> Storable for StoreData<E> {
    fn storage_key(&self) -> &str {
        &self.id
    }

    fn storage_kind(&self) -> &str {
        STORE_KIND
    }

    async fn serialize(&self) -> Result<Vec<u8>> {
        let mut records: Vec<&Record> = self.records.values().collect();
        records.sort_by(|a, b| a.id.cmp(&b.id));
        let payload = PayloadOut {
            created: self.created,
            updated: self.updated,
            records: records.into_iter().map(RecordOut::from).collect(),
            extension: &self.extension,
        };
        serde_json::to_vec(&payload).map_err(|e| {
            StoreError::SerializationFailed {
                store: self.id.clone(),
                reason: e.to_string(),
            }
            .into()
        })
    }

    async fn deserialize(&mut self, raw: &[u8]) -> Result<()> {
        let payload = parse_payload(&self.id, raw)?;
        self.apply(payload);
        Ok(())
    }
}

/// Decrypted payload held back until it has been validated.
struct Staged<E> {
    id: String,
    payload: Option<PayloadIn<E>>,
}

#[async_trait]
impl<E: StoreExtension> Storable for Staged<E> {
    fn storage_key(&self) -> &str {
        &self.id
    }

    fn storage_kind(&self) -> &str {
        STORE_KIND
    }

    async fn serialize(&self) -> Result<Vec<u8>> {
        Err(StoreError::SerializationFailed {
            store: self.id.clone(),
            reason: "staged payload is read-only".to_string(),
        }
        .into())
    }

    async fn deserialize(&mut self, raw: &[u8]) -> Result<()> {
        self.payload = Some(parse_payload(&self.id, raw)?);
        Ok(())
    }
}

/// A collection of records sealed in a container.
pub struct Store<E: StoreExtension = NoExtension> {
    data: StoreData<E>,
    container: Container,
    /// Envelope loaded by [`Store::load`], committed by [`Store::read`].
    pending: Option<Container>,
}

/// Store that is not bound to any identity.
pub type PlainStore = Store<NoExtension>;

impl Store<NoExtension> {
    /// Create an empty plain store.
    pub fn new(id: impl Into<String>) -> Self {
        Self::with_id(id)
    }
}

impl<E: StoreExtension> Store<E> {
    pub(crate) fn with_id(id: impl Into<String>) -> Self {
        let id = id.into();
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let now = clock.now();
        Self {
            container: Container::new(E::KIND.scheme()).with_storage_key(id.clone()),
            pending: None,
            data: StoreData {
                id,
                created: now,
                updated: now,
                records: HashMap::new(),
                extension: E::default(),
                clock,
            },
        }
    }

    /// Use a different time source. Resets the store timestamps.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        let now = clock.now();
        self.data.created = now;
        self.data.updated = now;
        self.data.clock = clock;
        self
    }

    pub fn id(&self) -> &str {
        &self.data.id
    }

    pub fn kind(&self) -> StoreKind {
        E::KIND
    }

    pub fn created(&self) -> DateTime<Utc> {
        self.data.created
    }

    pub fn updated(&self) -> DateTime<Utc> {
        self.data.updated
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    /// Allocate a record with a fresh id and current timestamps.
    ///
    /// The record is not added; pass it to [`Store::add_record`].
    pub fn create_record<T: AsRef<str>>(
        &self,
        name: impl Into<String>,
        fields: Vec<Field>,
        tags: impl IntoIterator<Item = T>,
    ) -> Record {
        Record::new(name, fields, tags, self.data.clock.now())
    }

    /// Insert or update one record. Returns whether it was taken.
    pub fn add_record(&mut self, record: Record) -> bool {
        self.add_records([record]) > 0
    }

    /// Merge records by last-write-wins. Returns how many were taken.
    ///
    /// A record is taken if its id is new or it supersedes the existing
    /// version.
    pub fn add_records(&mut self, records: impl IntoIterator<Item = Record>) -> usize {
        let applied = self.data.merge_records(records);
        if applied > 0 {
            self.data.touch();
            debug!(store = %self.data.id, applied, "Added records");
        }
        applied
    }

    pub fn remove_record(&mut self, id: &str) -> Result<()> {
        self.remove_records([id]).map(|_| ())
    }

    /// Turn records into tombstones.
    ///
    /// Fails without changing anything if any id is unknown.
    pub fn remove_records<I, T>(&mut self, ids: I) -> Result<usize>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let ids: Vec<String> = ids.into_iter().map(|id| id.as_ref().to_string()).collect();
        if let Some(missing) = ids.iter().find(|id| !self.data.records.contains_key(*id)) {
            return Err(StoreError::RecordNotFound {
                store: self.data.id.clone(),
                id: missing.clone(),
            }
            .into());
        }

        let now = self.data.clock.now();
        let mut removed = 0;
        for id in &ids {
            if let Some(record) = self.data.records.get_mut(id) {
                record.tombstone(now);
                removed += 1;
            }
        }
        self.data.touch();
        debug!(store = %self.data.id, records = removed, "Removed records");
        Ok(removed)
    }

    /// Record that an entry was used. Does not affect merge order.
    pub fn mark_used(&mut self, id: &str) -> Result<()> {
        let now = self.data.clock.now();
        let record =
            self.data
                .records
                .get_mut(id)
                .ok_or_else(|| StoreError::RecordNotFound {
                    store: self.data.id.clone(),
                    id: id.to_string(),
                })?;
        record.last_used = Some(now);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Record> {
        self.data.records.get(id)
    }

    /// All records, tombstones included.
    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.data.records.values()
    }

    /// Records that have not been removed.
    pub fn live_records(&self) -> impl Iterator<Item = &Record> {
        self.records().filter(|r| !r.removed)
    }

    pub fn len(&self) -> usize {
        self.data.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.records.is_empty()
    }

    /// All non-empty tags of live records.
    pub fn tags(&self) -> BTreeSet<String> {
        self.live_records()
            .flat_map(|r| r.tags.iter())
            .filter(|t| !t.is_empty())
            .cloned()
            .collect()
    }

    /// Merge another store's records into this one.
    pub fn merge<F: StoreExtension>(&mut self, other: &Store<F>) -> usize {
        self.add_records(other.records().cloned())
    }

    /// Seal the payload and return the envelope.
    pub async fn serialize(&mut self) -> Result<Vec<u8>> {
        self.container.set(&self.data).await?;
        let raw = self.container.serialize()?;
        debug!(
            store = %self.data.id,
            scheme = %self.container.scheme(),
            records = self.data.records.len(),
            "Serialized store"
        );
        Ok(raw)
    }

    /// Load an envelope and merge its records into this store.
    ///
    /// Equivalent to [`Store::load`] followed by [`Store::read`]. On error the
    /// store, its container and its participants are left as they were.
    pub async fn deserialize(&mut self, raw: &[u8]) -> Result<()> {
        self.load(raw)?;
        let result = self.read().await;
        if result.is_err() {
            self.pending = None;
        }
        result
    }

    /// Parse an envelope without decrypting it.
    ///
    /// The envelope is staged next to the current container; nothing the store
    /// exposes changes until [`Store::read`] succeeds.
    pub fn load(&mut self, raw: &[u8]) -> Result<()> {
        let mut next = self.container.clone();
        next.deserialize(raw)?;
        self.pending = Some(next);
        Ok(())
    }

    /// Decrypt the staged envelope, or the current one if nothing was loaded,
    /// and merge its payload into this store.
    ///
    /// The payload is validated before anything is committed. On success the
    /// store adopts the envelope's id and participants; participants known
    /// only locally are kept.
    pub async fn read(&mut self) -> Result<()> {
        let mut staged = Staged::<E> {
            id: self.data.id.clone(),
            payload: None,
        };
        let next = self
            .pending
            .get_or_insert_with(|| self.container.clone());
        next.get(&mut staged).await?;
        let payload = staged.payload.ok_or_else(|| StoreError::DeserializationFailed {
            store: self.data.id.clone(),
            reason: "container produced no payload".to_string(),
        })?;

        let id = next.id().to_string();
        payload.extension.validate(&id, next)?;

        if let Some(mut next) = self.pending.take() {
            next.keep_participants_from(&self.container);
            self.container = next;
        }
        if self.data.id != id {
            debug!(from = %self.data.id, to = %id, "Adopting envelope id");
            self.data.id = id;
        }
        self.data.apply(payload);
        Ok(())
    }

    /// The container key operations should act on: the staged one while an
    /// envelope is loaded but not yet read.
    pub(crate) fn staging_container_mut(&mut self) -> &mut Container {
        match self.pending {
            Some(ref mut pending) => pending,
            None => &mut self.container,
        }
    }

    /// Drop all records and the container's key material.
    pub fn clear(&mut self) {
        self.data.records.clear();
        self.data.extension.clear();
        self.container.clear();
        self.pending = None;
        debug!(store = %self.data.id, "Cleared store");
    }
}

impl<E: StoreExtension> fmt::Debug for Store<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("id", &self.data.id)
            .field("kind", &E::KIND)
            .field("created", &self.data.created)
            .field("updated", &self.data.updated)
            .field("records", &self.data.records.len())
            .field("container", &self.container)
            .field("pending", &self.pending.is_some())
            .finish()
    }
}
