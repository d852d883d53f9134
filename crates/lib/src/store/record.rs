//! Records, fields and tag normalization.
//!
//! Records are read through [`StoredRecord`], which accepts both the current
//! layout and older layouts (a `uuid` instead of `id`, a single `category`
//! instead of `tags`, missing timestamps) and resolves them into one canonical
//! [`Record`].

use std::cmp::Ordering;
use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single named value inside a record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub value: String,
    /// Whether the value should be hidden by default when displayed.
    #[serde(default, skip_serializing_if = "is_false")]
    pub masked: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl Field {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            masked: false,
        }
    }

    /// A field whose value is hidden by default.
    pub fn masked(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            masked: true,
            ..Self::new(name, value)
        }
    }
}

/// Strip commas from a tag. Commas delimit tags in exported data.
///
/// Whitespace and case are left untouched.
pub fn normalize_tag(tag: &str) -> String {
    tag.replace(',', "")
}

pub(crate) fn normalize_tags<I, T>(tags: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = T>,
    T: AsRef<str>,
{
    tags.into_iter().map(|t| normalize_tag(t.as_ref())).collect()
}

/// A secret entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    /// Stable unique identifier.
    pub id: String,
    pub name: String,
    pub fields: Vec<Field>,
    pub tags: BTreeSet<String>,
    /// Time of the last mutation; drives last-write-wins merging.
    pub updated: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_used: Option<DateTime<Utc>>,
    /// Tombstone flag.
    pub removed: bool,
}

impl Record {
    /// Build a live record with a fresh id.
    pub(crate) fn new<T: AsRef<str>>(
        name: impl Into<String>,
        fields: Vec<Field>,
        tags: impl IntoIterator<Item = T>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            fields,
            tags: normalize_tags(tags),
            updated: now,
            last_used: Some(now),
            removed: false,
        }
    }

    pub fn is_removed(&self) -> bool {
        self.removed
    }

    /// Turn this record into a tombstone.
    ///
    /// `updated` always moves forward, even if the clock has not, so the
    /// tombstone supersedes the version it replaces.
    pub(crate) fn tombstone(&mut self, now: DateTime<Utc>) {
        self.name.clear();
        self.fields.clear();
        self.tags.clear();
        self.removed = true;
        self.updated = now.max(self.updated + chrono::Duration::milliseconds(1));
    }

    /// Whether this version should replace `existing` under last-write-wins.
    ///
    /// Newer `updated` wins. Equal timestamps with different content are
    /// broken by preferring tombstones, then the larger canonical encoding, so
    /// every replica picks the same winner.
    pub(crate) fn supersedes(&self, existing: &Record) -> bool {
        match self.updated.cmp(&existing.updated) {
            Ordering::Greater => true,
            Ordering::Less => false,
            Ordering::Equal if self == existing => false,
            Ordering::Equal => match (self.removed, existing.removed) {
                (true, false) => true,
                (false, true) => false,
                _ => self.canonical() > existing.canonical(),
            },
        }
    }

    fn canonical(&self) -> Vec<u8> {
        serde_json::to_vec(self).unwrap_or_default()
    }
}

/// Output form of a record. Adds a `uuid` mirror of `id` for older readers.
#[derive(Serialize)]
pub(crate) struct RecordOut<'a> {
    #[serde(flatten)]
    record: &'a Record,
    uuid: &'a str,
}

impl<'a> From<&'a Record> for RecordOut<'a> {
    fn from(record: &'a Record) -> Self {
        Self {
            record,
            uuid: &record.id,
        }
    }
}

/// Record as found in a decrypted payload.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum StoredRecord {
    Current(CurrentRecord),
    Legacy(LegacyRecord),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CurrentRecord {
    id: String,
    name: String,
    fields: Vec<Field>,
    tags: Vec<String>,
    updated: DateTime<Utc>,
    #[serde(default)]
    last_used: Option<DateTime<Utc>>,
    #[serde(default)]
    removed: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LegacyRecord {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    uuid: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    fields: Option<Vec<Field>>,
    #[serde(default)]
    tags: Option<Vec<String>>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    updated: Option<Timestamp>,
    #[serde(default)]
    last_used: Option<Timestamp>,
    #[serde(default)]
    removed: Option<bool>,
}

/// Timestamps were once written as epoch milliseconds.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum Timestamp {
    Text(DateTime<Utc>),
    Millis(i64),
}

impl Timestamp {
    fn resolve(self) -> Option<DateTime<Utc>> {
        match self {
            Timestamp::Text(ts) => Some(ts),
            Timestamp::Millis(ms) => DateTime::from_timestamp_millis(ms),
        }
    }
}

impl StoredRecord {
    /// Resolve into a canonical record. Returns whether a legacy layout was
    /// migrated.
    pub(crate) fn resolve(self, now: DateTime<Utc>) -> (Record, bool) {
        match self {
            StoredRecord::Current(r) => (
                Record {
                    id: r.id,
                    name: r.name,
                    fields: r.fields,
                    tags: normalize_tags(r.tags),
                    updated: r.updated,
                    last_used: r.last_used,
                    removed: r.removed,
                },
                false,
            ),
            StoredRecord::Legacy(r) => {
                let id = r
                    .id
                    .filter(|id| !id.is_empty())
                    .or(r.uuid.filter(|id| !id.is_empty()))
                    .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
                let tags = match (r.tags, r.category) {
                    (Some(tags), _) => normalize_tags(tags),
                    (None, Some(category)) if !category.is_empty() => normalize_tags([category]),
                    _ => BTreeSet::new(),
                };
                (
                    Record {
                        id,
                        name: r.name.unwrap_or_default(),
                        fields: r.fields.unwrap_or_default(),
                        tags,
                        updated: r.updated.and_then(Timestamp::resolve).unwrap_or(now),
                        last_used: r.last_used.and_then(Timestamp::resolve),
                        removed: r.removed.unwrap_or(false),
                    },
                    true,
                )
            }
        }
    }
}
