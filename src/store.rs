//! Schema version stores
//!
//! The resolver only needs one capability from a store: fetch the schema
//! registered under `(subject, version)`. [`SchemaVersionFetcher`] is that
//! seam; [`InMemorySchemaStore`] is a thread-safe implementation usable as a
//! local cache in front of a registry or as a per-test fixture.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::reference::VersionSpec;
use crate::rest::RestSchema;
use crate::schema::StoredSchema;

/// Store key: a subject and one of its concrete versions
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubjectVersion {
    pub subject: String,
    pub version: u32,
}

impl SubjectVersion {
    pub fn new(subject: impl Into<String>, version: u32) -> Self {
        Self {
            subject: subject.into(),
            version,
        }
    }
}

/// Lookup capability consumed by the resolver
///
/// `Ok(None)` means the store has no such schema; `Err` means the store itself
/// failed (for example a remote registry was unreachable).
pub trait SchemaVersionFetcher: Send + Sync {
    /// Fetch the schema for `subject` at `version`
    ///
    /// [`VersionSpec::Latest`] must resolve to the highest version registered for
    /// the subject. `lookup_deleted` asks the store to include soft-deleted
    /// versions; stores without soft deletion ignore it.
    fn get_by_version(
        &self,
        subject: &str,
        version: VersionSpec,
        lookup_deleted: bool,
    ) -> Result<Option<Arc<StoredSchema>>>;
}

impl<T: SchemaVersionFetcher + ?Sized> SchemaVersionFetcher for Arc<T> {
    fn get_by_version(
        &self,
        subject: &str,
        version: VersionSpec,
        lookup_deleted: bool,
    ) -> Result<Option<Arc<StoredSchema>>> {
        (**self).get_by_version(subject, version, lookup_deleted)
    }
}

impl<T: SchemaVersionFetcher + ?Sized> SchemaVersionFetcher for &T {
    fn get_by_version(
        &self,
        subject: &str,
        version: VersionSpec,
        lookup_deleted: bool,
    ) -> Result<Option<Arc<StoredSchema>>> {
        (**self).get_by_version(subject, version, lookup_deleted)
    }
}

/// Thread-safe in-memory store keyed by [`SubjectVersion`]
///
/// Values are swapped whole behind `Arc`, so a reader racing a writer on the
/// same key sees either the old or the new schema, never a mix.
#[derive(Debug, Default)]
pub struct InMemorySchemaStore {
    entries: DashMap<SubjectVersion, Arc<StoredSchema>>,
}

impl InMemorySchemaStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with initial contents
    pub fn with_entries(initial: HashMap<SubjectVersion, StoredSchema>) -> Self {
        let store = Self::new();
        store.put_all(initial);
        store
    }

    /// Create a store from REST entities, keyed by each entity's own subject and version
    pub fn from_rest_entities(entities: Vec<RestSchema>) -> Result<Self> {
        let store = Self::new();
        for entity in entities {
            store.insert(StoredSchema::try_from(entity)?);
        }
        Ok(store)
    }

    /// Add or replace the schema under `(subject, version)`
    pub fn put(&self, subject: impl Into<String>, version: u32, schema: StoredSchema) {
        self.entries
            .insert(SubjectVersion::new(subject, version), Arc::new(schema));
    }

    /// Add or replace a schema under its own subject and version
    pub fn insert(&self, schema: StoredSchema) {
        let key = SubjectVersion::new(schema.subject.clone(), schema.version);
        self.entries.insert(key, Arc::new(schema));
    }

    /// Add or replace many entries
    ///
    /// Each key is updated atomically; the batch as a whole is not.
    pub fn put_all(&self, source: impl IntoIterator<Item = (SubjectVersion, StoredSchema)>) {
        for (key, schema) in source {
            self.entries.insert(key, Arc::new(schema));
        }
    }

    /// Remove all entries
    ///
    /// Shards are emptied one after another. An exact `get` racing a clear sees
    /// the old value or nothing, but a [`latest`](Self::latest) scan racing it
    /// may see a subject half cleared and return a lower version than the one
    /// that was highest before the clear.
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Look up an exact key
    pub fn get(&self, subject: &str, version: u32) -> Option<Arc<StoredSchema>> {
        self.entries
            .get(&SubjectVersion::new(subject, version))
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Highest registered version for a subject
    ///
    /// Not atomic with respect to [`clear`](Self::clear) or concurrent puts of
    /// other versions of the same subject.
    pub fn latest(&self, subject: &str) -> Option<Arc<StoredSchema>> {
        // Linear scan; the store is a cache, not an index.
        self.entries
            .iter()
            .filter(|entry| entry.key().subject == subject)
            .map(|entry| (entry.key().version, Arc::clone(entry.value())))
            .max_by_key(|(version, _)| *version)
            .map(|(_, schema)| schema)
    }

    /// All versions registered for a subject, ascending
    pub fn versions(&self, subject: &str) -> Vec<u32> {
        let mut versions: Vec<u32> = self
            .entries
            .iter()
            .filter(|entry| entry.key().subject == subject)
            .map(|entry| entry.key().version)
            .collect();
        versions.sort_unstable();
        versions
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl SchemaVersionFetcher for InMemorySchemaStore {
    fn get_by_version(
        &self,
        subject: &str,
        version: VersionSpec,
        _lookup_deleted: bool,
    ) -> Result<Option<Arc<StoredSchema>>> {
        Ok(match version {
            VersionSpec::Exact(v) => self.get(subject, v),
            VersionSpec::Latest => self.latest(subject),
        })
    }
}

impl FromIterator<StoredSchema> for InMemorySchemaStore {
    fn from_iter<I: IntoIterator<Item = StoredSchema>>(iter: I) -> Self {
        let store = Self::new();
        for schema in iter {
            store.insert(schema);
        }
        store
    }
}
