// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! In-memory storage implementation.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use hookmap_storage::{Error, Storage, StoredValue};
use parking_lot::RwLock;

use crate::builder::InMemoryStorageBuilder;

type Collection = BTreeMap<String, StoredValue>;

/// An in-memory storage backend.
///
/// Each collection is a sorted map from key to value. Clones share the same data.
///
/// `update` merges the fields of a record into an existing record, so partial updates
/// keep fields they do not mention. Any other combination replaces the stored value,
/// and updating an absent key inserts it.
///
/// # Examples
///
/// ```
/// use hookmap_memory::InMemoryStorage;
/// use hookmap_storage::{Record, Storage, StoredValue};
/// use serde_json::json;
///
/// let storage = InMemoryStorage::new();
///
/// let mut record = Record::new();
/// record.insert("_id".to_string(), json!("1"));
/// record.insert("name".to_string(), json!("ana"));
/// storage.set("users", "1", record.into())?;
///
/// let mut partial = Record::new();
/// partial.insert("age".to_string(), json!(30));
/// storage.update("users", "1", partial.into())?;
///
/// let stored = storage.get("users", "1")?.and_then(StoredValue::into_record).unwrap();
/// assert_eq!(stored["name"], json!("ana"));
/// assert_eq!(stored["age"], json!(30));
/// # Ok::<(), hookmap_storage::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryStorage {
    name: Option<Arc<str>>,
    collections: Arc<RwLock<HashMap<String, Collection>>>,
}

impl InMemoryStorage {
    /// Creates a new empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Creates a new builder for configuring an in-memory storage.
    #[must_use]
    pub fn builder() -> InMemoryStorageBuilder {
        InMemoryStorageBuilder::new()
    }

    pub(crate) fn from_builder(builder: InMemoryStorageBuilder) -> Self {
        let collections = builder.initial_capacity.map_or_else(HashMap::new, HashMap::with_capacity);

        Self {
            name: builder.name.map(Arc::from),
            collections: Arc::new(RwLock::new(collections)),
        }
    }

    /// Returns the configured name, if any.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns the number of values stored in `collection`.
    #[must_use]
    pub fn len(&self, collection: &str) -> usize {
        self.collections.read().get(collection).map_or(0, BTreeMap::len)
    }

    /// Returns `true` if `collection` holds no values.
    #[must_use]
    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }

    /// Returns the names of all collections that currently hold values.
    #[must_use]
    pub fn collections(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .collections
            .read()
            .iter()
            .filter(|(_, values)| !values.is_empty())
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }
}

impl Storage for InMemoryStorage {
    fn get(&self, collection: &str, key: &str) -> Result<Option<StoredValue>, Error> {
        Ok(self.collections.read().get(collection).and_then(|values| values.get(key)).cloned())
    }

    fn set(&self, collection: &str, key: &str, value: StoredValue) -> Result<(), Error> {
        self.collections
            .write()
            .entry(collection.to_owned())
            .or_default()
            .insert(key.to_owned(), value);
        Ok(())
    }

    fn update(&self, collection: &str, key: &str, value: StoredValue) -> Result<(), Error> {
        let mut collections = self.collections.write();
        let values = collections.entry(collection.to_owned()).or_default();

        match (values.get_mut(key), value) {
            (Some(StoredValue::Record(existing)), StoredValue::Record(partial)) => {
                existing.extend(partial);
            }
            (_, value) => {
                values.insert(key.to_owned(), value);
            }
        }
        Ok(())
    }

    fn delete(&self, collection: &str, key: &str) -> Result<(), Error> {
        if let Some(values) = self.collections.write().get_mut(collection) {
            values.remove(key);
        }
        Ok(())
    }

    fn keys(&self, collection: &str) -> Result<Vec<String>, Error> {
        Ok(self
            .collections
            .read()
            .get(collection)
            .map(|values| values.keys().cloned().collect())
            .unwrap_or_default())
    }
}
