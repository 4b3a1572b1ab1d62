// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Mock storage implementation for testing.
//!
//! This module provides `MockStorage`, an in-memory backend that records all operations
//! and supports failure injection for testing error paths.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::{Error, Storage, StoredValue};

/// Recorded storage operation with full context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageOp {
    /// A get was performed.
    Get {
        /// The collection addressed.
        collection: String,
        /// The key addressed.
        key: String,
    },
    /// A set was performed.
    Set {
        /// The collection addressed.
        collection: String,
        /// The key addressed.
        key: String,
        /// The value written.
        value: StoredValue,
    },
    /// An update was performed.
    Update {
        /// The collection addressed.
        collection: String,
        /// The key addressed.
        key: String,
        /// The value written.
        value: StoredValue,
    },
    /// A delete was performed.
    Delete {
        /// The collection addressed.
        collection: String,
        /// The key addressed.
        key: String,
    },
    /// The keys of a collection were enumerated.
    Keys {
        /// The collection addressed.
        collection: String,
    },
}

impl StorageOp {
    /// Returns the collection this operation addressed.
    #[must_use]
    pub fn collection(&self) -> &str {
        match self {
            Self::Get { collection, .. }
            | Self::Set { collection, .. }
            | Self::Update { collection, .. }
            | Self::Delete { collection, .. }
            | Self::Keys { collection } => collection,
        }
    }
}

type FailPredicate = Box<dyn Fn(&StorageOp) -> bool + Send + Sync>;
type Collections = HashMap<String, BTreeMap<String, StoredValue>>;

/// A configurable mock backend for testing.
///
/// Values are kept in memory, every operation is recorded for later verification, and
/// operations can be made to fail on demand. Updates replace the stored value.
///
/// Clones share the same data, log and failure predicate.
///
/// # Examples
///
/// ```
/// use hookmap_storage::testing::{MockStorage, StorageOp};
/// use hookmap_storage::{Storage, StoredValue};
///
/// let storage = MockStorage::new();
/// storage.set("users", "1", StoredValue::Key("x".to_string())).unwrap();
///
/// storage.fail_when(|op| matches!(op, StorageOp::Get { .. }));
/// assert!(storage.get("users", "1").is_err());
///
/// assert_eq!(storage.operations().len(), 2);
/// ```
pub struct MockStorage {
    data: Arc<Mutex<Collections>>,
    operations: Arc<Mutex<Vec<StorageOp>>>,
    fail_when: Arc<Mutex<Option<FailPredicate>>>,
}

impl std::fmt::Debug for MockStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockStorage")
            .field("data", &self.data)
            .field("operations", &self.operations)
            .field("fail_when", &self.fail_when.lock().is_some())
            .finish()
    }
}

impl Clone for MockStorage {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
            operations: Arc::clone(&self.operations),
            fail_when: Arc::clone(&self.fail_when),
        }
    }
}

impl Default for MockStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MockStorage {
    /// Creates a new empty mock backend.
    #[must_use]
    pub fn new() -> Self {
        Self {
            data: Arc::new(Mutex::new(HashMap::new())),
            operations: Arc::new(Mutex::new(Vec::new())),
            fail_when: Arc::new(Mutex::new(None)),
        }
    }

    /// Sets a predicate that determines when operations should fail.
    ///
    /// Failing operations are still recorded but leave the data untouched.
    ///
    /// # Examples
    ///
    /// ```
    /// use hookmap_storage::testing::{MockStorage, StorageOp};
    ///
    /// let storage = MockStorage::new();
    ///
    /// // Fail every write to the "orders" collection
    /// storage.fail_when(|op| matches!(op, StorageOp::Set { collection, .. } if collection == "orders"));
    /// ```
    pub fn fail_when<F>(&self, predicate: F)
    where
        F: Fn(&StorageOp) -> bool + Send + Sync + 'static,
    {
        *self.fail_when.lock() = Some(Box::new(predicate));
    }

    /// Clears the failure predicate, allowing all operations to succeed.
    pub fn clear_failures(&self) {
        *self.fail_when.lock() = None;
    }

    /// Returns a clone of all recorded operations.
    #[must_use]
    pub fn operations(&self) -> Vec<StorageOp> {
        self.operations.lock().clone()
    }

    /// Returns the recorded operations that addressed `collection`.
    #[must_use]
    pub fn operations_on(&self, collection: &str) -> Vec<StorageOp> {
        self.operations
            .lock()
            .iter()
            .filter(|op| op.collection() == collection)
            .cloned()
            .collect()
    }

    /// Clears all recorded operations.
    pub fn clear_operations(&self) {
        self.operations.lock().clear();
    }

    /// Returns the number of values stored in `collection`.
    #[must_use]
    pub fn entry_count(&self, collection: &str) -> usize {
        self.data.lock().get(collection).map_or(0, BTreeMap::len)
    }

    fn check(&self, op: StorageOp) -> Result<(), Error> {
        let fail = self.fail_when.lock().as_ref().is_some_and(|predicate| predicate(&op));
        let message = format!("mock: {op:?} failed");
        self.operations.lock().push(op);
        if fail { Err(Error::from_message(message)) } else { Ok(()) }
    }
}

impl Storage for MockStorage {
    fn get(&self, collection: &str, key: &str) -> Result<Option<StoredValue>, Error> {
        self.check(StorageOp::Get {
            collection: collection.to_owned(),
            key: key.to_owned(),
        })?;
        Ok(self.data.lock().get(collection).and_then(|c| c.get(key)).cloned())
    }

    fn set(&self, collection: &str, key: &str, value: StoredValue) -> Result<(), Error> {
        self.check(StorageOp::Set {
            collection: collection.to_owned(),
            key: key.to_owned(),
            value: value.clone(),
        })?;
        self.data
            .lock()
            .entry(collection.to_owned())
            .or_default()
            .insert(key.to_owned(), value);
        Ok(())
    }

    fn update(&self, collection: &str, key: &str, value: StoredValue) -> Result<(), Error> {
        self.check(StorageOp::Update {
            collection: collection.to_owned(),
            key: key.to_owned(),
            value: value.clone(),
        })?;
        self.data
            .lock()
            .entry(collection.to_owned())
            .or_default()
            .insert(key.to_owned(), value);
        Ok(())
    }

    fn delete(&self, collection: &str, key: &str) -> Result<(), Error> {
        self.check(StorageOp::Delete {
            collection: collection.to_owned(),
            key: key.to_owned(),
        })?;
        if let Some(values) = self.data.lock().get_mut(collection) {
            values.remove(key);
        }
        Ok(())
    }

    fn keys(&self, collection: &str) -> Result<Vec<String>, Error> {
        self.check(StorageOp::Keys {
            collection: collection.to_owned(),
        })?;
        Ok(self
            .data
            .lock()
            .get(collection)
            .map(|values| values.keys().cloned().collect())
            .unwrap_or_default())
    }
}
