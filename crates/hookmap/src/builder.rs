// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Builder for constructing caches.

use std::sync::Arc;

use hookmap_storage::Storage;

use crate::cache::{Cache, CacheName};
use crate::index::{IndexCatalog, IndexRegistry};
use crate::manager::PipelineManager;

#[cfg(feature = "memory")]
use hookmap_memory::InMemoryStorage;

const DEFAULT_NAME: CacheName = "hookmap";
const DEFAULT_PRIMARY_KEY: &str = "_id";

/// Builder for a [`Cache`].
///
/// Created by [`Cache::builder`]. A storage backend must be chosen with
/// [`storage`](CacheBuilder::storage) or [`memory`](CacheBuilder::memory) before `build` is
/// available.
///
/// # Examples
///
/// ```
/// use hookmap::Cache;
///
/// let cache = Cache::builder()
///     .name("sessions")
///     .primary_key("id")
///     .memory()
///     .build();
///
/// assert_eq!(cache.name(), "sessions");
/// assert_eq!(cache.primary_key(), "id");
/// ```
#[derive(Debug)]
pub struct CacheBuilder<S = ()> {
    name: CacheName,
    primary_key: String,
    indexes: Option<Arc<dyn IndexCatalog>>,
    storage: S,
}

impl CacheBuilder<()> {
    pub(crate) fn new() -> Self {
        Self {
            name: DEFAULT_NAME,
            primary_key: DEFAULT_PRIMARY_KEY.to_owned(),
            indexes: None,
            storage: (),
        }
    }

    /// Uses an in-memory backend.
    #[cfg(feature = "memory")]
    #[must_use]
    pub fn memory(self) -> CacheBuilder<InMemoryStorage> {
        self.storage(InMemoryStorage::new())
    }
}

impl<S> CacheBuilder<S> {
    /// Sets the name reported in log events.
    #[must_use]
    pub fn name(mut self, name: CacheName) -> Self {
        self.name = name;
        self
    }

    /// Sets the primary-key field name.
    #[must_use]
    pub fn primary_key(mut self, field: impl Into<String>) -> Self {
        self.primary_key = field.into();
        self
    }

    /// Sets the index catalog consulted by `search`.
    ///
    /// Defaults to an empty [`IndexRegistry`].
    #[must_use]
    pub fn indexes<C: IndexCatalog + 'static>(mut self, catalog: Arc<C>) -> Self {
        let catalog: Arc<dyn IndexCatalog> = catalog;
        self.indexes = Some(catalog);
        self
    }

    /// Sets the storage backend.
    ///
    /// # Examples
    ///
    /// ```
    /// use hookmap::Cache;
    /// use hookmap_storage::testing::MockStorage;
    ///
    /// let storage = MockStorage::new();
    /// let cache = Cache::builder().storage(storage.clone()).build();
    ///
    /// cache.get("users", "1")?;
    /// assert_eq!(storage.operations().len(), 1);
    /// # Ok::<(), hookmap::Error>(())
    /// ```
    #[must_use]
    pub fn storage<T: Storage + 'static>(self, storage: T) -> CacheBuilder<T> {
        CacheBuilder {
            name: self.name,
            primary_key: self.primary_key,
            indexes: self.indexes,
            storage,
        }
    }
}

impl<S: Storage + 'static> CacheBuilder<S> {
    /// Builds the cache.
    #[must_use]
    pub fn build(self) -> Cache {
        let pipelines = Arc::new(PipelineManager::new());
        Cache {
            name: self.name,
            storage: Arc::new(self.storage),
            primary_key: Arc::from(self.primary_key),
            root: Arc::clone(&pipelines),
            pipelines,
            indexes: self.indexes.unwrap_or_else(|| Arc::new(IndexRegistry::new())),
        }
    }
}
