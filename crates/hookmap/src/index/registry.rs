// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::cache::Cache;
use crate::index::{FieldIndex, IndexCatalog, SecondaryIndex};

/// The catalog of field indexes used by a cache.
///
/// Indexes are registered once at setup time. Registration attaches the index maintenance
/// hooks to the cache, so records written afterwards are indexed.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use hookmap::{Cache, FieldIndex, IndexRegistry, Query};
/// use serde_json::json;
///
/// let registry = Arc::new(IndexRegistry::new());
/// let cache = Cache::builder().indexes(Arc::clone(&registry)).memory().build();
/// registry.register(&cache, FieldIndex::new(["age"]).for_collection("users"));
///
/// let ana = json!({"_id": "1", "name": "ana", "age": 30});
/// cache.set("users", "1", ana.as_object().cloned().unwrap())?;
///
/// let found = cache.search("users", &Query::new().equals("age", 30))?;
/// assert_eq!(found.len(), 1);
/// # Ok::<(), hookmap::Error>(())
/// ```
#[derive(Debug, Default)]
pub struct IndexRegistry {
    indexes: RwLock<Vec<Arc<FieldIndex>>>,
}

impl IndexRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `index` and attaches its maintenance hooks to `cache`.
    ///
    /// Hooks land on the pipelines of the root of `cache`'s derivation chain, so the catalog
    /// never lists an index that some cache sharing it writes around. Registering through a
    /// derived cache is the same as registering through its root.
    pub fn register(&self, cache: &Cache, index: FieldIndex) -> Arc<FieldIndex> {
        let index = Arc::new(index);
        index.attach(&cache.root());
        self.indexes.write().push(Arc::clone(&index));

        tracing::debug!(
            cache.name = cache.name(),
            index.name = %index.name(),
            index.collection = index.collection().unwrap_or("*"),
            index.unique = index.is_unique(),
            "index.registered"
        );
        index
    }

    /// Returns the number of registered indexes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.indexes.read().len()
    }

    /// Returns `true` if no index is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.indexes.read().is_empty()
    }
}

impl IndexCatalog for IndexRegistry {
    fn indexes(&self, collection: &str) -> Vec<Arc<dyn SecondaryIndex>> {
        let indexes = self.indexes.read();
        let specific = indexes.iter().filter(|index| index.collection() == Some(collection));
        let global = indexes.iter().filter(|index| index.collection().is_none());

        specific
            .chain(global)
            .cloned()
            .map(|index| index as Arc<dyn SecondaryIndex>)
            .collect()
    }
}
