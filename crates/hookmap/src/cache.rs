// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The cache facade.

use std::fmt::Debug;
use std::sync::Arc;

use hookmap_storage::{Record, Storage, StoredValue, Value};

use crate::action::Action;
use crate::builder::CacheBuilder;
use crate::context::{Outcome, PipelineContext};
use crate::error::{Error, InvalidRecord, Result};
use crate::index::IndexCatalog;
use crate::manager::PipelineManager;
use crate::operation::Operation;
use crate::pipeline::Pipeline;
use crate::query::Query;
use crate::search;
use crate::telemetry::{self, CacheActivity};

/// Type alias for cache names used in telemetry.
pub type CacheName = &'static str;

/// A caching facade in front of one storage backend.
///
/// Every `get`, `set`, `update` and `delete` runs through the pipeline of its operation, so
/// hooks registered on the cache can observe or rewrite arguments and results. `search`
/// consults the index catalog and falls back to a full scan when no index helps.
///
/// Records must carry their own key in the primary-key field (`"_id"` unless configured
/// otherwise).
///
/// Clones share storage, hooks and indexes.
///
/// # Examples
///
/// ```
/// use hookmap::{Cache, Operation};
/// use serde_json::json;
///
/// let cache = Cache::builder().memory().build();
///
/// cache.register_before_hook(Operation::Set, 1, Some("users"), |ctx| {
///     if let Some(record) = ctx.record_mut() {
///         record.insert("touched".to_string(), json!(true));
///     }
///     Ok(())
/// });
///
/// let ana = json!({"_id": "1", "name": "ana"});
/// cache.set("users", "1", ana.as_object().cloned().unwrap())?;
///
/// let stored = cache.get("users", "1")?.unwrap();
/// assert_eq!(stored["touched"], json!(true));
/// # Ok::<(), hookmap::Error>(())
/// ```
#[derive(Clone)]
pub struct Cache {
    pub(crate) name: CacheName,
    pub(crate) storage: Arc<dyn Storage>,
    pub(crate) primary_key: Arc<str>,
    pub(crate) pipelines: Arc<PipelineManager>,
    /// Pipelines of the cache this one was derived from, directly or transitively.
    pub(crate) root: Arc<PipelineManager>,
    pub(crate) indexes: Arc<dyn IndexCatalog>,
}

impl Cache {
    /// Creates a new cache builder.
    #[must_use]
    pub fn builder() -> CacheBuilder {
        CacheBuilder::new()
    }

    /// Returns the cache name used in log events.
    #[must_use]
    pub fn name(&self) -> CacheName {
        self.name
    }

    /// Returns the name of the primary-key field.
    #[must_use]
    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    /// Returns the storage backend.
    #[must_use]
    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    /// Returns the index catalog consulted by `search`.
    #[must_use]
    pub fn indexes(&self) -> &Arc<dyn IndexCatalog> {
        &self.indexes
    }

    /// Returns the pipeline manager.
    #[must_use]
    pub fn pipelines(&self) -> &PipelineManager {
        &self.pipelines
    }

    /// Returns the pipeline of `operation`, creating it for a custom operation.
    #[must_use]
    pub fn pipeline(&self, operation: &Operation) -> Arc<Pipeline> {
        self.pipelines.pipeline(operation)
    }

    /// Creates a cache that runs this cache's hooks before its own.
    ///
    /// The derived cache shares storage, primary key, name and indexes. Indexes registered
    /// through any cache of the chain are maintained by the root cache's pipelines, so writes
    /// through every member keep them current. Its pipelines are
    /// children of the pipelines this cache has now; hooks added to either cache later still
    /// apply with parent hooks first. A custom pipeline created on this cache after deriving
    /// is not inherited.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::sync::{Arc, Mutex};
    ///
    /// use hookmap::{Cache, Operation};
    ///
    /// let base = Cache::builder().memory().build();
    /// let child = base.derive();
    /// let log = Arc::new(Mutex::new(Vec::new()));
    ///
    /// let parent_log = Arc::clone(&log);
    /// base.register_before_hook(Operation::Get, 9, None, move |_| {
    ///     parent_log.lock().unwrap().push("base");
    ///     Ok(())
    /// });
    /// let child_log = Arc::clone(&log);
    /// child.register_before_hook(Operation::Get, 0, None, move |_| {
    ///     child_log.lock().unwrap().push("child");
    ///     Ok(())
    /// });
    ///
    /// child.get("users", "1")?;
    /// assert_eq!(*log.lock().unwrap(), ["base", "child"]);
    /// # Ok::<(), hookmap::Error>(())
    /// ```
    #[must_use]
    pub fn derive(&self) -> Self {
        Self {
            name: self.name,
            storage: Arc::clone(&self.storage),
            primary_key: Arc::clone(&self.primary_key),
            pipelines: Arc::new(PipelineManager::with_parent(&self.pipelines)),
            root: Arc::clone(&self.root),
            indexes: Arc::clone(&self.indexes),
        }
    }

    /// Returns a handle on the root of the derivation chain, sharing everything else.
    ///
    /// Hooks registered on the root run for the root and for every cache derived from it.
    pub(crate) fn root(&self) -> Self {
        Self {
            pipelines: Arc::clone(&self.root),
            ..self.clone()
        }
    }

    /// Registers a hook that runs before the main call of `operation`.
    ///
    /// The hook runs for every collection when `collection` is `None`, otherwise only for the
    /// named collection. Lower priorities run first.
    pub fn register_before_hook<F>(&self, operation: Operation, priority: i32, collection: Option<&str>, hook: F)
    where
        F: Fn(&mut PipelineContext<'_>) -> Result<()> + Send + Sync + 'static,
    {
        self.pipeline(&operation).before(action(hook, priority, collection));
    }

    /// Registers a hook that runs after the main call of `operation`.
    ///
    /// After-hooks see the result and may replace it.
    pub fn register_after_hook<F>(&self, operation: Operation, priority: i32, collection: Option<&str>, hook: F)
    where
        F: Fn(&mut PipelineContext<'_>) -> Result<()> + Send + Sync + 'static,
    {
        self.pipeline(&operation).after(action(hook, priority, collection));
    }

    /// Runs `main` through the pipeline of `operation`.
    ///
    /// This is how custom operations get hooks: `main` receives the context after the
    /// before-hooks ran and its outcome is handed to the after-hooks.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by a hook or by `main`.
    ///
    /// # Examples
    ///
    /// ```
    /// use hookmap::{Cache, Operation, Outcome};
    ///
    /// let cache = Cache::builder().memory().build();
    /// let touch = Operation::custom("touch");
    ///
    /// let outcome = cache.execute(touch, "users", "1", None, |ctx| {
    ///     let exists = ctx.storage().get(ctx.collection(), ctx.key())?.is_some();
    ///     Ok(if exists { Outcome::Written } else { Outcome::Fetched(None) })
    /// })?;
    /// assert_eq!(outcome, Outcome::Fetched(None));
    /// # Ok::<(), hookmap::Error>(())
    /// ```
    pub fn execute<F>(&self, operation: Operation, collection: &str, key: &str, record: Option<Record>, main: F) -> Result<Outcome>
    where
        F: FnOnce(&PipelineContext<'_>) -> Result<Outcome>,
    {
        let pipeline = self.pipeline(&operation);
        let mut ctx = PipelineContext::new(operation, self.storage.as_ref(), &self.primary_key, collection, key, record);
        let result = pipeline.execute(&mut ctx, main);

        if !pipeline.operation().is_built_in() {
            let activity = result.as_ref().map_or_else(CacheActivity::for_error, |_| CacheActivity::Executed);
            telemetry::record(self.name, pipeline.operation(), collection, activity);
        }
        result
    }

    /// Returns the record stored under `key`, or `None` if there is none.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend or a hook fails, or if the entry is not a record.
    pub fn get(&self, collection: &str, key: &str) -> Result<Option<Record>> {
        let result = self
            .execute(Operation::Get, collection, key, None, |ctx| {
                let value = ctx.storage().get(ctx.collection(), ctx.key())?;
                value
                    .map(|value| record_from(value, ctx.collection(), ctx.key()))
                    .transpose()
                    .map(Outcome::Fetched)
            })
            .map(Outcome::into_record);

        let activity = match &result {
            Ok(Some(_)) => CacheActivity::Hit,
            Ok(None) => CacheActivity::Miss,
            Err(error) => CacheActivity::for_error(error),
        };
        telemetry::record(self.name, &Operation::Get, collection, activity);
        result
    }

    /// Returns the record stored under `key`, or `default` if there is none.
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`Cache::get`].
    pub fn get_or(&self, collection: &str, key: &str, default: Record) -> Result<Record> {
        Ok(self.get(collection, key)?.unwrap_or(default))
    }

    /// Stores `record` under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRecord`] if the record, as left by the before-hooks, lacks the
    /// primary-key field or holds a different key. Backend and hook errors are returned
    /// unchanged.
    pub fn set(&self, collection: &str, key: &str, record: Record) -> Result<()> {
        let result = self.execute(Operation::Set, collection, key, Some(record), |ctx| {
            let record = ctx.record().cloned().unwrap_or_default();
            validate(&record, ctx.primary_key(), ctx.key(), true)?;
            ctx.storage().set(ctx.collection(), ctx.key(), StoredValue::Record(record))?;
            Ok(Outcome::Written)
        });

        self.finish(&Operation::Set, collection, result, CacheActivity::Stored)
    }

    /// Merges `partial` into the record stored under `key`.
    ///
    /// The primary-key field may be omitted; if present it must equal `key`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRecord`] on a primary-key mismatch. Backend and hook errors are
    /// returned unchanged.
    pub fn update(&self, collection: &str, key: &str, partial: Record) -> Result<()> {
        let result = self.execute(Operation::Update, collection, key, Some(partial), |ctx| {
            let partial = ctx.record().cloned().unwrap_or_default();
            validate(&partial, ctx.primary_key(), ctx.key(), false)?;
            ctx.storage().update(ctx.collection(), ctx.key(), StoredValue::Record(partial))?;
            Ok(Outcome::Written)
        });

        self.finish(&Operation::Update, collection, result, CacheActivity::Updated)
    }

    /// Removes the record stored under `key`.
    ///
    /// Deleting an absent key is not an error unless the backend makes it one.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend or a hook fails.
    pub fn delete(&self, collection: &str, key: &str) -> Result<()> {
        let result = self.execute(Operation::Delete, collection, key, None, |ctx| {
            ctx.storage().delete(ctx.collection(), ctx.key())?;
            Ok(Outcome::Written)
        });

        self.finish(&Operation::Delete, collection, result, CacheActivity::Deleted)
    }

    /// Iterates over every record of `collection`.
    ///
    /// Keys are listed when iteration starts, and every record is read through the `get`
    /// pipeline. Keys whose record is gone by the time it is read are skipped. Call again to
    /// start over.
    #[must_use]
    pub fn all(&self, collection: &str) -> All<'_> {
        All {
            cache: self,
            collection: collection.to_owned(),
            keys: None,
        }
    }

    /// Returns the records of `collection` that match `query`.
    ///
    /// Indexes covering query fields narrow the candidates first; the remaining conditions
    /// are checked against the stored records. Without a useful index every record is
    /// scanned and a warning is logged. Results come in candidate order.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by the backend or an index. A stored entry that is
    /// not a record yields [`Error::NotARecord`].
    pub fn search(&self, collection: &str, query: &Query) -> Result<Vec<Record>> {
        let result = search::search(self.storage.as_ref(), self.indexes.as_ref(), &self.primary_key, collection, query);
        let operation = Operation::custom("search");

        match result {
            Ok(found) => {
                let activity = if found.indexed {
                    CacheActivity::IndexHit
                } else {
                    CacheActivity::IndexMiss
                };
                telemetry::record(self.name, &operation, collection, activity);
                Ok(found.records)
            }
            Err(error) => {
                telemetry::record(self.name, &operation, collection, CacheActivity::for_error(&error));
                Err(error)
            }
        }
    }

    fn finish(&self, operation: &Operation, collection: &str, result: Result<Outcome>, success: CacheActivity) -> Result<()> {
        let activity = result.as_ref().map_or_else(CacheActivity::for_error, |_| success);
        telemetry::record(self.name, operation, collection, activity);
        result.map(|_| ())
    }
}

impl Debug for Cache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cache")
            .field("name", &self.name)
            .field("primary_key", &self.primary_key)
            .field("pipelines", &self.pipelines)
            .field("indexes", &self.indexes)
            .finish_non_exhaustive()
    }
}

/// Lazy iterator over the records of a collection, created by [`Cache::all`].
#[derive(Debug)]
pub struct All<'a> {
    cache: &'a Cache,
    collection: String,
    keys: Option<std::vec::IntoIter<String>>,
}

impl Iterator for All<'_> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.keys.is_none() {
            match self.cache.storage.keys(&self.collection) {
                Ok(keys) => self.keys = Some(keys.into_iter()),
                Err(error) => {
                    self.keys = Some(Vec::new().into_iter());
                    return Some(Err(error.into()));
                }
            }
        }

        let keys = self.keys.as_mut()?;
        for key in keys.by_ref() {
            match self.cache.get(&self.collection, &key) {
                Ok(Some(record)) => return Some(Ok(record)),
                Ok(None) => {}
                Err(error) => return Some(Err(error)),
            }
        }
        None
    }
}

fn action<F>(hook: F, priority: i32, collection: Option<&str>) -> Action
where
    F: Fn(&mut PipelineContext<'_>) -> Result<()> + Send + Sync + 'static,
{
    let action = Action::new(hook).with_priority(priority);
    match collection {
        Some(collection) => action.for_collection(collection),
        None => action,
    }
}

/// Checks that `record` carries `key` in its primary-key field.
///
/// A missing or `null` primary key is accepted only when `required` is false.
pub(crate) fn validate(record: &Record, primary_key: &str, key: &str, required: bool) -> Result<(), InvalidRecord> {
    match record.get(primary_key) {
        None | Some(Value::Null) if required => Err(InvalidRecord::MissingPrimaryKey {
            field: primary_key.to_owned(),
        }),
        None | Some(Value::Null) => Ok(()),
        Some(Value::String(found)) if found == key => Ok(()),
        Some(found) => Err(InvalidRecord::PrimaryKeyMismatch {
            field: primary_key.to_owned(),
            key: key.to_owned(),
            found: found.clone(),
        }),
    }
}

/// Unwraps a stored value that must be a record.
pub(crate) fn record_from(value: StoredValue, collection: &str, key: &str) -> Result<Record> {
    value.into_record().ok_or_else(|| Error::NotARecord {
        collection: collection.to_owned(),
        key: key.to_owned(),
    })
}
