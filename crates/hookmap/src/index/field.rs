// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::sync::Arc;

use hookmap_storage::{Record, Storage, StoredValue, Value};
use parking_lot::Mutex;

use crate::cache::Cache;
use crate::error::{Error, Result};
use crate::index::SecondaryIndex;
use crate::operation::Operation;
use crate::query::{Condition, Query};

const FORWARD_PREFIX: &str = "_index_";
const REVERSE_PREFIX: &str = "_reverse_index_";

/// An index over one or more record fields, stored in the cache's own backend.
///
/// For every indexed collection the index keeps two collections:
///
/// - `_index_:{collection}:{fields}` maps the canonical JSON of the indexed values (object keys
///   sorted at every depth) to the primary keys of the records holding them,
/// - `_reverse_index_:{collection}:{fields}` maps a primary key to its forward entry.
///
/// Fields are joined with `_` in the collection names. A missing field is indexed as `null`.
///
/// The index is kept current by hooks on the cache's `set`, `update` and `delete` pipelines,
/// attached by [`IndexRegistry::register`](crate::IndexRegistry::register). Maintenance of one
/// index is serialized by a mutex.
///
/// # Examples
///
/// ```
/// use hookmap::FieldIndex;
///
/// let index = FieldIndex::new(["name", "age", "name"]).for_collection("users").unique();
///
/// assert_eq!(index.name(), "age_name");
/// assert_eq!(index.collection(), Some("users"));
/// assert!(index.is_unique());
/// ```
#[derive(Debug)]
pub struct FieldIndex {
    fields: Vec<String>,
    collection: Option<String>,
    unique: bool,
    lock: Mutex<()>,
}

impl FieldIndex {
    /// Creates a non-unique index over `fields` for every collection.
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut fields: Vec<String> = fields.into_iter().map(Into::into).collect();
        fields.sort();
        fields.dedup();

        Self {
            fields,
            collection: None,
            unique: false,
            lock: Mutex::new(()),
        }
    }

    /// Creates the unique index over the primary-key field.
    pub fn primary(primary_key: impl Into<String>) -> Self {
        Self::new([primary_key.into()]).unique()
    }

    /// Restricts the index to one collection.
    #[must_use]
    pub fn for_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = Some(collection.into());
        self
    }

    /// Rejects writes that would map the same indexed values to two keys.
    ///
    /// Both `set` and `update` are checked; for an update the partial record is merged into the
    /// stored one first.
    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Returns the index name: the covered fields joined with `_`.
    #[must_use]
    pub fn name(&self) -> String {
        self.fields.join("_")
    }

    /// Returns the collection the index is restricted to, if any.
    #[must_use]
    pub fn collection(&self) -> Option<&str> {
        self.collection.as_deref()
    }

    /// Returns `true` for a unique index.
    #[must_use]
    pub fn is_unique(&self) -> bool {
        self.unique
    }

    /// Returns the name of the forward collection for `collection`.
    #[must_use]
    pub fn forward_collection(&self, collection: &str) -> String {
        format!("{FORWARD_PREFIX}:{collection}:{}", self.name())
    }

    /// Returns the name of the reverse collection for `collection`.
    #[must_use]
    pub fn reverse_collection(&self, collection: &str) -> String {
        format!("{REVERSE_PREFIX}:{collection}:{}", self.name())
    }

    /// Returns the forward entry key of `record`.
    #[must_use]
    pub fn entry_key(&self, record: &Record) -> String {
        encode(self.entry_values(record))
    }

    fn entry_values(&self, record: &Record) -> Record {
        self.fields
            .iter()
            .map(|field| (field.clone(), record.get(field).map_or(Value::Null, canonical)))
            .collect()
    }

    /// Wires the maintenance hooks into `cache`.
    pub(crate) fn attach(self: &Arc<Self>, cache: &Cache) {
        let collection = self.collection.as_deref();

        let index = Arc::clone(self);
        cache.register_before_hook(Operation::Set, crate::action::DEFAULT_PRIORITY, collection, move |ctx| {
            match ctx.record() {
                Some(record) => index.check_unique(ctx.storage(), ctx.collection(), ctx.key(), record),
                None => Ok(()),
            }
        });

        let index = Arc::clone(self);
        cache.register_after_hook(Operation::Set, crate::action::DEFAULT_PRIORITY, collection, move |ctx| {
            match ctx.record() {
                Some(record) => index.reindex(ctx.storage(), ctx.collection(), ctx.key(), record),
                None => Ok(()),
            }
        });

        let index = Arc::clone(self);
        cache.register_before_hook(Operation::Update, crate::action::DEFAULT_PRIORITY, collection, move |ctx| {
            match ctx.record() {
                Some(partial) => index.check_unique_update(ctx.storage(), ctx.collection(), ctx.key(), partial),
                None => Ok(()),
            }
        });

        let index = Arc::clone(self);
        cache.register_after_hook(Operation::Update, crate::action::DEFAULT_PRIORITY, collection, move |ctx| {
            let stored = ctx.storage().get(ctx.collection(), ctx.key())?;
            match stored.and_then(StoredValue::into_record) {
                Some(record) => index.reindex(ctx.storage(), ctx.collection(), ctx.key(), &record),
                None => Ok(()),
            }
        });

        let index = Arc::clone(self);
        cache.register_after_hook(Operation::Delete, crate::action::DEFAULT_PRIORITY, collection, move |ctx| {
            index.unindex(ctx.storage(), ctx.collection(), ctx.key())
        });
    }

    fn check_unique(&self, storage: &dyn Storage, collection: &str, key: &str, record: &Record) -> Result<()> {
        if !self.unique {
            return Ok(());
        }

        let entry = self.entry_key(record);
        match storage.get(&self.forward_collection(collection), &entry)? {
            Some(StoredValue::Keys(keys)) if keys.iter().any(|owner| owner != key) => Err(Error::UniqueViolation {
                index: self.name(),
                value: entry,
            }),
            _ => Ok(()),
        }
    }

    /// Checks the record `partial` would produce when merged into the stored one.
    fn check_unique_update(&self, storage: &dyn Storage, collection: &str, key: &str, partial: &Record) -> Result<()> {
        if !self.unique || !self.fields.iter().any(|field| partial.contains_key(field)) {
            return Ok(());
        }

        let mut merged = storage
            .get(collection, key)?
            .and_then(StoredValue::into_record)
            .unwrap_or_default();
        merged.extend(partial.iter().map(|(field, value)| (field.clone(), value.clone())));
        self.check_unique(storage, collection, key, &merged)
    }

    /// Points the forward and reverse entries of `key` at the values in `record`.
    fn reindex(&self, storage: &dyn Storage, collection: &str, key: &str, record: &Record) -> Result<()> {
        let _guard = self.lock.lock();
        let forward = self.forward_collection(collection);
        let reverse = self.reverse_collection(collection);
        let entry = self.entry_key(record);

        if let Some(StoredValue::Key(previous)) = storage.get(&reverse, key)? {
            if previous == entry {
                return Ok(());
            }
            remove_from_entry(storage, &forward, &previous, key)?;
        }

        let mut keys = match storage.get(&forward, &entry)? {
            Some(StoredValue::Keys(keys)) => keys,
            _ => Vec::new(),
        };
        if !keys.iter().any(|owner| owner == key) {
            keys.push(key.to_owned());
        }

        storage.set(&forward, &entry, StoredValue::Keys(keys))?;
        storage.set(&reverse, key, StoredValue::Key(entry))?;
        Ok(())
    }

    fn unindex(&self, storage: &dyn Storage, collection: &str, key: &str) -> Result<()> {
        let _guard = self.lock.lock();
        let reverse = self.reverse_collection(collection);

        if let Some(StoredValue::Key(entry)) = storage.get(&reverse, key)? {
            remove_from_entry(storage, &self.forward_collection(collection), &entry, key)?;
            storage.delete(&reverse, key)?;
        }
        Ok(())
    }

    /// Returns the forward entries matching `subquery` as `(indexed values, keys)` pairs.
    fn entries(&self, storage: &dyn Storage, forward: &str, subquery: &Query) -> Result<Vec<(Record, Vec<String>)>> {
        let pinned: Option<Record> = self
            .fields
            .iter()
            .map(|field| {
                subquery
                    .get(field)
                    .and_then(Condition::as_equals)
                    .map(|value| (field.clone(), canonical(value)))
            })
            .collect();

        if let Some(values) = pinned {
            let entry = encode(values.clone());
            return Ok(match storage.get(forward, &entry)? {
                Some(StoredValue::Keys(keys)) => vec![(values, keys)],
                _ => Vec::new(),
            });
        }

        let mut entries = Vec::new();
        for entry in storage.keys(forward)? {
            let values: Record = serde_json::from_str(&entry).map_err(hookmap_storage::Error::from_source)?;
            if !subquery.matches(&values) {
                continue;
            }
            if let Some(StoredValue::Keys(keys)) = storage.get(forward, &entry)? {
                entries.push((values, keys));
            }
        }
        Ok(entries)
    }
}

impl SecondaryIndex for FieldIndex {
    fn fields(&self) -> &[String] {
        &self.fields
    }

    fn lookup(&self, storage: &dyn Storage, collection: &str, subquery: &Query, primary_key: &str) -> Result<Vec<Record>> {
        let forward = self.forward_collection(collection);
        let mut stubs = Vec::new();

        for (values, keys) in self.entries(storage, &forward, subquery)? {
            for key in keys {
                let mut stub = Record::new();
                stub.insert(primary_key.to_owned(), Value::String(key));
                for (field, value) in &values {
                    if field != primary_key {
                        stub.insert(field.clone(), value.clone());
                    }
                }
                stubs.push(stub);
            }
        }
        Ok(stubs)
    }
}

/// Copies `value` with the keys of every nested object in sorted order.
fn canonical(value: &Value) -> Value {
    match value {
        Value::Object(object) => {
            let mut fields: Vec<_> = object.iter().collect();
            fields.sort_unstable_by(|(left, _), (right, _)| left.cmp(right));
            Value::Object(fields.into_iter().map(|(field, value)| (field.clone(), canonical(value))).collect())
        }
        Value::Array(items) => Value::Array(items.iter().map(canonical).collect()),
        other => other.clone(),
    }
}

/// Encodes canonical indexed values as a forward entry key.
fn encode(values: Record) -> String {
    Value::Object(values).to_string()
}

fn remove_from_entry(storage: &dyn Storage, forward: &str, entry: &str, key: &str) -> Result<()> {
    let Some(StoredValue::Keys(mut keys)) = storage.get(forward, entry)? else {
        return Ok(());
    };

    keys.retain(|owner| owner != key);
    if keys.is_empty() {
        storage.delete(forward, entry)?;
    } else {
        storage.set(forward, entry, StoredValue::Keys(keys))?;
    }
    Ok(())
}
