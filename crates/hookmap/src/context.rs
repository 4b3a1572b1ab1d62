// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Per-invocation state shared by the hooks of a pipeline.

use std::any::Any;
use std::collections::HashMap;
use std::fmt::Debug;

use hookmap_storage::{Record, Storage};

use crate::operation::Operation;

/// What the main function of a pipeline produced.
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    /// A read finished; `None` when the key was absent.
    Fetched(Option<Record>),
    /// A write finished.
    Written,
}

impl Outcome {
    /// Returns the fetched record, if any.
    #[must_use]
    pub fn into_record(self) -> Option<Record> {
        match self {
            Self::Fetched(record) => record,
            Self::Written => None,
        }
    }
}

/// Typed values hooks hand to each other within one invocation.
///
/// # Examples
///
/// ```
/// use hookmap::context::Scratch;
///
/// let mut scratch = Scratch::default();
/// scratch.insert("started", 42_u64);
///
/// assert_eq!(scratch.get::<u64>("started"), Some(&42));
/// assert_eq!(scratch.get::<String>("started"), None);
/// ```
#[derive(Default)]
pub struct Scratch {
    values: HashMap<String, Box<dyn Any + Send + Sync>>,
}

impl Scratch {
    /// Stores `value` under `name`, replacing any previous value.
    pub fn insert<T: Any + Send + Sync>(&mut self, name: impl Into<String>, value: T) {
        self.values.insert(name.into(), Box::new(value));
    }

    /// Returns the value under `name` if it has type `T`.
    #[must_use]
    pub fn get<T: Any>(&self, name: &str) -> Option<&T> {
        self.values.get(name).and_then(|value| (**value).downcast_ref::<T>())
    }

    /// Returns a mutable reference to the value under `name` if it has type `T`.
    pub fn get_mut<T: Any>(&mut self, name: &str) -> Option<&mut T> {
        self.values.get_mut(name).and_then(|value| (**value).downcast_mut::<T>())
    }

    /// Removes and returns the value under `name` if it has type `T`.
    ///
    /// A value of another type is left in place.
    pub fn remove<T: Any>(&mut self, name: &str) -> Option<T> {
        if !self.values.get(name).is_some_and(|value| (**value).is::<T>()) {
            return None;
        }

        self.values
            .remove(name)
            .and_then(|value| value.downcast::<T>().ok())
            .map(|value| *value)
    }

    /// Returns `true` if a value is stored under `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }
}

impl Debug for Scratch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.values.keys().collect();
        names.sort();
        f.debug_struct("Scratch").field("names", &names).finish()
    }
}

/// State of one pipeline invocation.
///
/// A context is created for every call and dropped when the call returns. It carries the
/// storage backend the call is bound to, the call arguments (which before-hooks may
/// rewrite), the result slot filled in once the main function returns, and a scratch map.
pub struct PipelineContext<'a> {
    operation: Operation,
    storage: &'a dyn Storage,
    primary_key: &'a str,
    collection: &'a str,
    key: String,
    record: Option<Record>,
    result: Option<Outcome>,
    scratch: Scratch,
}

impl<'a> PipelineContext<'a> {
    /// Creates a context for one invocation of `operation`.
    pub fn new(
        operation: Operation,
        storage: &'a dyn Storage,
        primary_key: &'a str,
        collection: &'a str,
        key: impl Into<String>,
        record: Option<Record>,
    ) -> Self {
        Self {
            operation,
            storage,
            primary_key,
            collection,
            key: key.into(),
            record,
            result: None,
            scratch: Scratch::default(),
        }
    }

    /// Returns the operation being executed.
    #[must_use]
    pub fn operation(&self) -> &Operation {
        &self.operation
    }

    /// Returns the storage backend the call is bound to.
    #[must_use]
    pub fn storage(&self) -> &'a dyn Storage {
        self.storage
    }

    /// Returns the name of the primary-key field.
    #[must_use]
    pub fn primary_key(&self) -> &'a str {
        self.primary_key
    }

    /// Returns the collection the call addresses.
    #[must_use]
    pub fn collection(&self) -> &'a str {
        self.collection
    }

    /// Returns the key argument.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns the key argument for rewriting.
    pub fn key_mut(&mut self) -> &mut String {
        &mut self.key
    }

    /// Returns the record argument of a write.
    #[must_use]
    pub fn record(&self) -> Option<&Record> {
        self.record.as_ref()
    }

    /// Returns the record argument of a write for rewriting.
    pub fn record_mut(&mut self) -> Option<&mut Record> {
        self.record.as_mut()
    }

    /// Returns the result, which is empty until the main function returns.
    #[must_use]
    pub fn result(&self) -> Option<&Outcome> {
        self.result.as_ref()
    }

    /// Returns the result for rewriting.
    pub fn result_mut(&mut self) -> Option<&mut Outcome> {
        self.result.as_mut()
    }

    /// Replaces the result.
    pub fn set_result(&mut self, outcome: Outcome) {
        self.result = Some(outcome);
    }

    pub(crate) fn take_result(&mut self) -> Option<Outcome> {
        self.result.take()
    }

    /// Returns the scratch map.
    #[must_use]
    pub fn scratch(&self) -> &Scratch {
        &self.scratch
    }

    /// Returns the scratch map for writing.
    pub fn scratch_mut(&mut self) -> &mut Scratch {
        &mut self.scratch
    }
}

impl Debug for PipelineContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineContext")
            .field("operation", &self.operation)
            .field("collection", &self.collection)
            .field("key", &self.key)
            .field("record", &self.record)
            .field("result", &self.result)
            .field("scratch", &self.scratch)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use hookmap_storage::testing::MockStorage;
    use serde_json::json;

    use super::*;

    #[test]
    fn scratch_typed_access() {
        let mut scratch = Scratch::default();
        scratch.insert("count", 1_usize);
        *scratch.get_mut::<usize>("count").unwrap() += 1;

        assert_eq!(scratch.remove::<String>("count"), None);
        assert!(scratch.contains("count"));
        assert_eq!(scratch.remove::<usize>("count"), Some(2));
        assert!(!scratch.contains("count"));
    }

    #[test]
    fn arguments_are_mutable() {
        let storage = MockStorage::new();
        let mut record = Record::new();
        record.insert("_id".to_owned(), json!("1"));

        let mut ctx = PipelineContext::new(Operation::Set, &storage, "_id", "users", "1", Some(record));
        ctx.key_mut().push('0');
        ctx.record_mut().unwrap().insert("_id".to_owned(), json!("10"));

        assert_eq!(ctx.key(), "10");
        assert_eq!(ctx.record().unwrap()["_id"], json!("10"));
        assert_eq!(ctx.collection(), "users");
        assert_eq!(ctx.primary_key(), "_id");
        assert_eq!(ctx.operation(), &Operation::Set);
    }

    #[test]
    fn result_slot() {
        let storage = MockStorage::new();
        let mut ctx = PipelineContext::new(Operation::Get, &storage, "_id", "users", "1", None);
        assert!(ctx.result().is_none());

        ctx.set_result(Outcome::Fetched(None));
        if let Some(outcome) = ctx.result_mut() {
            *outcome = Outcome::Written;
        }
        assert_eq!(ctx.take_result(), Some(Outcome::Written));
        assert!(ctx.result().is_none());
    }

    #[test]
    fn outcome_into_record() {
        let record = Record::new();
        assert_eq!(Outcome::Fetched(Some(record.clone())).into_record(), Some(record));
        assert_eq!(Outcome::Written.into_record(), None);
    }
}
