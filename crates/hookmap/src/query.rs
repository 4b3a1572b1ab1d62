// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Field conditions used by search.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Debug;
use std::sync::Arc;

use hookmap_storage::{Record, Value};

/// A test applied to the value of one field.
///
/// The predicate receives `None` when the record lacks the field.
#[derive(Clone)]
pub struct Predicate(Arc<dyn Fn(Option<&Value>) -> bool + Send + Sync>);

impl Predicate {
    /// Wraps a closure.
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(Option<&Value>) -> bool + Send + Sync + 'static,
    {
        Self(Arc::new(predicate))
    }

    /// Evaluates the predicate.
    #[must_use]
    pub fn test(&self, value: Option<&Value>) -> bool {
        (self.0)(value)
    }
}

impl Debug for Predicate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Predicate(..)")
    }
}

/// What a record's field must satisfy.
#[derive(Clone, Debug)]
pub enum Condition {
    /// The field equals the value. A missing field compares as `null`.
    Equals(Value),
    /// The predicate accepts the field value.
    Matches(Predicate),
}

impl Condition {
    /// Evaluates the condition against a field value.
    #[must_use]
    pub fn is_satisfied_by(&self, value: Option<&Value>) -> bool {
        match self {
            Self::Equals(expected) => value.unwrap_or(&Value::Null) == expected,
            Self::Matches(predicate) => predicate.test(value),
        }
    }

    /// Returns the expected value of an equality condition.
    #[must_use]
    pub fn as_equals(&self) -> Option<&Value> {
        match self {
            Self::Equals(value) => Some(value),
            Self::Matches(_) => None,
        }
    }
}

impl From<Value> for Condition {
    fn from(value: Value) -> Self {
        Self::Equals(value)
    }
}

impl From<Predicate> for Condition {
    fn from(predicate: Predicate) -> Self {
        Self::Matches(predicate)
    }
}

/// A conjunction of field conditions.
///
/// A record matches when every condition holds. The empty query matches every record.
///
/// # Examples
///
/// ```
/// use hookmap::Query;
/// use serde_json::json;
///
/// let query = Query::new()
///     .equals("name", "bob")
///     .matching("age", |age| age.and_then(|v| v.as_i64()).is_some_and(|age| age > 25));
///
/// let record = json!({"_id": "2", "name": "bob", "age": 30});
/// assert!(query.matches(record.as_object().unwrap()));
/// ```
#[derive(Clone, Debug, Default)]
pub struct Query {
    conditions: BTreeMap<String, Condition>,
}

impl Query {
    /// Creates an empty query.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an equality condition.
    #[must_use]
    pub fn equals(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(field, Condition::Equals(value.into()));
        self
    }

    /// Adds a predicate condition.
    #[must_use]
    pub fn matching<F>(mut self, field: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(Option<&Value>) -> bool + Send + Sync + 'static,
    {
        self.insert(field, Condition::Matches(Predicate::new(predicate)));
        self
    }

    /// Sets the condition on `field`, replacing any previous one.
    pub fn insert(&mut self, field: impl Into<String>, condition: impl Into<Condition>) {
        self.conditions.insert(field.into(), condition.into());
    }

    /// Returns the number of conditions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    /// Returns `true` if the query has no conditions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Returns the constrained field names in sorted order.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.conditions.keys().map(String::as_str)
    }

    /// Returns the condition on `field`.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Condition> {
        self.conditions.get(field)
    }

    /// Iterates over field names and their conditions.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Condition)> {
        self.conditions.iter().map(|(field, condition)| (field.as_str(), condition))
    }

    /// Returns the conditions on the given fields only.
    #[must_use]
    pub fn restrict<S: AsRef<str>>(&self, fields: &[S]) -> Self {
        let conditions = fields
            .iter()
            .filter_map(|field| {
                let field = field.as_ref();
                self.conditions.get(field).map(|condition| (field.to_owned(), condition.clone()))
            })
            .collect();

        Self { conditions }
    }

    /// Returns the conditions on fields outside `fields`.
    #[must_use]
    pub fn without(&self, fields: &BTreeSet<String>) -> Self {
        let conditions = self
            .conditions
            .iter()
            .filter(|(field, _)| !fields.contains(*field))
            .map(|(field, condition)| (field.clone(), condition.clone()))
            .collect();

        Self { conditions }
    }

    /// Returns `true` if `record` satisfies every condition.
    #[must_use]
    pub fn matches(&self, record: &Record) -> bool {
        self.conditions
            .iter()
            .all(|(field, condition)| condition.is_satisfied_by(record.get(field)))
    }
}

impl<K, V> FromIterator<(K, V)> for Query
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let conditions = iter
            .into_iter()
            .map(|(field, value)| (field.into(), Condition::Equals(value.into())))
            .collect();

        Self { conditions }
    }
}
