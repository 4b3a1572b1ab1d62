// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use serde_json::{Map, Value};

/// A stored record: an ordered mapping from field name to value.
///
/// Field order is insertion order.
pub type Record = Map<String, Value>;

/// A value held by a backend under one `(collection, key)` pair.
///
/// Records are what callers store through the cache. The key variants are used by
/// secondary indexes, which keep their bookkeeping in the same backend.
///
/// # Examples
///
/// ```
/// use hookmap_storage::{Record, StoredValue};
/// use serde_json::json;
///
/// let mut record = Record::new();
/// record.insert("_id".to_string(), json!("1"));
///
/// let value = StoredValue::from(record.clone());
/// assert_eq!(value.as_record(), Some(&record));
/// assert!(value.as_keys().is_none());
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoredValue {
    /// A full record.
    Record(Record),
    /// A list of keys.
    Keys(Vec<String>),
    /// A single key.
    Key(String),
}

impl StoredValue {
    /// Returns the record, if this value is one.
    #[must_use]
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Self::Record(record) => Some(record),
            _ => None,
        }
    }

    /// Consumes the value and returns the record, if this value is one.
    #[must_use]
    pub fn into_record(self) -> Option<Record> {
        match self {
            Self::Record(record) => Some(record),
            _ => None,
        }
    }

    /// Returns the key list, if this value is one.
    #[must_use]
    pub fn as_keys(&self) -> Option<&[String]> {
        match self {
            Self::Keys(keys) => Some(keys),
            _ => None,
        }
    }

    /// Consumes the value and returns the key list, if this value is one.
    #[must_use]
    pub fn into_keys(self) -> Option<Vec<String>> {
        match self {
            Self::Keys(keys) => Some(keys),
            _ => None,
        }
    }

    /// Returns the single key, if this value is one.
    #[must_use]
    pub fn as_key(&self) -> Option<&str> {
        match self {
            Self::Key(key) => Some(key),
            _ => None,
        }
    }
}

impl From<Record> for StoredValue {
    fn from(record: Record) -> Self {
        Self::Record(record)
    }
}

impl From<Vec<String>> for StoredValue {
    fn from(keys: Vec<String>) -> Self {
        Self::Keys(keys)
    }
}

impl From<String> for StoredValue {
    fn from(key: String) -> Self {
        Self::Key(key)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn accessors_match_variant() {
        let keys = StoredValue::from(vec!["a".to_string(), "b".to_string()]);
        assert_eq!(keys.as_keys(), Some(&["a".to_string(), "b".to_string()][..]));
        assert!(keys.as_record().is_none());
        assert!(keys.as_key().is_none());

        let key = StoredValue::from("a".to_string());
        assert_eq!(key.as_key(), Some("a"));
        assert!(key.clone().into_keys().is_none());
        assert!(key.into_record().is_none());
    }

    #[test]
    fn record_round_trips_through_variant() {
        let mut record = Record::new();
        record.insert("_id".to_string(), json!("1"));
        record.insert("age".to_string(), json!(30));

        let value = StoredValue::from(record.clone());
        assert_eq!(value.into_record(), Some(record));
    }
}
