// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Integration tests for the `Storage` trait contract.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use hookmap_storage::{Error, Record, Storage, StoredValue, Value};

/// Minimal implementation that only provides the required methods.
#[derive(Default)]
struct MinimalStorage {
    data: Mutex<HashMap<String, BTreeMap<String, StoredValue>>>,
}

impl Storage for MinimalStorage {
    fn get(&self, collection: &str, key: &str) -> Result<Option<StoredValue>, Error> {
        let data = self.data.lock().expect("lock poisoned");
        Ok(data.get(collection).and_then(|c| c.get(key)).cloned())
    }

    fn set(&self, collection: &str, key: &str, value: StoredValue) -> Result<(), Error> {
        let mut data = self.data.lock().expect("lock poisoned");
        data.entry(collection.to_owned()).or_default().insert(key.to_owned(), value);
        Ok(())
    }

    fn update(&self, collection: &str, key: &str, value: StoredValue) -> Result<(), Error> {
        self.set(collection, key, value)
    }

    fn delete(&self, collection: &str, key: &str) -> Result<(), Error> {
        let mut data = self.data.lock().expect("lock poisoned");
        if let Some(c) = data.get_mut(collection) {
            c.remove(key);
        }
        Ok(())
    }

    fn keys(&self, collection: &str) -> Result<Vec<String>, Error> {
        let data = self.data.lock().expect("lock poisoned");
        Ok(data.get(collection).map(|c| c.keys().cloned().collect()).unwrap_or_default())
    }
}

fn record(id: &str) -> Record {
    let mut record = Record::new();
    record.insert("_id".to_owned(), Value::from(id));
    record
}

#[test]
fn works_as_trait_object() {
    let storage: Box<dyn Storage> = Box::new(MinimalStorage::default());

    storage.set("users", "1", record("1").into()).expect("set");
    let value = storage.get("users", "1").expect("get").expect("value should exist");
    assert_eq!(value.into_record(), Some(record("1")));
}

#[test]
fn collections_are_partitions() {
    let storage = MinimalStorage::default();
    storage.set("users", "1", record("1").into()).expect("set");
    storage.set("orders", "1", StoredValue::Key("x".to_owned())).expect("set");

    assert_eq!(storage.keys("users").expect("keys"), vec!["1".to_owned()]);
    assert_eq!(
        storage.get("orders", "1").expect("get"),
        Some(StoredValue::Key("x".to_owned()))
    );
}

#[test]
fn delete_then_get_misses() {
    let storage = MinimalStorage::default();
    storage.set("users", "1", record("1").into()).expect("set");
    storage.delete("users", "1").expect("delete");

    assert!(storage.get("users", "1").expect("get").is_none());
    assert!(storage.keys("users").expect("keys").is_empty());
}
