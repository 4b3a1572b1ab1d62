// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Integration tests for index-assisted search.

use std::sync::Arc;

use hookmap::{Cache, FieldIndex, IndexRegistry, Query, Record, Value};
use hookmap_storage::testing::{MockStorage, StorageOp};
use serde_json::json;

fn record(value: Value) -> Record {
    value.as_object().cloned().expect("test records are objects")
}

fn older_than(limit: i64) -> impl Fn(Option<&Value>) -> bool + Send + Sync + 'static {
    move |age| age.and_then(Value::as_i64).is_some_and(|age| age > limit)
}

struct Fixture {
    cache: Cache,
    storage: MockStorage,
    registry: Arc<IndexRegistry>,
}

impl Fixture {
    fn new() -> Self {
        let storage = MockStorage::new();
        let registry = Arc::new(IndexRegistry::new());
        let cache = Cache::builder()
            .indexes(Arc::clone(&registry))
            .storage(storage.clone())
            .build();
        Self { cache, storage, registry }
    }

    fn index(&self, index: FieldIndex) -> &Self {
        self.registry.register(&self.cache, index);
        self
    }

    fn insert(&self, collection: &str, value: Value) {
        let record = record(value);
        let key = record["_id"].as_str().expect("string key").to_owned();
        self.cache.set(collection, &key, record).expect("set");
    }

    fn users(&self) {
        self.insert("users", json!({"_id": "1", "name": "ana", "age": 30}));
        self.insert("users", json!({"_id": "2", "name": "bob", "age": 30}));
    }

    fn fetched_from(&self, collection: &str) -> Vec<String> {
        self.storage
            .operations_on(collection)
            .into_iter()
            .filter_map(|op| match op {
                StorageOp::Get { key, .. } => Some(key),
                _ => None,
            })
            .collect()
    }
}

#[test]
fn indexed_equality_returns_both_matches() -> hookmap::Result<()> {
    let fixture = Fixture::new();
    fixture.index(FieldIndex::new(["age"]).for_collection("users"));
    fixture.users();

    let found = fixture.cache.search("users", &Query::new().equals("age", 30))?;

    assert_eq!(
        found,
        vec![
            record(json!({"_id": "1", "name": "ana", "age": 30})),
            record(json!({"_id": "2", "name": "bob", "age": 30})),
        ]
    );
    Ok(())
}

#[test]
fn residual_conditions_filter_candidates() -> hookmap::Result<()> {
    let fixture = Fixture::new();
    fixture.index(FieldIndex::new(["age"]).for_collection("users"));
    fixture.users();

    let query = Query::new().matching("age", older_than(25)).equals("name", "bob");
    let found = fixture.cache.search("users", &query)?;

    assert_eq!(found, vec![record(json!({"_id": "2", "name": "bob", "age": 30}))]);
    Ok(())
}

#[test]
fn empty_query_without_indexes_returns_everything() -> hookmap::Result<()> {
    let fixture = Fixture::new();
    fixture.users();

    let found = fixture.cache.search("users", &Query::new())?;

    assert_eq!(found.len(), 2);
    Ok(())
}

#[test]
fn scan_fallback_matches_full_query() -> hookmap::Result<()> {
    let fixture = Fixture::new();
    fixture.users();

    let found = fixture.cache.search("users", &Query::new().equals("name", "ana"))?;

    assert_eq!(found, vec![record(json!({"_id": "1", "name": "ana", "age": 30}))]);
    Ok(())
}

#[test]
fn covered_query_fetches_only_matches() -> hookmap::Result<()> {
    let fixture = Fixture::new();
    fixture.index(FieldIndex::new(["age"]).for_collection("users"));
    fixture.users();
    fixture.insert("users", json!({"_id": "3", "name": "cy", "age": 51}));
    fixture.insert("users", json!({"_id": "4", "name": "di", "age": 52}));
    fixture.storage.clear_operations();

    let found = fixture.cache.search("users", &Query::new().equals("age", 51))?;

    assert_eq!(found, vec![record(json!({"_id": "3", "name": "cy", "age": 51}))]);
    assert_eq!(fixture.fetched_from("users"), ["3"]);
    assert!(
        !fixture
            .storage
            .operations_on("users")
            .iter()
            .any(|op| matches!(op, StorageOp::Keys { .. }))
    );
    Ok(())
}

#[test]
fn unrelated_index_falls_back_to_scan() -> hookmap::Result<()> {
    let fixture = Fixture::new();
    fixture.index(FieldIndex::new(["email"]).for_collection("users"));
    fixture.users();
    fixture.storage.clear_operations();

    let found = fixture.cache.search("users", &Query::new().equals("age", 30))?;

    assert_eq!(found.len(), 2);
    assert!(
        fixture
            .storage
            .operations_on("users")
            .iter()
            .any(|op| matches!(op, StorageOp::Keys { .. }))
    );
    Ok(())
}

#[test]
fn index_for_other_collection_is_ignored() -> hookmap::Result<()> {
    let fixture = Fixture::new();
    fixture.index(FieldIndex::new(["age"]).for_collection("orders"));
    fixture.users();

    let found = fixture.cache.search("users", &Query::new().equals("age", 30))?;

    assert_eq!(found.len(), 2);
    assert_eq!(fixture.storage.entry_count("_index_:users:age"), 0);
    Ok(())
}

#[test]
fn global_index_serves_every_collection() -> hookmap::Result<()> {
    let fixture = Fixture::new();
    fixture.index(FieldIndex::new(["status"]));
    fixture.insert("orders", json!({"_id": "o1", "status": "open"}));
    fixture.insert("tickets", json!({"_id": "t1", "status": "open"}));
    fixture.insert("tickets", json!({"_id": "t2", "status": "closed"}));

    let open = Query::new().equals("status", "open");

    assert_eq!(fixture.cache.search("orders", &open)?.len(), 1);
    assert_eq!(fixture.cache.search("tickets", &open)?, vec![record(json!({"_id": "t1", "status": "open"}))]);
    Ok(())
}

#[test]
fn multiple_indexes_intersect() -> hookmap::Result<()> {
    let fixture = Fixture::new();
    fixture
        .index(FieldIndex::new(["age"]).for_collection("users"))
        .index(FieldIndex::new(["name"]).for_collection("users"));
    fixture.users();
    fixture.insert("users", json!({"_id": "3", "name": "bob", "age": 40}));
    fixture.storage.clear_operations();

    let found = fixture.cache.search("users", &Query::new().equals("age", 30).equals("name", "bob"))?;

    assert_eq!(found, vec![record(json!({"_id": "2", "name": "bob", "age": 30}))]);
    assert_eq!(fixture.fetched_from("users"), ["2"]);
    Ok(())
}

#[test]
fn compound_index_with_predicate() -> hookmap::Result<()> {
    let fixture = Fixture::new();
    fixture.index(FieldIndex::new(["name", "age"]).for_collection("users"));
    fixture.users();
    fixture.insert("users", json!({"_id": "3", "name": "bob", "age": 20}));

    let query = Query::new().equals("name", "bob").matching("age", older_than(25));
    let found = fixture.cache.search("users", &query)?;

    assert_eq!(found, vec![record(json!({"_id": "2", "name": "bob", "age": 30}))]);
    Ok(())
}

#[test]
fn primary_key_index_finds_single_record() -> hookmap::Result<()> {
    let fixture = Fixture::new();
    fixture.index(FieldIndex::primary("_id").for_collection("users"));
    fixture.users();

    let found = fixture.cache.search("users", &Query::new().equals("_id", "2"))?;

    assert_eq!(found, vec![record(json!({"_id": "2", "name": "bob", "age": 30}))]);
    Ok(())
}

#[test]
fn vanished_records_are_skipped() -> hookmap::Result<()> {
    let fixture = Fixture::new();
    fixture.index(FieldIndex::new(["age"]).for_collection("users"));
    fixture.users();
    hookmap::Storage::delete(&fixture.storage, "users", "1")?;

    let found = fixture.cache.search("users", &Query::new().equals("age", 30))?;

    assert_eq!(found, vec![record(json!({"_id": "2", "name": "bob", "age": 30}))]);
    Ok(())
}

#[test]
fn missing_field_matches_null() -> hookmap::Result<()> {
    let fixture = Fixture::new();
    fixture.index(FieldIndex::new(["email"]).for_collection("users"));
    fixture.insert("users", json!({"_id": "1"}));
    fixture.insert("users", json!({"_id": "2", "email": "bob@example.com"}));

    let found = fixture.cache.search("users", &Query::new().equals("email", Value::Null))?;

    assert_eq!(found, vec![record(json!({"_id": "1"}))]);
    Ok(())
}

#[test]
fn object_values_match_regardless_of_key_order() -> hookmap::Result<()> {
    let fixture = Fixture::new();
    fixture.index(FieldIndex::new(["meta"]).for_collection("users"));
    fixture.insert("users", json!({"_id": "1", "meta": {"b": 1, "a": 2}}));
    fixture.insert("users", json!({"_id": "2", "meta": {"a": 1, "b": 2}}));
    fixture.storage.clear_operations();

    let found = fixture.cache.search("users", &Query::new().equals("meta", json!({"a": 2, "b": 1})))?;

    assert_eq!(found, vec![record(json!({"_id": "1", "meta": {"b": 1, "a": 2}}))]);
    assert_eq!(fixture.fetched_from("users"), ["1"]);
    Ok(())
}
