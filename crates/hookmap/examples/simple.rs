// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Basic usage: hooks, indexes and search over an in-memory backend.

use std::sync::Arc;

use hookmap::{Cache, Error, FieldIndex, IndexRegistry, Operation, Query, Record};
use serde_json::json;

fn user(id: &str, name: &str, age: u32) -> Record {
    let mut record = Record::new();
    record.insert("_id".to_string(), json!(id));
    record.insert("name".to_string(), json!(name));
    record.insert("age".to_string(), json!(age));
    record
}

fn main() -> Result<(), Error> {
    let registry = Arc::new(IndexRegistry::new());
    let cache = Cache::builder()
        .name("example")
        .indexes(Arc::clone(&registry))
        .memory()
        .build();

    registry.register(&cache, FieldIndex::new(["age"]).for_collection("users"));

    cache.register_before_hook(Operation::Set, 1, Some("users"), |ctx| {
        println!("storing {} in {}", ctx.key(), ctx.collection());
        Ok(())
    });

    cache.set("users", "1", user("1", "ana", 30))?;
    cache.set("users", "2", user("2", "bob", 30))?;
    cache.set("users", "3", user("3", "cy", 19))?;

    let thirty = cache.search("users", &Query::new().equals("age", 30))?;
    println!("age 30: {}", thirty.len());

    let query = Query::new()
        .matching("age", |age| age.and_then(serde_json::Value::as_u64).is_some_and(|age| age > 25))
        .equals("name", "bob");
    for record in cache.search("users", &query)? {
        println!("match: {}", serde_json::Value::Object(record));
    }

    for record in cache.all("users") {
        let record = record?;
        println!("all: {}", record["name"]);
    }

    Ok(())
}
