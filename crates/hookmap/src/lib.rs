// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! A storage-agnostic caching facade with hook pipelines and index-assisted search.
//!
//! A [`Cache`] sits in front of any [`Storage`] backend and adds two things:
//!
//! - **Pipelines**: every `get`, `set`, `update` and `delete` runs through a chain of
//!   before/after hooks ordered by priority and optionally filtered by collection. Custom
//!   operations get a pipeline of their own through [`Cache::execute`].
//! - **Search**: [`Cache::search`] answers field queries from secondary indexes when they cover
//!   the query, and scans the collection otherwise.
//!
//! Records are JSON objects that carry their own key in a primary-key field (`"_id"` by
//! default).
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//!
//! use hookmap::{Cache, FieldIndex, IndexRegistry, Query};
//! use serde_json::json;
//!
//! let registry = Arc::new(IndexRegistry::new());
//! let cache = Cache::builder().indexes(Arc::clone(&registry)).memory().build();
//! registry.register(&cache, FieldIndex::new(["age"]).for_collection("users"));
//!
//! for user in [
//!     json!({"_id": "1", "name": "ana", "age": 30}),
//!     json!({"_id": "2", "name": "bob", "age": 30}),
//! ] {
//!     let user = user.as_object().cloned().unwrap();
//!     let key = user["_id"].as_str().unwrap().to_string();
//!     cache.set("users", &key, user)?;
//! }
//!
//! let query = Query::new()
//!     .matching("age", |age| age.and_then(|v| v.as_i64()).is_some_and(|age| age > 25))
//!     .equals("name", "bob");
//! let found = cache.search("users", &query)?;
//!
//! assert_eq!(found.len(), 1);
//! assert_eq!(found[0]["name"], json!("bob"));
//! # Ok::<(), hookmap::Error>(())
//! ```
//!
//! # Hooks
//!
//! ```
//! use hookmap::{Cache, Error, Operation};
//!
//! let cache = Cache::builder().memory().build();
//!
//! cache.register_before_hook(Operation::Delete, 1, Some("audit"), |_| {
//!     Err(Error::hook("audit records are permanent"))
//! });
//!
//! assert!(cache.delete("audit", "1").is_err());
//! assert!(cache.delete("users", "1").is_ok());
//! ```

pub mod action;
pub mod builder;
pub mod cache;
pub mod context;
pub mod error;
pub mod index;
pub mod manager;
pub mod operation;
pub mod pipeline;
pub mod query;
mod search;
mod telemetry;

#[doc(inline)]
pub use action::Action;
#[doc(inline)]
pub use builder::CacheBuilder;
#[doc(inline)]
pub use cache::{All, Cache};
#[doc(inline)]
pub use context::{Outcome, PipelineContext};
#[doc(inline)]
pub use error::{Error, InvalidRecord, Result};
#[cfg(feature = "memory")]
#[doc(inline)]
pub use hookmap_memory::InMemoryStorage;
#[doc(inline)]
pub use hookmap_storage::{Record, Storage, StoredValue, Value};
#[cfg(feature = "test-util")]
#[doc(inline)]
pub use hookmap_storage::testing::{MockStorage, StorageOp};
#[doc(inline)]
pub use index::{Combination, FieldIndex, IndexCatalog, IndexRegistry, SecondaryIndex};
#[doc(inline)]
pub use manager::PipelineManager;
#[doc(inline)]
pub use operation::Operation;
#[doc(inline)]
pub use pipeline::Pipeline;
#[doc(inline)]
pub use query::{Condition, Predicate, Query};
