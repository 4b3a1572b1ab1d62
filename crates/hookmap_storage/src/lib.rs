// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Storage backend contract for the `hookmap` caching facade.
//!
//! This crate defines the [`Storage`] trait that every key/value backend must satisfy, the
//! [`StoredValue`] held under a `(collection, key)` pair, the [`Record`] type and the backend
//! [`Error`].
//!
//! # Overview
//!
//! The storage abstraction separates persistence from the caching features. Implement
//! [`Storage`] for your backend, then put `hookmap::Cache` in front of it to get hook pipelines,
//! primary-key validation and index-assisted search.
//!
//! Backends are shared between threads, so implementations must handle their own locking.
//!
//! # Implementing a Backend
//!
//! ```
//! use std::collections::{BTreeMap, HashMap};
//! use std::sync::RwLock;
//!
//! use hookmap_storage::{Error, Storage, StoredValue};
//!
//! #[derive(Default)]
//! struct SimpleStorage(RwLock<HashMap<String, BTreeMap<String, StoredValue>>>);
//!
//! impl Storage for SimpleStorage {
//!     fn get(&self, collection: &str, key: &str) -> Result<Option<StoredValue>, Error> {
//!         let data = self.0.read().map_err(|e| Error::from_message(e.to_string()))?;
//!         Ok(data.get(collection).and_then(|c| c.get(key)).cloned())
//!     }
//!
//!     fn set(&self, collection: &str, key: &str, value: StoredValue) -> Result<(), Error> {
//!         let mut data = self.0.write().map_err(|e| Error::from_message(e.to_string()))?;
//!         data.entry(collection.to_owned()).or_default().insert(key.to_owned(), value);
//!         Ok(())
//!     }
//!
//!     fn update(&self, collection: &str, key: &str, value: StoredValue) -> Result<(), Error> {
//!         self.set(collection, key, value)
//!     }
//!
//!     fn delete(&self, collection: &str, key: &str) -> Result<(), Error> {
//!         let mut data = self.0.write().map_err(|e| Error::from_message(e.to_string()))?;
//!         if let Some(c) = data.get_mut(collection) {
//!             c.remove(key);
//!         }
//!         Ok(())
//!     }
//!
//!     fn keys(&self, collection: &str) -> Result<Vec<String>, Error> {
//!         let data = self.0.read().map_err(|e| Error::from_message(e.to_string()))?;
//!         Ok(data.get(collection).map(|c| c.keys().cloned().collect()).unwrap_or_default())
//!     }
//! }
//! ```

pub mod error;
mod storage;
#[cfg(any(feature = "test-util", test))]
pub mod testing;
mod value;

#[doc(inline)]
pub use error::{Error, Result};
#[doc(no_inline)]
pub use serde_json::Value;
#[doc(inline)]
pub use storage::Storage;
#[doc(inline)]
pub use value::{Record, StoredValue};
