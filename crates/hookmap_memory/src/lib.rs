// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Thread-safe in-memory storage backend.
//!
//! This crate provides [`InMemoryStorage`], a [`Storage`](hookmap_storage::Storage)
//! implementation that keeps every collection in process memory behind a read/write lock.
//! Use [`InMemoryStorageBuilder`] to configure it.
//!
//! # Quick Start
//!
//! ```
//! use hookmap_memory::InMemoryStorage;
//! use hookmap_storage::{Storage, StoredValue};
//!
//! let storage = InMemoryStorage::builder().name("sessions").build();
//!
//! storage.set("sessions", "abc", StoredValue::Key("user-1".to_string()))?;
//! assert_eq!(storage.keys("sessions")?, vec!["abc".to_string()]);
//! # Ok::<(), hookmap_storage::Error>(())
//! ```
//!
//! # Behavior
//!
//! - **Partial updates**: `update` merges record fields into an existing record
//! - **Deterministic enumeration**: `keys` returns keys in sorted order
//! - **Thread-safe**: safe for concurrent access from multiple threads

pub mod builder;
pub mod storage;

#[doc(inline)]
pub use builder::InMemoryStorageBuilder;
#[doc(inline)]
pub use storage::InMemoryStorage;
