// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The core trait for storage backends.
//!
//! [`Storage`] defines the interface that all backends must implement. The cache calls it
//! synchronously on the caller's thread and performs no locking of its own.

use crate::{Error, StoredValue};

/// Trait for storage backend implementations.
///
/// Every operation addresses a `(collection, key)` pair, where a collection is a named
/// partition of the key space.
///
/// Backends are shared across threads, hence the `Send + Sync` bound. Any locking needed to
/// keep the backend consistent under concurrent calls is the implementation's responsibility.
pub trait Storage: Send + Sync {
    /// Gets the value stored under `key`, or `None` if absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend operation fails.
    fn get(&self, collection: &str, key: &str) -> Result<Option<StoredValue>, Error>;

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend operation fails.
    fn set(&self, collection: &str, key: &str, value: StoredValue) -> Result<(), Error>;

    /// Updates the value stored under `key`.
    ///
    /// How a partial record is combined with the stored one is up to the backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend operation fails.
    fn update(&self, collection: &str, key: &str, value: StoredValue) -> Result<(), Error>;

    /// Deletes the value stored under `key`. Deleting an absent key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend operation fails.
    fn delete(&self, collection: &str, key: &str) -> Result<(), Error>;

    /// Returns every key currently stored in `collection`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend operation fails.
    fn keys(&self, collection: &str) -> Result<Vec<String>, Error>;
}
