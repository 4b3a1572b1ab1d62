// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Builder for configuring in-memory storage.

use crate::storage::InMemoryStorage;

/// Builder for configuring an `InMemoryStorage`.
///
/// # Examples
///
/// ```
/// use hookmap_memory::InMemoryStorage;
///
/// let storage = InMemoryStorage::builder()
///     .name("user-store")
///     .initial_capacity(16)
///     .build();
///
/// assert_eq!(storage.name(), Some("user-store"));
/// ```
#[derive(Debug, Default)]
pub struct InMemoryStorageBuilder {
    pub(crate) initial_capacity: Option<usize>,
    pub(crate) name: Option<String>,
}

impl InMemoryStorageBuilder {
    /// Creates a new builder with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of collections to pre-allocate room for.
    ///
    /// The storage may still grow beyond this size.
    #[must_use]
    pub fn initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = Some(capacity);
        self
    }

    /// Sets a name for the storage.
    ///
    /// The name only appears in debugging output.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Builds the configured `InMemoryStorage`.
    #[must_use]
    pub fn build(self) -> InMemoryStorage {
        InMemoryStorage::from_builder(self)
    }
}
