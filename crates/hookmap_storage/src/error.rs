// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Error types for storage operations.

/// An error from a storage backend.
///
/// This is an opaque error type that can wrap any underlying error from a backend
/// implementation. Use [`std::error::Error::source()`] to access the underlying
/// cause if needed.
///
/// # Example
///
/// ```
/// use hookmap_storage::Error;
///
/// let error = Error::from_message("connection reset");
/// assert_eq!(error.to_string(), "connection reset");
/// ```
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct Error(Box<dyn std::error::Error + Send + Sync>);

impl Error {
    /// Creates a new error from a message or any boxable error.
    pub fn from_message(cause: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self(cause.into())
    }

    /// Creates a new error wrapping a concrete source error.
    pub fn from_source(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self(Box::new(source))
    }

    /// Returns the wrapped cause if it is of type `T`.
    #[must_use]
    pub fn cause_as<T: std::error::Error + 'static>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }
}

/// A specialized [`Result`] type for storage operations.
pub type Result<T> = std::result::Result<T, Error>;
