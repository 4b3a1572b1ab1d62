// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Error types for cache operations.

use std::error::Error as StdError;

use hookmap_storage::Value;

/// A specialized `Result` type for cache operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// An error produced by a cache operation.
///
/// Errors are never retried or translated: a backend error surfaces as [`Error::Storage`],
/// an error raised by a hook surfaces exactly as the hook returned it.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The record handed to `set` or `update` failed primary-key validation.
    #[error("invalid record: {0}")]
    InvalidRecord(#[from] InvalidRecord),

    /// The storage backend failed.
    #[error(transparent)]
    Storage(#[from] hookmap_storage::Error),

    /// A hook aborted the pipeline.
    #[error("hook failed: {0}")]
    Hook(#[source] Box<dyn StdError + Send + Sync>),

    /// A unique index already maps the indexed values to a different key.
    #[error("unique index `{index}` already holds {value}")]
    UniqueViolation {
        /// Name of the index that rejected the write.
        index: String,
        /// Canonical form of the conflicting indexed values.
        value: String,
    },

    /// A record was expected but the backend holds a different kind of value.
    #[error("entry `{key}` in collection `{collection}` is not a record")]
    NotARecord {
        /// The collection addressed.
        collection: String,
        /// The key addressed.
        key: String,
    },
}

impl Error {
    /// Creates a hook error from any error or message.
    ///
    /// # Examples
    ///
    /// ```
    /// use hookmap::Error;
    ///
    /// let error = Error::hook("quota exceeded");
    /// assert_eq!(error.to_string(), "hook failed: quota exceeded");
    /// ```
    pub fn hook(cause: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Self::Hook(cause.into())
    }

    /// Returns `true` if the operation was rejected because of the data it was given,
    /// as opposed to a failure of the backend or of a hook.
    #[must_use]
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::InvalidRecord(_) | Self::UniqueViolation { .. })
    }
}

/// Why a record failed primary-key validation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum InvalidRecord {
    /// The primary-key field is absent or `null`.
    #[error("primary key field `{field}` is missing")]
    MissingPrimaryKey {
        /// The primary-key field name.
        field: String,
    },

    /// The primary-key field does not equal the storage key.
    #[error("primary key field `{field}` is {found} but the key is \"{key}\"")]
    PrimaryKeyMismatch {
        /// The primary-key field name.
        field: String,
        /// The storage key the record was written under.
        key: String,
        /// The value found in the record.
        found: Value,
    },
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use static_assertions::assert_impl_all;

    use super::*;

    #[test]
    fn error_is_send_and_sync() {
        assert_impl_all!(Error: Send, Sync, std::error::Error);
    }

    #[test]
    fn invalid_record_display() {
        let missing = Error::from(InvalidRecord::MissingPrimaryKey { field: "_id".to_owned() });
        assert_eq!(missing.to_string(), "invalid record: primary key field `_id` is missing");

        let mismatch = InvalidRecord::PrimaryKeyMismatch {
            field: "_id".to_owned(),
            key: "1".to_owned(),
            found: json!("2"),
        };
        assert_eq!(mismatch.to_string(), "primary key field `_id` is \"2\" but the key is \"1\"");
    }

    #[test]
    fn storage_error_is_transparent() {
        let error = Error::from(hookmap_storage::Error::from_message("disk full"));
        assert_eq!(error.to_string(), "disk full");
        assert!(matches!(error, Error::Storage(_)));
    }

    #[test]
    fn hook_error_keeps_source() {
        let error = Error::hook(std::io::Error::other("boom"));
        let source = std::error::Error::source(&error).expect("hook errors carry a source");
        assert_eq!(source.to_string(), "boom");
    }

    #[test]
    fn rejections() {
        assert!(Error::from(InvalidRecord::MissingPrimaryKey { field: "_id".to_owned() }).is_rejection());
        assert!(
            Error::UniqueViolation {
                index: "email".to_owned(),
                value: "{}".to_owned()
            }
            .is_rejection()
        );
        assert!(!Error::hook("nope").is_rejection());
    }
}
