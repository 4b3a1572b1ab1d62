// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Names of the operations that own a pipeline.

use std::borrow::Cow;
use std::fmt;

/// An operation wrapped by a pipeline.
///
/// The four built-in operations always have a pipeline. `Custom` operations get one the
/// first time they are looked up.
///
/// # Examples
///
/// ```
/// use hookmap::Operation;
///
/// assert_eq!(Operation::Get.as_str(), "get");
/// assert_eq!(Operation::custom("export").as_str(), "export");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Read a record.
    Get,
    /// Write a full record.
    Set,
    /// Merge a partial record.
    Update,
    /// Remove a record.
    Delete,
    /// A caller-defined operation run through `Cache::execute`.
    Custom(Cow<'static, str>),
}

impl Operation {
    /// The operations whose pipelines exist from the start.
    pub const BUILT_IN: [Self; 4] = [Self::Get, Self::Set, Self::Update, Self::Delete];

    /// Creates a custom operation.
    pub fn custom(name: impl Into<Cow<'static, str>>) -> Self {
        Self::Custom(name.into())
    }

    /// Returns the operation name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Get => "get",
            Self::Set => "set",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Custom(name) => name.as_ref(),
        }
    }

    /// Returns `true` for the operations in [`Operation::BUILT_IN`].
    #[must_use]
    pub fn is_built_in(&self) -> bool {
        !matches!(self, Self::Custom(_))
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
