// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Structured log events for cache operations.
//!
//! Every facade operation records one activity through `tracing`. No subscriber is installed
//! here; applications decide where events go.

use crate::operation::Operation;

#[cfg(test)]
pub(crate) mod testing;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CacheActivity {
    Hit,
    Miss,
    Stored,
    Updated,
    Deleted,
    Executed,
    Rejected,
    Error,
    IndexHit,
    IndexMiss,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Severity {
    Debug,
    Info,
    Warn,
    Error,
}

impl CacheActivity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hit => "cache.hit",
            Self::Miss => "cache.miss",
            Self::Stored => "cache.stored",
            Self::Updated => "cache.updated",
            Self::Deleted => "cache.deleted",
            Self::Executed => "cache.executed",
            Self::Rejected => "cache.rejected",
            Self::Error => "cache.error",
            Self::IndexHit => "cache.index_hit",
            Self::IndexMiss => "cache.index_miss",
        }
    }

    pub fn severity(self) -> Severity {
        match self {
            Self::Hit | Self::Miss | Self::IndexHit | Self::Executed => Severity::Debug,
            Self::Stored | Self::Updated | Self::Deleted => Severity::Info,
            Self::Rejected | Self::IndexMiss => Severity::Warn,
            Self::Error => Severity::Error,
        }
    }

    /// Picks the activity describing a failed operation.
    pub fn for_error(error: &crate::Error) -> Self {
        if error.is_rejection() { Self::Rejected } else { Self::Error }
    }
}

/// Emits the event for one operation on one collection.
pub(crate) fn record(cache_name: &'static str, operation: &Operation, collection: &str, activity: CacheActivity) {
    let op = operation.as_str();
    let ev = activity.as_str();

    // Tracing levels must be constant, so a macro expands one call per level.
    macro_rules! emit_event {
        ($level:ident) => {
            tracing::$level!(
                cache.name = cache_name,
                cache.operation = op,
                cache.collection = collection,
                cache.activity = ev,
                "cache.event"
            )
        };
    }

    match activity.severity() {
        Severity::Debug => emit_event!(debug),
        Severity::Info => emit_event!(info),
        Severity::Warn => emit_event!(warn),
        Severity::Error => emit_event!(error),
    }
}
