// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Secondary indexes consulted by search.
//!
//! A [`SecondaryIndex`] answers a sub-query restricted to the fields it covers with candidate
//! stubs: partial records holding the primary key and the indexed fields. An
//! [`IndexCatalog`] lists the indexes of a collection and merges the stubs of several indexes
//! into one candidate set.
//!
//! [`FieldIndex`] and [`IndexRegistry`] are the implementations shipped with this crate. A
//! field index keeps its entries in the cache's own storage backend and is maintained by hooks
//! on the cache's pipelines.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Debug;
use std::sync::Arc;

use hookmap_storage::{Record, Storage, Value};

use crate::error::Result;
use crate::query::Query;

mod field;
mod registry;

#[doc(inline)]
pub use field::FieldIndex;
#[doc(inline)]
pub use registry::IndexRegistry;

/// An index over a fixed set of fields.
pub trait SecondaryIndex: Send + Sync + Debug {
    /// Returns the covered field names, sorted and without duplicates.
    fn fields(&self) -> &[String];

    /// Returns candidate stubs for `subquery`, which only constrains covered fields.
    ///
    /// Every stub holds `primary_key` and the covered fields of one record that satisfies
    /// `subquery`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    fn lookup(&self, storage: &dyn Storage, collection: &str, subquery: &Query, primary_key: &str) -> Result<Vec<Record>>;
}

/// Candidate stubs produced from one or more indexes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Combination {
    /// Stubs of the records that satisfy every indexed condition.
    pub candidates: Vec<Record>,
    /// Query fields the candidates are known to satisfy.
    pub satisfied: BTreeSet<String>,
}

/// The set of indexes available to search.
pub trait IndexCatalog: Send + Sync + Debug {
    /// Returns the indexes usable for `collection`, most specific first.
    fn indexes(&self, collection: &str) -> Vec<Arc<dyn SecondaryIndex>>;

    /// Merges the stubs of the `hits` indexes for `query`.
    ///
    /// The default keeps the stubs whose primary key every index returned, merging their
    /// fields, and reports every query field covered by a hit index as satisfied. Candidates
    /// come back sorted by primary key.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by an index lookup.
    fn combine(
        &self,
        storage: &dyn Storage,
        collection: &str,
        hits: &[Arc<dyn SecondaryIndex>],
        query: &Query,
        primary_key: &str,
    ) -> Result<Combination> {
        let mut satisfied = BTreeSet::new();
        let mut combined: Option<BTreeMap<String, Record>> = None;

        for index in hits {
            let subquery = query.restrict(index.fields());
            satisfied.extend(subquery.fields().map(str::to_owned));

            let stubs: BTreeMap<String, Record> = index
                .lookup(storage, collection, &subquery, primary_key)?
                .into_iter()
                .filter_map(|stub| stub_key(&stub, primary_key).map(|key| (key, stub)))
                .collect();

            combined = Some(match combined {
                None => stubs,
                Some(mut merged) => {
                    merged.retain(|key, _| stubs.contains_key(key));
                    for (key, stub) in stubs {
                        if let Some(existing) = merged.get_mut(&key) {
                            existing.extend(stub);
                        }
                    }
                    merged
                }
            });
        }

        Ok(Combination {
            candidates: combined.unwrap_or_default().into_values().collect(),
            satisfied,
        })
    }
}

/// Returns the primary key of a stub, if it is a string.
pub(crate) fn stub_key(stub: &Record, primary_key: &str) -> Option<String> {
    stub.get(primary_key).and_then(Value::as_str).map(str::to_owned)
}
