// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Index-assisted search.

use std::sync::Arc;

use hookmap_storage::{Record, Storage};

use crate::cache::record_from;
use crate::error::Result;
use crate::index::{IndexCatalog, SecondaryIndex, stub_key};
use crate::query::Query;

/// Records found by a search and whether an index served it.
#[derive(Debug)]
pub(crate) struct Found {
    pub records: Vec<Record>,
    pub indexed: bool,
}

/// Scores how useful an index with `fields` is for `query`.
///
/// The score is the share of query fields the index covers. It drops to zero unless the index
/// covers a single field or shares a field other than the primary key with the query.
#[expect(clippy::cast_precision_loss, reason = "field counts are far below 2^52")]
pub(crate) fn score(fields: &[String], query: &Query, primary_key: &str) -> f64 {
    let shared: Vec<&str> = query.fields().filter(|field| fields.iter().any(|f| f.as_str() == *field)).collect();
    let useful = fields.len() == 1 || shared.iter().any(|field| *field != primary_key);
    if !useful {
        return 0.0;
    }

    shared.len() as f64 / query.len().max(1) as f64
}

pub(crate) fn search(
    storage: &dyn Storage,
    catalog: &dyn IndexCatalog,
    primary_key: &str,
    collection: &str,
    query: &Query,
) -> Result<Found> {
    let hits: Vec<Arc<dyn SecondaryIndex>> = catalog
        .indexes(collection)
        .into_iter()
        .filter(|index| score(index.fields(), query, primary_key) > 0.0)
        .collect();

    if hits.is_empty() {
        tracing::warn!(
            cache.collection = collection,
            query.fields = ?query.fields().collect::<Vec<_>>(),
            "complete index miss"
        );
        return scan(storage, collection, query).map(|records| Found { records, indexed: false });
    }

    let combination = catalog.combine(storage, collection, &hits, query, primary_key)?;
    let residual = query.without(&combination.satisfied);

    tracing::trace!(
        cache.collection = collection,
        search.indexes = hits.len(),
        search.candidates = combination.candidates.len(),
        search.residual = residual.len(),
        "search.combined"
    );

    let mut records = Vec::new();
    for stub in &combination.candidates {
        let Some(key) = stub_key(stub, primary_key) else {
            continue;
        };
        let Some(value) = storage.get(collection, &key)? else {
            continue;
        };

        let record = record_from(value, collection, &key)?;
        if residual.matches(&record) {
            records.push(record);
        }
    }

    Ok(Found { records, indexed: true })
}

/// Matches every record of `collection` against `query`.
fn scan(storage: &dyn Storage, collection: &str, query: &Query) -> Result<Vec<Record>> {
    let mut records = Vec::new();
    for key in storage.keys(collection)? {
        let Some(value) = storage.get(collection, &key)? else {
            continue;
        };

        let record = record_from(value, collection, &key)?;
        if query.matches(&record) {
            records.push(record);
        }
    }
    Ok(records)
}
