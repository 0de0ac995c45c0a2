//! Memoisation of the last interactive query.
//!
//! The cache holds the per-catalog resolutions of **one** query point. A lookup with a
//! different `(ra, dec, radius)` key evicts everything, so repeating a query (for
//! example after changing exclusions or toggling a catalog back on) does not hit the
//! entry source again, while moving the target always does.
use std::collections::HashMap;

use ahash::RandomState;
use ordered_float::OrderedFloat;
use tracing::debug;

use crate::constants::{ArcSec, CatalogName, Degree};

use super::CatalogResolution;

/// Hashable query point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QueryKey {
    ra: OrderedFloat<Degree>,
    dec: OrderedFloat<Degree>,
    radius: OrderedFloat<ArcSec>,
}

impl QueryKey {
    pub fn new(ra: Degree, dec: Degree, radius: ArcSec) -> Self {
        QueryKey {
            ra: OrderedFloat(ra),
            dec: OrderedFloat(dec),
            radius: OrderedFloat(radius),
        }
    }
}

/// Single-key cache of catalog resolutions.
///
/// `None` values are cached too: a catalog without counterpart is not queried again
/// for the same key.
#[derive(Debug, Clone, Default)]
pub struct QueryCache {
    key: Option<QueryKey>,
    resolutions: HashMap<CatalogName, Option<CatalogResolution>, RandomState>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Point the cache at `key`, evicting the stored resolutions if the key changed.
    pub fn select(&mut self, key: QueryKey) {
        if self.key != Some(key) {
            if self.key.is_some() {
                debug!(evicted = self.resolutions.len(), "query point changed, cache evicted");
            }
            self.resolutions.clear();
            self.key = Some(key);
        }
    }

    /// Stored resolution for `catalog` under the current key.
    ///
    /// The outer `Option` tells whether the catalog was cached at all.
    pub fn get(&self, catalog: &str) -> Option<&Option<CatalogResolution>> {
        self.resolutions.get(catalog)
    }

    pub fn insert(&mut self, catalog: impl Into<CatalogName>, resolution: Option<CatalogResolution>) {
        self.resolutions.insert(catalog.into(), resolution);
    }

    pub fn key(&self) -> Option<QueryKey> {
        self.key
    }

    pub fn len(&self) -> usize {
        self.resolutions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolutions.is_empty()
    }

    pub fn clear(&mut self) {
        self.key = None;
        self.resolutions.clear();
    }
}
