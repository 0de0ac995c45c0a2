//! # Entry sources
//!
//! The [`EntrySource`] trait is the seam between the classification engine and the
//! transport that queries external catalogs. Implementations perform the cone query,
//! parse the catalog's response, and return [`CatalogEntry`] values whose
//! `target_distance` is already computed against the query point.
//!
//! [`InMemoryEntrySource`] answers cone queries from a fixed set of entries. It is
//! used for offline runs and throughout the test-suite.
use ahash::RandomState;
use std::collections::HashMap;

use crate::{
    constants::{ArcSec, CatalogName, Degree},
    photclass_errors::PhotClassError,
};

use super::CatalogEntry;

/// Query collaborator returning candidate entries around a position.
///
/// Implementations must be shareable with the batch worker thread.
pub trait EntrySource: Send + Sync {
    /// Return every entry of `catalog` within `radius` arcseconds of `(ra, dec)`.
    ///
    /// Arguments
    /// -----------------
    /// * `catalog`: name of the catalog to query.
    /// * `ra`, `dec`: query point in degrees.
    /// * `radius`: search radius in arcseconds.
    ///
    /// Return
    /// ----------
    /// * `Ok(entries)` – possibly empty; each entry's `target_distance <= radius`.
    /// * `Err(PhotClassError::EntrySource)` – transport or parsing failure.
    fn query_by_coords(
        &self,
        catalog: &str,
        ra: Degree,
        dec: Degree,
        radius: ArcSec,
    ) -> Result<Vec<CatalogEntry>, PhotClassError>;
}

impl<T: EntrySource + ?Sized> EntrySource for std::sync::Arc<T> {
    fn query_by_coords(
        &self,
        catalog: &str,
        ra: Degree,
        dec: Degree,
        radius: ArcSec,
    ) -> Result<Vec<CatalogEntry>, PhotClassError> {
        (**self).query_by_coords(catalog, ra, dec, radius)
    }
}

/// Entry source backed by fixed per-catalog entry lists.
#[derive(Debug, Clone, Default)]
pub struct InMemoryEntrySource {
    catalogs: HashMap<CatalogName, Vec<CatalogEntry>, RandomState>,
}

impl InMemoryEntrySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entry; its catalog is taken from `entry.catalog_name`.
    pub fn insert(&mut self, entry: CatalogEntry) {
        self.catalogs
            .entry(entry.catalog_name.clone())
            .or_default()
            .push(entry);
    }

    pub fn with_entry(mut self, entry: CatalogEntry) -> Self {
        self.insert(entry);
        self
    }

    pub fn catalog_names(&self) -> impl Iterator<Item = &CatalogName> {
        self.catalogs.keys()
    }
}

impl EntrySource for InMemoryEntrySource {
    fn query_by_coords(
        &self,
        catalog: &str,
        ra: Degree,
        dec: Degree,
        radius: ArcSec,
    ) -> Result<Vec<CatalogEntry>, PhotClassError> {
        let Some(entries) = self.catalogs.get(catalog) else {
            return Ok(Vec::new());
        };

        Ok(entries
            .iter()
            .map(|e| e.clone().with_target(ra, dec))
            .filter(|e| e.target_distance <= radius)
            .collect())
    }
}
