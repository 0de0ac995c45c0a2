#![allow(dead_code)]

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Once,
};

use photclass::{
    catalog::{entry_source::InMemoryEntrySource, CatalogEntry},
    constants::{ArcSec, Degree},
    EntrySource, PhotClassError,
};

static TRACING: Once = Once::new();

/// Install a test subscriber honouring `RUST_LOG`, once per test binary.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Entry at `sep` arcseconds north of `(ra, dec)`.
pub fn entry_north_of(
    catalog: &str,
    id: &str,
    ra: Degree,
    dec: Degree,
    sep: ArcSec,
) -> CatalogEntry {
    CatalogEntry::new(catalog, id, ra, dec + sep / 3600.0)
}

pub fn row(fields: &[&str]) -> Vec<String> {
    fields.iter().map(|f| f.to_string()).collect()
}

/// Entry source counting its queries, optionally failing on one catalog.
pub struct CountingSource {
    pub inner: InMemoryEntrySource,
    pub calls: AtomicUsize,
    pub failing_catalog: Option<String>,
}

impl CountingSource {
    pub fn new(inner: InMemoryEntrySource) -> Self {
        CountingSource {
            inner,
            calls: AtomicUsize::new(0),
            failing_catalog: None,
        }
    }

    pub fn failing_on(mut self, catalog: &str) -> Self {
        self.failing_catalog = Some(catalog.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl EntrySource for CountingSource {
    fn query_by_coords(
        &self,
        catalog: &str,
        ra: Degree,
        dec: Degree,
        radius: ArcSec,
    ) -> Result<Vec<CatalogEntry>, PhotClassError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_catalog.as_deref() == Some(catalog) {
            return Err(PhotClassError::EntrySource {
                catalog: catalog.to_string(),
                message: "service unavailable".into(),
            });
        }
        self.inner.query_by_coords(catalog, ra, dec, radius)
    }
}
