//! # Catalog entries
//!
//! This module defines [`CatalogEntry`], the record of **one object from one catalog**
//! returned by an [`EntrySource`](crate::catalog::entry_source::EntrySource) for a cone
//! query, and the [`Capabilities`] set that tells the classification stages which
//! catalog-specific checks apply to it.
//!
//! ## Overview
//! -----------------
//! A catalog entry carries:
//!
//! * identification (`catalog_name`, `source_id`),
//! * astrometry (`ra`, `dec`, optional parallax and proper motion),
//! * photometry (an ordered band → magnitude map),
//! * the query point it was returned for (`target_ra`, `target_dec`) and its
//!   angular separation from it (`target_distance`, arcseconds),
//! * optional [`EntryExtension`] fields some catalogs provide directly
//!   (object type, spectral type string, WISE colors, absolute G, BP−RP).
//!
//! Catalog-specific behavior is expressed through [`Capabilities`] instead of distinct
//! entry types: an AllWISE entry exposes `has_agn_colors`, a Gaia entry with parallax
//! exposes `has_wd_colors`, a SIMBAD entry exposes `has_simbad_type`.
//!
//! ## Invariants
//! -----------------
//! * `target_distance >= 0`, computed on construction from the target position.
//! * Entries are immutable except through [`CatalogEntry::apply_extinction`], which
//!   replaces magnitude values in place.
//!
//! ## See also
//! ------------
//! * [`colors`] – Color index derivation from the band magnitudes.
//! * [`entry_source`] – The query collaborator producing entries.
//! * [`crate::crossmatch::select_best`] – Counterpart selection among entries.
pub mod colors;
pub mod entry_source;

use std::collections::{BTreeMap, HashMap};

use crate::{
    constants::{ArcSec, BandKey, CatalogName, Degree, Magnitude, SourceId},
    conversion::{absolute_magnitude, angular_separation},
};

use colors::ColorValue;

/// Catalog-specific fields, present only for catalogs that publish them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryExtension {
    /// Object type string (SIMBAD `otype`).
    pub object_type: Option<String>,
    /// Spectral type string published by the catalog (SIMBAD `sp_type`).
    pub spectral_type: Option<String>,
    /// W1−W2 color as published by the catalog.
    pub w1_w2: Option<f64>,
    /// W2−W3 color as published by the catalog.
    pub w2_w3: Option<f64>,
    /// Absolute Gaia G magnitude.
    pub abs_g: Option<Magnitude>,
    /// Gaia BP−RP color as published by the catalog.
    pub bp_rp: Option<f64>,
}

/// Which catalog-specific checks apply to an entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    /// W1−W2 and W2−W3 are both available: the AGN check applies.
    pub has_agn_colors: bool,
    /// Absolute G and BP−RP are both available: the white-dwarf check applies.
    pub has_wd_colors: bool,
    /// An object type or spectral type string was published.
    pub has_simbad_type: bool,
}

/// One object's record from one catalog, as returned for a cone query.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    pub catalog_name: CatalogName,
    pub source_id: SourceId,
    pub ra: Degree,
    pub dec: Degree,
    /// Parallax in milliarcseconds.
    pub plx: Option<f64>,
    /// Proper motion in RA (mas/yr, includes cos δ).
    pub pmra: Option<f64>,
    /// Proper motion in Dec (mas/yr).
    pub pmdec: Option<f64>,
    magnitudes: BTreeMap<BandKey, Magnitude>,
    pub target_ra: Degree,
    pub target_dec: Degree,
    /// Angular separation from the query point (arcseconds).
    pub target_distance: ArcSec,
    pub extension: EntryExtension,
}

impl CatalogEntry {
    /// Create an entry located at `(ra, dec)`, with the query point set to the entry
    /// position (zero target distance). Use [`CatalogEntry::with_target`] to attach the
    /// actual query point.
    pub fn new(
        catalog_name: impl Into<CatalogName>,
        source_id: impl Into<SourceId>,
        ra: Degree,
        dec: Degree,
    ) -> Self {
        CatalogEntry {
            catalog_name: catalog_name.into(),
            source_id: source_id.into(),
            ra,
            dec,
            plx: None,
            pmra: None,
            pmdec: None,
            magnitudes: BTreeMap::new(),
            target_ra: ra,
            target_dec: dec,
            target_distance: 0.0,
            extension: EntryExtension::default(),
        }
    }

    /// Attach the query point and compute the target distance from it.
    pub fn with_target(mut self, target_ra: Degree, target_dec: Degree) -> Self {
        self.target_ra = target_ra;
        self.target_dec = target_dec;
        self.target_distance = angular_separation(target_ra, target_dec, self.ra, self.dec);
        self
    }

    pub fn with_magnitude(mut self, band: impl Into<BandKey>, magnitude: Magnitude) -> Self {
        self.magnitudes.insert(band.into(), magnitude);
        self
    }

    pub fn with_parallax(mut self, plx: f64) -> Self {
        self.plx = Some(plx);
        self
    }

    pub fn with_proper_motion(mut self, pmra: f64, pmdec: f64) -> Self {
        self.pmra = Some(pmra);
        self.pmdec = Some(pmdec);
        self
    }

    pub fn with_extension(mut self, extension: EntryExtension) -> Self {
        self.extension = extension;
        self
    }

    /// Magnitude in `band`, if the catalog measured it.
    pub fn magnitude(&self, band: &str) -> Option<Magnitude> {
        self.magnitudes.get(band).copied()
    }

    /// All band magnitudes, ordered by band name.
    pub fn magnitudes(&self) -> &BTreeMap<BandKey, Magnitude> {
        &self.magnitudes
    }

    /// Color indices derivable from this entry, in the fixed definition order.
    pub fn colors(&self) -> Vec<ColorValue> {
        colors::derive_colors(self)
    }

    /// W1−W2: from the W1/W2 magnitudes, else from the published value.
    pub fn w1_w2(&self) -> Option<f64> {
        colors::band_difference(self, "W1", "W2").or(self.extension.w1_w2)
    }

    /// W2−W3: from the W2/W3 magnitudes, else from the published value.
    pub fn w2_w3(&self) -> Option<f64> {
        colors::band_difference(self, "W2", "W3").or(self.extension.w2_w3)
    }

    /// BP−RP: from the BP/RP magnitudes, else from the published value.
    pub fn bp_rp(&self) -> Option<f64> {
        colors::band_difference(self, "BP", "RP").or(self.extension.bp_rp)
    }

    /// Absolute G: the published value, else derived from G and the parallax.
    pub fn abs_g(&self) -> Option<Magnitude> {
        self.extension.abs_g.or_else(|| {
            let g = self.magnitude("G")?;
            absolute_magnitude(g, self.plx?)
        })
    }

    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            has_agn_colors: self.w1_w2().is_some() && self.w2_w3().is_some(),
            has_wd_colors: self.abs_g().is_some() && self.bp_rp().is_some(),
            has_simbad_type: self.extension.object_type.is_some()
                || self.extension.spectral_type.is_some(),
        }
    }

    /// Subtract per-band extinction values from the magnitudes.
    ///
    /// Only bands present both in the entry and in `extinction` are corrected.
    ///
    /// Return
    /// ----------
    /// * The bands of this entry for which no extinction value was supplied, in band order.
    pub fn apply_extinction(&mut self, extinction: &HashMap<BandKey, Magnitude>) -> Vec<BandKey> {
        let mut missing = Vec::new();
        for (band, mag) in self.magnitudes.iter_mut() {
            match extinction.get(band) {
                Some(a) => *mag -= a,
                None => missing.push(band.clone()),
            }
        }
        missing
    }
}

#[cfg(test)]
mod catalog_entry_test {
    use super::*;
    use approx::assert_relative_eq;

    fn wise_entry() -> CatalogEntry {
        CatalogEntry::new("AllWISE", "J004244.3+411609", 10.6846, 41.2692)
            .with_target(10.684, 41.269)
            .with_magnitude("W1", 12.1)
            .with_magnitude("W2", 11.4)
            .with_magnitude("W3", 8.2)
    }

    #[test]
    fn test_target_distance_from_query_point() {
        let entry = wise_entry();
        assert!(entry.target_distance > 0.0);
        assert!(entry.target_distance < 5.0);

        let same = CatalogEntry::new("Gaia", "1", 10.0, 10.0);
        assert_eq!(same.target_distance, 0.0);
    }

    #[test]
    fn test_capabilities() {
        let caps = wise_entry().capabilities();
        assert!(caps.has_agn_colors);
        assert!(!caps.has_wd_colors);
        assert!(!caps.has_simbad_type);

        let gaia = CatalogEntry::new("Gaia", "42", 1.0, 1.0)
            .with_magnitude("G", 15.0)
            .with_magnitude("BP", 15.1)
            .with_magnitude("RP", 14.9)
            .with_parallax(10.0);
        let caps = gaia.capabilities();
        assert!(caps.has_wd_colors);
        assert_relative_eq!(gaia.abs_g().unwrap(), 10.0, epsilon = 1e-12);

        let simbad = CatalogEntry::new("SIMBAD", "M31", 1.0, 1.0).with_extension(EntryExtension {
            object_type: Some("G".into()),
            ..Default::default()
        });
        assert!(simbad.capabilities().has_simbad_type);
    }

    #[test]
    fn test_published_colors_fallback() {
        let entry = CatalogEntry::new("AllWISE", "x", 1.0, 1.0).with_extension(EntryExtension {
            w1_w2: Some(0.9),
            w2_w3: Some(3.0),
            ..Default::default()
        });
        assert_eq!(entry.w1_w2(), Some(0.9));
        assert_eq!(entry.w2_w3(), Some(3.0));
        assert!(entry.capabilities().has_agn_colors);
    }

    #[test]
    fn test_apply_extinction() {
        let mut entry = wise_entry();
        let ext: HashMap<BandKey, Magnitude> =
            [("W1".to_string(), 0.1), ("W2".to_string(), 0.05)].into();
        let missing = entry.apply_extinction(&ext);
        assert_eq!(missing, vec!["W3".to_string()]);
        assert_relative_eq!(entry.magnitude("W1").unwrap(), 12.0, epsilon = 1e-12);
        assert_relative_eq!(entry.magnitude("W2").unwrap(), 11.35, epsilon = 1e-12);
        assert_relative_eq!(entry.magnitude("W3").unwrap(), 8.2, epsilon = 1e-12);
    }
}
