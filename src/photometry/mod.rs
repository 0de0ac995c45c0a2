//! # Photometry correction and anomaly checks
//!
//! * [`Extinction`] – the external dust-extinction collaborator,
//!   `extinction(ra, dec, cone_radius) -> band → A_band`.
//! * [`PhotometryCorrector`] – subtracts the collaborator's values from an entry's
//!   magnitudes before matching.
//! * [`anomaly`] – AGN and white-dwarf predicates.
//!
//! Missing extinction values are **not** fatal: the affected bands keep their
//! uncorrected magnitudes and the outcome carries a
//! [`PhotClassError::NoExtinctionData`] note for display.
pub mod anomaly;

use std::collections::HashMap;

use itertools::Itertools;
use tracing::{debug, warn};

use crate::{
    catalog::CatalogEntry,
    constants::{ArcMin, BandKey, Degree, Magnitude},
    photclass_errors::PhotClassError,
};

/// Dust-extinction collaborator.
pub trait Extinction: Send + Sync {
    /// Extinction per band (magnitudes) toward `(ra, dec)`, averaged over a cone of
    /// `cone_radius` arcminutes.
    fn extinction(
        &self,
        ra: Degree,
        dec: Degree,
        cone_radius: ArcMin,
    ) -> Result<HashMap<BandKey, Magnitude>, PhotClassError>;
}

/// Extinction collaborator returning the same values everywhere.
#[derive(Debug, Clone, Default)]
pub struct UniformExtinction {
    values: HashMap<BandKey, Magnitude>,
}

impl UniformExtinction {
    pub fn new(values: HashMap<BandKey, Magnitude>) -> Self {
        UniformExtinction { values }
    }
}

impl Extinction for UniformExtinction {
    fn extinction(
        &self,
        _ra: Degree,
        _dec: Degree,
        _cone_radius: ArcMin,
    ) -> Result<HashMap<BandKey, Magnitude>, PhotClassError> {
        Ok(self.values.clone())
    }
}

/// Bands corrected and bands left untouched by one correction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtinctionOutcome {
    pub corrected: Vec<BandKey>,
    pub missing: Vec<BandKey>,
}

impl ExtinctionOutcome {
    /// The informational error describing the uncorrected bands, if any.
    pub fn no_data(&self) -> Option<PhotClassError> {
        if self.missing.is_empty() {
            None
        } else {
            Some(PhotClassError::NoExtinctionData(self.missing.iter().join(", ")))
        }
    }
}

/// Applies [`Extinction`] values to catalog entries.
pub struct PhotometryCorrector<'a> {
    extinction: &'a dyn Extinction,
    cone_radius: ArcMin,
}

impl<'a> PhotometryCorrector<'a> {
    pub fn new(extinction: &'a dyn Extinction, cone_radius: ArcMin) -> Self {
        PhotometryCorrector {
            extinction,
            cone_radius,
        }
    }

    /// Correct `entry`'s magnitudes in place.
    ///
    /// The extinction is queried at the entry position. A collaborator failure leaves
    /// every band uncorrected; it is logged and reported through the outcome.
    pub fn correct(&self, entry: &mut CatalogEntry) -> ExtinctionOutcome {
        let values = match self
            .extinction
            .extinction(entry.ra, entry.dec, self.cone_radius)
        {
            Ok(values) => values,
            Err(err) => {
                warn!(catalog = %entry.catalog_name, source = %entry.source_id, %err,
                    "extinction lookup failed, using uncorrected photometry");
                HashMap::new()
            }
        };

        let missing = entry.apply_extinction(&values);
        let corrected = entry
            .magnitudes()
            .keys()
            .filter(|band| !missing.contains(band))
            .cloned()
            .collect();

        let outcome = ExtinctionOutcome { corrected, missing };
        if let Some(note) = outcome.no_data() {
            debug!(catalog = %entry.catalog_name, source = %entry.source_id, %note);
        }
        outcome
    }
}
