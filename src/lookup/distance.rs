//! # Photometric distance estimation
//!
//! Estimate the distance of a source of known spectral type from its apparent
//! magnitudes and the reference absolute magnitudes of a [`LookupTable`].
//!
//! For each band `b` with an observed magnitude `m` and a reference `M_b` in the row of
//! the requested spectral type, the distance modulus gives
//!
//! ```text
//! d = 10^((m − M + 5) / 5)   [pc]
//! ```
//!
//! When the table also provides the scatter `e_M_b`, it is propagated linearly:
//! `σ_d = d · ln(10) / 5 · σ_M`. Otherwise the error is `None`.
//!
//! Bands without a reference value are skipped. An unknown spectral type gives an
//! empty result, not an error.
use std::{collections::BTreeMap, fmt};

use crate::{
    constants::{BandKey, Magnitude, Parsec},
    conversion::{distance_error, distance_from_modulus},
};

use super::LookupTable;

/// Prefix of the absolute-magnitude columns.
const ABS_MAG_PREFIX: &str = "M_";
/// Prefix of the absolute-magnitude uncertainty columns.
const ABS_MAG_ERR_PREFIX: &str = "e_M_";

/// Distance estimated from one band.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceLookupResult {
    pub spt: String,
    pub band: BandKey,
    pub apparent: Magnitude,
    pub absolute: Magnitude,
    pub distance: Parsec,
    pub distance_error: Option<Parsec>,
}

impl fmt::Display for DistanceLookupResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} = {:.3}, M_{} = {:.3} → {:.2} pc",
            self.spt, self.band, self.apparent, self.band, self.absolute, self.distance
        )?;
        if let Some(err) = self.distance_error {
            write!(f, " ± {err:.2}")?;
        }
        Ok(())
    }
}

/// Distance-modulus estimator over one reference table.
#[derive(Debug, Clone, Copy)]
pub struct DistanceEstimator<'t> {
    table: &'t LookupTable,
}

impl<'t> DistanceEstimator<'t> {
    pub fn new(table: &'t LookupTable) -> Self {
        DistanceEstimator { table }
    }

    /// Estimate the distance from every band with a reference absolute magnitude.
    ///
    /// Arguments
    /// -----------------
    /// * `spt`: spectral type label, as written in the table.
    /// * `band_magnitudes`: observed apparent magnitudes keyed by band.
    ///
    /// Return
    /// ----------
    /// * One [`DistanceLookupResult`] per covered band, in table column order.
    pub fn lookup(
        &self,
        spt: &str,
        band_magnitudes: &BTreeMap<BandKey, Magnitude>,
    ) -> Vec<DistanceLookupResult> {
        let Some(row) = self.table.find(spt) else {
            return Vec::new();
        };

        self.table
            .columns()
            .iter()
            .filter_map(|column| column.strip_prefix(ABS_MAG_PREFIX))
            .filter_map(|band| {
                let apparent = *band_magnitudes.get(band)?;
                let absolute = row.value(&format!("{ABS_MAG_PREFIX}{band}"))?;
                if !apparent.is_finite() {
                    return None;
                }
                let distance = distance_from_modulus(apparent, absolute);
                let distance_error = row
                    .value(&format!("{ABS_MAG_ERR_PREFIX}{band}"))
                    .map(|sigma| distance_error(distance, sigma));

                Some(DistanceLookupResult {
                    spt: row.spt.clone(),
                    band: band.to_string(),
                    apparent,
                    absolute,
                    distance,
                    distance_error,
                })
            })
            .collect()
    }
}
