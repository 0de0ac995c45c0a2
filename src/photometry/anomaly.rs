//! Photometric anomaly predicates.
//!
//! Two signatures are flagged during classification:
//!
//! * **AGN candidates**, from the WISE color-color diagram (W1−W2 vs W2−W3).
//!   The default box follows Mateos et al. (2012): `W1−W2 ≥ 0.315·(W2−W3) − 0.222`
//!   and `W1−W2 ≥ −3.172·(W2−W3) + 7.624`, restricted to `W1−W2 ≥ 0.5`.
//! * **White-dwarf candidates**, from the Gaia color-magnitude diagram (absolute G vs
//!   BP−RP): sources well below the main sequence, `M_G ≥ 2.6·(BP−RP) + 9.0`, bluer
//!   than `BP−RP = 1.5`.
//!
//! Callers wanting other thresholds implement [`AnomalyDetector`].
use crate::constants::Magnitude;

/// Boolean predicates flagging non-stellar photometric signatures.
pub trait AnomalyDetector: Send + Sync {
    fn is_possible_agn(&self, w1_w2: f64, w2_w3: f64) -> bool;

    fn is_possible_wd(&self, abs_g: Magnitude, bp_rp: f64) -> bool;
}

/// Default thresholds.
#[derive(Debug, Clone, Copy, Default)]
pub struct PhotometricAnomalies;

impl AnomalyDetector for PhotometricAnomalies {
    fn is_possible_agn(&self, w1_w2: f64, w2_w3: f64) -> bool {
        w1_w2 >= 0.5 && w1_w2 >= 0.315 * w2_w3 - 0.222 && w1_w2 >= -3.172 * w2_w3 + 7.624
    }

    fn is_possible_wd(&self, abs_g: Magnitude, bp_rp: f64) -> bool {
        bp_rp < 1.5 && abs_g >= 2.6 * bp_rp + 9.0
    }
}

#[cfg(test)]
mod anomaly_test {
    use super::*;

    #[test]
    fn test_agn_box() {
        let det = PhotometricAnomalies;
        assert!(det.is_possible_agn(1.0, 3.0));
        assert!(det.is_possible_agn(0.8, 2.5));
        // stellar locus
        assert!(!det.is_possible_agn(0.0, 0.1));
        // red W2-W3 but W1-W2 too blue
        assert!(!det.is_possible_agn(0.3, 3.5));
        // W1-W2 red enough but W2-W3 too blue (T dwarf territory)
        assert!(!det.is_possible_agn(1.7, 1.4));
    }

    #[test]
    fn test_wd_region() {
        let det = PhotometricAnomalies;
        assert!(det.is_possible_wd(12.0, 0.2));
        assert!(det.is_possible_wd(14.5, 0.9));
        // main sequence G dwarf
        assert!(!det.is_possible_wd(4.5, 0.82));
        // M dwarf, red
        assert!(!det.is_possible_wd(13.2, 3.2));
    }
}
