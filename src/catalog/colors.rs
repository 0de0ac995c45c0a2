//! Color index derivation.
//!
//! A color is the difference of two band magnitudes. Colors are optional: when
//! one of the two bands is missing the color is absent, never defaulted to zero.
use std::fmt;

use crate::constants::ColorKey;

use super::CatalogEntry;

/// Recognized color indices as `(color key, blue band, red band)`, in output order.
pub const COLOR_DEFINITIONS: &[(&str, &str, &str)] = &[
    ("B-V", "B", "V"),
    ("BP-RP", "BP", "RP"),
    ("G-RP", "G", "RP"),
    ("J-H", "J", "H"),
    ("H-K", "H", "K"),
    ("J-K", "J", "K"),
    ("K-W1", "K", "W1"),
    ("W1-W2", "W1", "W2"),
    ("W2-W3", "W2", "W3"),
    ("W3-W4", "W3", "W4"),
];

/// A named color paired with its computed value.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorValue {
    pub key: ColorKey,
    pub value: f64,
}

impl ColorValue {
    pub fn new(key: impl Into<ColorKey>, value: f64) -> Self {
        ColorValue {
            key: key.into(),
            value,
        }
    }
}

impl fmt::Display for ColorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={:.3}", self.key, self.value)
    }
}

pub(crate) fn band_difference(entry: &CatalogEntry, blue: &str, red: &str) -> Option<f64> {
    Some(entry.magnitude(blue)? - entry.magnitude(red)?)
}

/// Published color used when the catalog does not provide both bands.
fn published_color(entry: &CatalogEntry, key: &str) -> Option<f64> {
    match key {
        "W1-W2" => entry.extension.w1_w2,
        "W2-W3" => entry.extension.w2_w3,
        "BP-RP" => entry.extension.bp_rp,
        _ => None,
    }
}

pub(crate) fn derive_colors(entry: &CatalogEntry) -> Vec<ColorValue> {
    COLOR_DEFINITIONS
        .iter()
        .filter_map(|(key, blue, red)| {
            band_difference(entry, blue, red)
                .or_else(|| published_color(entry, key))
                .filter(|v| v.is_finite())
                .map(|v| ColorValue::new(*key, v))
        })
        .collect()
}
