//! # Spectral-type matching
//!
//! Match observed color indices against a [`LookupTable`] and report, for each
//! color, the **nearest reference row** and its offset.
//!
//! ## Algorithm
//! -----------------
//! For each input color covered by at least one table row:
//!
//! 1. scan every row that defines this color,
//! 2. compute `gap = |observed − reference|`,
//! 3. keep the row with the smallest gap; on equal gaps the first row in table
//!    order wins, so an exact match (gap 0) always beats any other row.
//!
//! One [`MatchResult`] is emitted per covered color, in the input order. Colors the
//! table does not cover, and non-finite observed values, produce nothing. An empty
//! input yields an empty output, which callers treat as "no colors available".
//!
//! ## Example
//! -----------------
//! ```rust
//! use photclass::catalog::colors::ColorValue;
//! use photclass::lookup::{LookupTableKind, spectral_type::SpectralTypeMatcher};
//!
//! let table = LookupTableKind::MltDwarfs.load().unwrap();
//! let matcher = SpectralTypeMatcher::new(&table);
//! let results = matcher.lookup(&[ColorValue::new("W1-W2", 0.21)]);
//! assert_eq!(results[0].spt, "M5");
//! assert_eq!(results[0].gap, 0.0);
//! ```
use std::fmt;

use crate::{catalog::colors::ColorValue, constants::ColorKey};

use super::LookupTable;

/// Nearest reference row for one observed color.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    pub color_key: ColorKey,
    pub observed: f64,
    pub reference: f64,
    /// `|observed − reference|`, always `>= 0`.
    pub gap: f64,
    /// Spectral type of the nearest row.
    pub spt: String,
    /// Name of the table the row belongs to.
    pub table: String,
}

impl fmt::Display for MatchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}={:.3}, ref={:.3}, gap={:.3})",
            self.spt, self.color_key, self.observed, self.reference, self.gap
        )
    }
}

/// Nearest-color matcher over one reference table.
#[derive(Debug, Clone, Copy)]
pub struct SpectralTypeMatcher<'t> {
    table: &'t LookupTable,
}

impl<'t> SpectralTypeMatcher<'t> {
    pub fn new(table: &'t LookupTable) -> Self {
        SpectralTypeMatcher { table }
    }

    pub fn table(&self) -> &'t LookupTable {
        self.table
    }

    /// Nearest row for a single color, or `None` if the table does not cover it.
    pub fn nearest(&self, key: &str, observed: f64) -> Option<MatchResult> {
        if !observed.is_finite() {
            return None;
        }

        let mut best: Option<(f64, f64, &str)> = None;
        for entry in self.table.entries() {
            let Some(reference) = entry.value(key) else {
                continue;
            };
            let gap = (observed - reference).abs();
            match best {
                Some((best_gap, _, _)) if gap >= best_gap => {}
                _ => best = Some((gap, reference, entry.spt.as_str())),
            }
        }

        best.map(|(gap, reference, spt)| MatchResult {
            color_key: key.to_string(),
            observed,
            reference,
            gap,
            spt: spt.to_string(),
            table: self.table.name().to_string(),
        })
    }

    /// Match every color of `colors` against the table.
    ///
    /// Arguments
    /// -----------------
    /// * `colors`: observed colors, in the order results should be reported.
    ///
    /// Return
    /// ----------
    /// * One [`MatchResult`] per color the table covers; never more results than input colors.
    pub fn lookup<'c>(&self, colors: impl IntoIterator<Item = &'c ColorValue>) -> Vec<MatchResult> {
        colors
            .into_iter()
            .filter_map(|c| self.nearest(&c.key, c.value))
            .collect()
    }
}

#[cfg(test)]
mod spectral_type_test {
    use super::*;
    use crate::lookup::{LookupEntry, LookupTable};

    fn table() -> LookupTable {
        LookupTable::from_entries(
            "test",
            vec!["W1-W2".into(), "J-K".into()],
            vec![
                LookupEntry::new("M0").with_value("W1-W2", 0.0).with_value("J-K", 0.5),
                LookupEntry::new("M5").with_value("W1-W2", 0.2),
                LookupEntry::new("M6").with_value("W1-W2", 0.2),
                LookupEntry::new("L2").with_value("W1-W2", 0.3).with_value("J-K", 1.5),
            ],
        )
    }

    #[test]
    fn test_exact_match_first_row_wins() {
        let t = table();
        let matcher = SpectralTypeMatcher::new(&t);
        let res = matcher.lookup(&[ColorValue::new("W1-W2", 0.2)]);
        assert_eq!(res.len(), 1);
        assert_eq!(res[0].gap, 0.0);
        assert_eq!(res[0].spt, "M5");
        assert_eq!(res[0].reference, 0.2);
        assert_eq!(res[0].table, "test");
    }

    #[test]
    fn test_nearest_row_and_gap() {
        let t = table();
        let matcher = SpectralTypeMatcher::new(&t);
        let res = matcher.nearest("J-K", 1.25).unwrap();
        assert_eq!(res.spt, "L2");
        assert_eq!(res.gap, 0.25);

        // equidistant between M0 (0.5) and L2 (1.5): first row in table order
        let res = matcher.nearest("J-K", 1.0).unwrap();
        assert_eq!(res.spt, "M0");
        assert_eq!(res.gap, 0.5);
    }

    #[test]
    fn test_uncovered_and_empty_colors() {
        let t = table();
        let matcher = SpectralTypeMatcher::new(&t);
        assert!(matcher.lookup(&Vec::<ColorValue>::new()).is_empty());

        let colors = vec![
            ColorValue::new("B-V", 1.2),
            ColorValue::new("J-K", 0.6),
            ColorValue::new("W1-W2", f64::NAN),
            ColorValue::new("W1-W2", 0.31),
        ];
        let res = matcher.lookup(&colors);
        assert!(res.len() <= colors.len());
        let keys: Vec<&str> = res.iter().map(|r| r.color_key.as_str()).collect();
        assert_eq!(keys, vec!["J-K", "W1-W2"]);
        assert_eq!(res[1].spt, "L2");
    }

    #[test]
    fn test_bundled_main_sequence() {
        let matcher = SpectralTypeMatcher::new(&crate::unit_test_global::MAIN_SEQUENCE);
        let res = matcher.lookup(&[ColorValue::new("B-V", 0.0), ColorValue::new("BP-RP", 0.79)]);
        assert_eq!(res[0].spt, "A0V");
        assert_eq!(res[0].gap, 0.0);
        assert_eq!(res[1].spt, "G0V");
        assert_eq!(res[1].table, "main-sequence");
    }
}
