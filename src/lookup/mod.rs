//! # Reference lookup tables
//!
//! This module provides the **reference tables** used to turn observed colors and
//! magnitudes into a spectral type and a distance.
//!
//! ## Public API
//!
//! ### [`crate::lookup::LookupTableKind`]
//! Enumeration of the bundled tables:
//!
//! - `LookupTableKind::MainSequence` – dwarf (class V) stars from O9 to M9,
//! - `LookupTableKind::MltDwarfs` – M, L and T dwarfs, with absolute-magnitude scatter.
//!
//! A kind can be parsed from a string:
//!
//! ```rust
//! use photclass::lookup::LookupTableKind;
//! let kind: LookupTableKind = "mlt".parse().unwrap();
//! assert_eq!(kind, LookupTableKind::MltDwarfs);
//! ```
//!
//! ### [`crate::lookup::LookupTable`]
//!
//! An immutable set of [`LookupEntry`] rows keyed by spectral type. Each row holds an
//! optional value per recognised column:
//!
//! - color indices (`"BP-RP"`, `"W1-W2"`, …),
//! - absolute magnitudes `M_<band>` (`"M_G"`, `"M_J"`, …),
//! - 1-σ scatter on them, `e_M_<band>`.
//!
//! Tables are embedded in the binary and parsed on demand with
//! [`LookupTableKind::load`]; custom tables in the same CSV layout can be read with
//! [`LookupTable::from_csv_str`]. A loaded table is meant to be created once at
//! startup and shared (by reference or `Arc`) with the matchers.
//!
//! ```rust
//! use photclass::lookup::LookupTableKind;
//!
//! let table = LookupTableKind::MainSequence.load().unwrap();
//! let m5 = table.find("M5V").unwrap();
//! assert_eq!(m5.value("BP-RP"), Some(3.2));
//! ```
//!
//! ## See also
//!
//! * [`spectral_type::SpectralTypeMatcher`] – nearest-color matching over a table.
//! * [`distance::DistanceEstimator`] – distance from the `M_<band>` columns.
//! * [`taxonomy::taxonomy_ordinal`] – fixed ordering of spectral-type labels.
pub mod distance;
pub mod spectral_type;
pub mod taxonomy;

use std::{collections::HashMap, fmt, str::FromStr};

use ahash::RandomState;

use crate::photclass_errors::PhotClassError;

static MAIN_SEQUENCE_TABLE: &str = include_str!("data/main_sequence.csv");
static MLT_DWARFS_TABLE: &str = include_str!("data/mlt_dwarfs.csv");

/// Name of the first column of every table.
const SPT_COLUMN: &str = "SpT";

/// Bundled reference tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LookupTableKind {
    MainSequence,
    MltDwarfs,
}

impl LookupTableKind {
    pub fn name(&self) -> &'static str {
        match self {
            LookupTableKind::MainSequence => "main-sequence",
            LookupTableKind::MltDwarfs => "mlt-dwarfs",
        }
    }

    /// Parse the embedded table for this kind.
    ///
    /// # Returns
    ///
    /// * `Ok(LookupTable)` – the parsed table.
    /// * `Err(PhotClassError)` – if the embedded resource is malformed.
    ///
    /// # See also
    /// * [`LookupTable::from_csv_str`] – parser shared with custom tables.
    pub fn load(&self) -> Result<LookupTable, PhotClassError> {
        let data = match self {
            LookupTableKind::MainSequence => MAIN_SEQUENCE_TABLE,
            LookupTableKind::MltDwarfs => MLT_DWARFS_TABLE,
        };
        LookupTable::from_csv_str(self.name(), data)
    }
}

impl FromStr for LookupTableKind {
    type Err = PhotClassError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "main-sequence" | "main_sequence" | "ms" => Ok(LookupTableKind::MainSequence),
            "mlt-dwarfs" | "mlt_dwarfs" | "mlt" => Ok(LookupTableKind::MltDwarfs),
            _ => Err(PhotClassError::InvalidLookupTable(format!(
                "Unknown lookup table: {s}"
            ))),
        }
    }
}

impl fmt::Display for LookupTableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One row of a reference table.
#[derive(Debug, Clone, PartialEq)]
pub struct LookupEntry {
    pub spt: String,
    values: HashMap<String, f64, RandomState>,
}

impl LookupEntry {
    pub fn new(spt: impl Into<String>) -> Self {
        LookupEntry {
            spt: spt.into(),
            values: HashMap::default(),
        }
    }

    pub fn with_value(mut self, key: impl Into<String>, value: f64) -> Self {
        self.values.insert(key.into(), value);
        self
    }

    /// Reference value for a color or magnitude column, if defined for this row.
    pub fn value(&self, key: &str) -> Option<f64> {
        self.values.get(key).copied()
    }
}

/// An immutable reference table.
#[derive(Debug, Clone)]
pub struct LookupTable {
    name: String,
    columns: Vec<String>,
    entries: Vec<LookupEntry>,
}

/// Parse one numeric cell; blank and placeholder cells are absent values.
fn parse_cell(cell: &str) -> Result<Option<f64>, ()> {
    let cell = cell.trim();
    if cell.is_empty() || cell == "..." || cell == "-" || cell.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }
    cell.parse::<f64>().map(Some).map_err(|_| ())
}

impl LookupTable {
    /// Build a table from rows already in memory.
    ///
    /// `columns` lists the value columns in display order (without `SpT`).
    pub fn from_entries(
        name: impl Into<String>,
        columns: Vec<String>,
        entries: Vec<LookupEntry>,
    ) -> Self {
        LookupTable {
            name: name.into(),
            columns,
            entries,
        }
    }

    /// Parse a table from CSV text.
    ///
    /// Layout
    /// -----------------
    /// * Lines starting with `#` are comments.
    /// * The header's first column must be `SpT`; the other headers name the value columns.
    /// * Blank, `...`, `-` and `nan` cells are absent values.
    ///
    /// Return
    /// ----------
    /// * `Err(PhotClassError::InvalidLookupTable)` – bad header or duplicated column.
    /// * `Err(PhotClassError::LookupTableParse)` – a non-numeric cell, reported with its row.
    pub fn from_csv_str(name: &str, data: &str) -> Result<Self, PhotClassError> {
        let mut reader = csv::ReaderBuilder::new()
            .comment(Some(b'#'))
            .trim(csv::Trim::All)
            .from_reader(data.as_bytes());

        let headers = reader.headers()?.clone();
        if headers.get(0) != Some(SPT_COLUMN) {
            return Err(PhotClassError::InvalidLookupTable(format!(
                "{name}: first column must be '{SPT_COLUMN}'"
            )));
        }

        let columns: Vec<String> = headers.iter().skip(1).map(str::to_string).collect();
        for (i, c) in columns.iter().enumerate() {
            if columns[..i].contains(c) {
                return Err(PhotClassError::InvalidLookupTable(format!(
                    "{name}: duplicated column '{c}'"
                )));
            }
        }

        let mut entries = Vec::new();
        for record in reader.records() {
            let record = record?;
            let spt = record.get(0).unwrap_or_default().to_string();
            if spt.is_empty() {
                continue;
            }

            let mut entry = LookupEntry::new(spt);
            for (column, cell) in columns.iter().zip(record.iter().skip(1)) {
                let value = parse_cell(cell).map_err(|_| {
                    PhotClassError::LookupTableParse(format!(
                        "{name}: {} / {column}: '{cell}'",
                        entry.spt
                    ))
                })?;
                if let Some(v) = value {
                    entry.values.insert(column.clone(), v);
                }
            }
            entries.push(entry);
        }

        Ok(LookupTable {
            name: name.to_string(),
            columns,
            entries,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Value columns in table order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Rows in table order.
    pub fn entries(&self) -> &[LookupEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First row whose label equals `spt` (surrounding whitespace ignored).
    pub fn find(&self, spt: &str) -> Option<&LookupEntry> {
        let spt = spt.trim();
        self.entries.iter().find(|e| e.spt == spt)
    }

    /// True if at least one row defines `key`.
    pub fn covers(&self, key: &str) -> bool {
        self.entries.iter().any(|e| e.values.contains_key(key))
    }
}

#[cfg(test)]
mod lookup_table_test {
    use super::*;

    #[test]
    fn test_load_bundled_tables() {
        let ms = LookupTableKind::MainSequence.load().unwrap();
        assert_eq!(ms.name(), "main-sequence");
        assert!(!ms.is_empty());
        assert_eq!(ms.columns()[0], "B-V");
        assert_eq!(ms.find("A0V").unwrap().value("B-V"), Some(0.0));
        // O9V has no W2-W3 reference
        assert_eq!(ms.find("O9V").unwrap().value("W2-W3"), None);

        let mlt = LookupTableKind::MltDwarfs.load().unwrap();
        let t5 = mlt.find("T5").unwrap();
        assert_eq!(t5.value("M_G"), None);
        assert_eq!(t5.value("M_J"), Some(15.0));
        assert_eq!(t5.value("e_M_J"), Some(0.48));
        assert!(mlt.covers("W1-W2"));
        assert!(!mlt.covers("B-V"));
    }

    #[test]
    fn test_from_csv_str() {
        let data = "# test\nSpT,W1-W2,M_W1\nM5, 0.2 ,8.5\nL2,...,\n";
        let table = LookupTable::from_csv_str("custom", data).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.find(" M5 ").unwrap().value("W1-W2"), Some(0.2));
        assert_eq!(table.find("L2").unwrap().value("W1-W2"), None);
        assert!(table.find("T1").is_none());
    }

    #[test]
    fn test_invalid_tables() {
        assert!(matches!(
            LookupTable::from_csv_str("bad", "Type,W1-W2\nM5,0.2\n"),
            Err(PhotClassError::InvalidLookupTable(_))
        ));
        assert!(matches!(
            LookupTable::from_csv_str("bad", "SpT,W1-W2,W1-W2\nM5,0.2,0.3\n"),
            Err(PhotClassError::InvalidLookupTable(_))
        ));
        assert!(matches!(
            LookupTable::from_csv_str("bad", "SpT,W1-W2\nM5,abc\n"),
            Err(PhotClassError::LookupTableParse(_))
        ));
    }

    #[test]
    fn test_kind_from_str() {
        assert_eq!(
            "MS".parse::<LookupTableKind>().unwrap(),
            LookupTableKind::MainSequence
        );
        assert!("giants".parse::<LookupTableKind>().is_err());
    }
}
