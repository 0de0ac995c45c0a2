//! Delimited export of batch results.
//!
//! One header line, then one line per [`BatchResult`]. Magnitudes are written as
//! `band=value` pairs and spectral-type matches as `color:type` pairs, space separated,
//! so every result stays on a single line whatever the catalog.
use std::{fs::File, io, path::Path};

use itertools::Itertools;
use serde::Serialize;

use crate::{constants::Degree, photclass_errors::PhotClassError};

use super::{BatchRecord, BatchResult};

/// Column names, in [`ReportRow`] field order.
const REPORT_HEADER: [&str; 16] = [
    "row",
    "object",
    "target_ra",
    "target_dec",
    "catalog",
    "source_id",
    "ra",
    "dec",
    "target_distance",
    "plx",
    "pmra",
    "pmdec",
    "magnitudes",
    "spectral_types",
    "flags",
    "note",
];

#[derive(Debug, Serialize)]
struct ReportRow<'a> {
    row: usize,
    object: usize,
    target_ra: Option<Degree>,
    target_dec: Option<Degree>,
    catalog: Option<&'a str>,
    source_id: Option<&'a str>,
    ra: Option<Degree>,
    dec: Option<Degree>,
    /// arcsec
    target_distance: Option<f64>,
    plx: Option<f64>,
    pmra: Option<f64>,
    pmdec: Option<f64>,
    magnitudes: String,
    spectral_types: String,
    flags: String,
    note: Option<&'a str>,
}

impl<'a> From<&'a BatchResult> for ReportRow<'a> {
    fn from(res: &'a BatchResult) -> Self {
        let mut row = ReportRow {
            row: res.row_number,
            object: res.object_number,
            target_ra: res.target_ra,
            target_dec: res.target_dec,
            catalog: None,
            source_id: None,
            ra: None,
            dec: None,
            target_distance: None,
            plx: None,
            pmra: None,
            pmdec: None,
            magnitudes: String::new(),
            spectral_types: String::new(),
            flags: String::new(),
            note: None,
        };

        match &res.record {
            BatchRecord::Matched {
                entry,
                matches,
                flags,
                extinction_note,
            } => {
                row.catalog = Some(entry.catalog_name.as_str());
                row.source_id = Some(entry.source_id.as_str());
                row.ra = Some(entry.ra);
                row.dec = Some(entry.dec);
                row.target_distance = Some(entry.target_distance);
                row.plx = entry.plx;
                row.pmra = entry.pmra;
                row.pmdec = entry.pmdec;
                row.magnitudes = entry
                    .magnitudes()
                    .iter()
                    .map(|(band, mag)| format!("{band}={mag:.3}"))
                    .join(" ");
                row.spectral_types = matches
                    .iter()
                    .map(|m| format!("{}:{}", m.color_key, m.spt))
                    .join(" ");
                row.flags = flags.join(" ");
                row.note = extinction_note.as_deref();
            }
            BatchRecord::NoMatch => row.note = Some("no match"),
            BatchRecord::Malformed { message } => row.note = Some(message.as_str()),
        }
        row
    }
}

/// Write `results` as delimited text.
///
/// The header line is written even when `results` is empty.
pub fn write_report<W: io::Write>(
    writer: W,
    results: &[BatchResult],
    delimiter: u8,
) -> Result<(), PhotClassError> {
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .from_writer(writer);
    wtr.write_record(REPORT_HEADER)?;
    for res in results {
        wtr.serialize(ReportRow::from(res))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write `results` as comma-separated text to `path`.
pub fn write_report_to_path(
    path: impl AsRef<Path>,
    results: &[BatchResult],
) -> Result<(), PhotClassError> {
    write_report(File::create(path)?, results, b',')
}

#[cfg(test)]
mod report_test {
    use super::*;
    use crate::{catalog::CatalogEntry, lookup::spectral_type::MatchResult};

    #[test]
    fn test_report_layout() {
        let entry = CatalogEntry::new("AllWISE", "J1", 10.0, 20.0)
            .with_magnitude("W1", 13.0)
            .with_magnitude("W2", 12.79);
        let results = vec![
            BatchResult {
                row_number: 1,
                object_number: 1,
                target_ra: Some(10.0),
                target_dec: Some(20.0),
                record: BatchRecord::Matched {
                    entry,
                    matches: vec![MatchResult {
                        color_key: "W1-W2".into(),
                        observed: 0.21,
                        reference: 0.21,
                        gap: 0.0,
                        spt: "M5".into(),
                        table: "mlt-dwarfs".into(),
                    }],
                    flags: vec![],
                    extinction_note: None,
                },
            },
            BatchResult {
                row_number: 2,
                object_number: 2,
                target_ra: Some(11.0),
                target_dec: Some(21.0),
                record: BatchRecord::NoMatch,
            },
        ];

        let mut buf = Vec::new();
        write_report(&mut buf, &results, b',').unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("row,object,target_ra,target_dec,catalog"));
        assert!(lines[1].contains("W1=13.000 W2=12.790"));
        assert!(lines[1].contains("W1-W2:M5"));
        assert!(lines[2].starts_with("2,2,11.0,21.0,,"));
        assert!(lines[2].ends_with("no match"));
        assert_eq!(lines[0].split(',').count(), lines[2].split(',').count());
    }

    #[test]
    fn test_empty_report_keeps_header() {
        let mut buf = Vec::new();
        write_report(&mut buf, &[], b';').unwrap();
        let text = String::from_utf8(buf).unwrap();

        assert_eq!(text.lines().count(), 1);
        assert!(text.starts_with("row;object;target_ra;target_dec;catalog;source_id"));
        assert!(text.trim_end().ends_with(";note"));
    }
}
