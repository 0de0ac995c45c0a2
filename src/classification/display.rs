//! # Tabular display for classification results
//!
//! Display adaptor rendering a [`ClassificationAggregator`] as a table, without
//! cloning its records.
//!
//! Two layouts are available:
//!
//! - **Ranking** (default, `{}`): `Rank | SpT | Count`
//! - **Audit** (alternate, `{:#}`): the ranking followed by every tallied record,
//!   `Catalog | Source | Color | Observed | Reference | SpT`
//!
//! ```rust,ignore
//! use photclass::classification::display::ClassificationDisplayExt;
//!
//! println!("{}", aggregator.show());   // ranking only
//! println!("{:#}", aggregator.show()); // ranking + audit list
//! ```
use std::fmt;

use comfy_table::{presets::UTF8_FULL, Cell, CellAlignment, ContentArrangement, Row, Table};

use super::ClassificationAggregator;

/// Display adaptor over a borrowed aggregator.
pub struct ClassificationDisplay<'a> {
    agg: &'a ClassificationAggregator,
    /// Fixed-point digits for color values (default = 3).
    value_prec: usize,
}

impl<'a> ClassificationDisplay<'a> {
    pub fn new(agg: &'a ClassificationAggregator) -> Self {
        Self {
            agg,
            value_prec: 3,
        }
    }

    pub fn with_value_precision(mut self, prec: usize) -> Self {
        self.value_prec = prec;
        self
    }

    fn new_table() -> Table {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);
        table
    }

    fn render_ranking(&self) -> String {
        let mut table = Self::new_table();
        table.set_header(vec![Cell::new("Rank"), Cell::new("SpT"), Cell::new("Count")]);

        for (i, r) in self.agg.ranked().into_iter().enumerate() {
            table.add_row(Row::from(vec![
                Cell::new(i + 1).set_alignment(CellAlignment::Right),
                Cell::new(r.spt),
                Cell::new(r.count).set_alignment(CellAlignment::Right),
            ]));
        }
        table.to_string()
    }

    fn render_audit(&self) -> String {
        let mut table = Self::new_table();
        table.set_header(vec![
            Cell::new("Catalog"),
            Cell::new("Source"),
            Cell::new("Color"),
            Cell::new("Observed"),
            Cell::new("Reference"),
            Cell::new("SpT"),
        ]);

        let p = self.value_prec;
        for rec in self.agg.audit() {
            table.add_row(Row::from(vec![
                Cell::new(&rec.catalog_name),
                Cell::new(&rec.source_id),
                Cell::new(&rec.color_key),
                Cell::new(format!("{:.*}", p, rec.observed)).set_alignment(CellAlignment::Right),
                Cell::new(format!("{:.*}", p, rec.reference)).set_alignment(CellAlignment::Right),
                Cell::new(&rec.spt),
            ]));
        }
        table.to_string()
    }
}

/// Ergonomic builder for [`ClassificationDisplay`].
pub trait ClassificationDisplayExt {
    fn show(&self) -> ClassificationDisplay<'_>;
}

impl ClassificationDisplayExt for ClassificationAggregator {
    fn show(&self) -> ClassificationDisplay<'_> {
        ClassificationDisplay::new(self)
    }
}

impl fmt::Display for ClassificationDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.agg.tally().is_empty() {
            return write!(f, "No spectral type match");
        }

        write!(f, "{}", self.render_ranking())?;
        if f.alternate() {
            write!(f, "\n{}", self.render_audit())?;
        }
        Ok(())
    }
}
