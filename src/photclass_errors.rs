use thiserror::Error;

use crate::constants::{ArcSec, CatalogName};

#[derive(Error, Debug)]
pub enum PhotClassError {
    #[error("Invalid coordinate: {0}")]
    InvalidCoordinate(String),

    #[error("Search radius out of bounds: {radius} arcsec (expected 0 < radius <= {max})")]
    RadiusOutOfBounds { radius: ArcSec, max: ArcSec },

    #[error("Too many rows for a batch run: {count} (maximum is {max})")]
    TooManyRows { count: usize, max: usize },

    #[error("Column {column} is out of range (rows have {width} columns)")]
    ColumnOutOfRange { column: usize, width: usize },

    #[error("Invalid batch parameter: {0}")]
    InvalidBatchParameter(String),

    #[error("Invalid classifier parameter: {0}")]
    InvalidClassifierParameter(String),

    #[error("Row for object {object} could not be processed: {message}")]
    RowProcessing { object: usize, message: String },

    #[error("Entry source failed for catalog {catalog}: {message}")]
    EntrySource {
        catalog: CatalogName,
        message: String,
    },

    #[error("No extinction values for bands: {0}")]
    NoExtinctionData(String),

    #[error("A batch run is already active on this pipeline")]
    RunInProgress,

    #[error("Batch worker terminated abnormally")]
    WorkerPanicked,

    #[error("Unable to parse lookup table row: {0}")]
    LookupTableParse(String),

    #[error("Invalid lookup table: {0}")]
    InvalidLookupTable(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Unable to perform file operation: {0}")]
    IoError(#[from] std::io::Error),
}

impl PhotClassError {
    /// True for the errors that reject caller input before any run starts.
    pub fn is_input_validation(&self) -> bool {
        matches!(
            self,
            PhotClassError::InvalidCoordinate(_)
                | PhotClassError::RadiusOutOfBounds { .. }
                | PhotClassError::TooManyRows { .. }
                | PhotClassError::ColumnOutOfRange { .. }
                | PhotClassError::InvalidBatchParameter(_)
                | PhotClassError::InvalidClassifierParameter(_)
        )
    }
}
