//! Photometric classification of sky positions against external catalogs:
//! counterpart selection, spectral-type matching on reference color tables,
//! photometric distances and ranked classification, interactively or in batch.
pub mod batch;
pub mod catalog;
pub mod classification;
pub mod classifier;
pub mod constants;
pub mod conversion;
pub mod crossmatch;
pub mod lookup;
pub mod photclass_errors;
pub mod photometry;
pub mod run_control;

pub use batch::{BatchParams, BatchPipeline, BatchResult, MalformedRowPolicy, RunOutcome};
pub use catalog::{entry_source::EntrySource, CatalogEntry};
pub use classification::{ClassificationAggregator, ClassifierRecord};
pub use classifier::{Classifier, ClassifierConfig, ClassifierHandle, ClassifierOutcome};
pub use lookup::{LookupTable, LookupTableKind};
pub use photclass_errors::PhotClassError;
pub use run_control::{CancelToken, PipelineState};
