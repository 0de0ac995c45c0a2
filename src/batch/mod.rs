//! # Batch classification pipeline
//!
//! Drive the cross-match and spectral-type matching engine over a list of coordinate
//! rows (up to tens of thousands), one background worker per run.
//!
//! ## Overview
//! -----------------
//! A [`BatchPipeline`] owns the collaborators of a run (entry source, lookup tables,
//! anomaly predicates, optional extinction) and a [`BatchParams`] configuration. For
//! each input row it:
//!
//! 1. reads RA/Dec from the configured **1-based** columns,
//! 2. queries every selected catalog, keeps the closest candidate, matches its colors
//!    and checks its anomaly signatures, emitting one [`BatchResult`] per catalog with
//!    a counterpart,
//! 3. emits exactly one placeholder result when no catalog had a counterpart,
//! 4. reports progress with the 1-based object number.
//!
//! Cancellation is cooperative: the flag is polled **before** each row, and a
//! cancelled run returns the results accumulated so far.
//!
//! ## States
//! -----------------
//! `Idle → Running → {Completed, Cancelled, Errored}`. A pipeline accepts a new run as
//! soon as the previous one has finished; starting a run while another is active is
//! rejected synchronously with [`PhotClassError::RunInProgress`].
//!
//! ## Failures
//! -----------------
//! * Input validation (row ceiling, column range, empty catalog list) happens before
//!   any query and is returned as `Err`.
//! * A row whose coordinates cannot be read raises [`PhotClassError::RowProcessing`].
//!   With [`MalformedRowPolicy::Abort`] (default) the run ends in
//!   [`RunOutcome::Errored`] and accumulated results are discarded; with
//!   [`MalformedRowPolicy::Skip`] the row yields a diagnostic result and the run goes on.
//! * An entry-source failure always ends the run in [`RunOutcome::Errored`]; queries
//!   are never retried.
//!
//! ## Example
//! -----------------
//! ```rust,no_run
//! use std::sync::Arc;
//! use photclass::batch::{BatchParams, BatchPipeline, RunOutcome};
//! use photclass::catalog::entry_source::InMemoryEntrySource;
//!
//! let params = BatchParams::builder()
//!     .search_radius(5.0)
//!     .ra_column(2)
//!     .dec_column(3)
//!     .build()
//!     .unwrap();
//! let pipeline = BatchPipeline::new(Arc::new(InMemoryEntrySource::new()), params).unwrap();
//!
//! let rows = vec![vec!["obj1".into(), "10.684".into(), "41.269".into()]];
//! let handle = pipeline.spawn(rows, vec!["AllWISE".to_string()], |_| {}).unwrap();
//! match handle.join().unwrap() {
//!     RunOutcome::Completed(results) => println!("{} results", results.len()),
//!     other => println!("{:?}", other.state()),
//! }
//! ```
pub(crate) mod progress_bar;
pub mod report;

use std::{
    collections::BTreeMap,
    io,
    sync::Arc,
    thread::{self, JoinHandle},
    time::Instant,
};

use tracing::{debug, info, warn};

use crate::{
    catalog::{entry_source::EntrySource, CatalogEntry},
    classification::anomaly_records,
    classifier::check_radius,
    constants::{ArcMin, ArcSec, BandKey, Degree, Magnitude, DEFAULT_EXTINCTION_CONE,
        DEFAULT_SEARCH_RADIUS, MAX_BATCH_ROWS},
    conversion::{parse_dec, parse_ra},
    crossmatch::select_best,
    lookup::{
        spectral_type::{MatchResult, SpectralTypeMatcher},
        LookupTable, LookupTableKind,
    },
    photclass_errors::PhotClassError,
    photometry::{
        anomaly::{AnomalyDetector, PhotometricAnomalies},
        Extinction, PhotometryCorrector,
    },
    run_control::RunSlot,
};

use progress_bar::RunProgress;

pub use crate::run_control::{CancelToken, PipelineState};

/// One input row, as delimited string fields.
pub type InputRow = Vec<String>;

/// What to do with a row whose coordinates cannot be read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MalformedRowPolicy {
    /// End the run in [`RunOutcome::Errored`], discarding the results.
    #[default]
    Abort,
    /// Emit a diagnostic result for the row and continue.
    Skip,
}

/// Configuration of a batch run.
#[derive(Debug, Clone)]
pub struct BatchParams {
    /// Cone-search radius (arcseconds).
    pub search_radius: ArcSec,
    /// 1-based column holding the right ascension.
    pub ra_column: usize,
    /// 1-based column holding the declination.
    pub dec_column: usize,
    /// Largest number of rows accepted by a run.
    pub max_rows: usize,
    pub malformed_row_policy: MalformedRowPolicy,
    /// Correct the photometry for extinction when a collaborator is attached.
    pub correct_extinction: bool,
    /// Cone radius handed to the extinction collaborator (arcminutes).
    pub extinction_cone: ArcMin,
    /// First line of a delimited input is a header (see [`BatchParams::read_rows`]).
    pub has_header: bool,
    /// Field delimiter of a delimited input.
    pub delimiter: u8,
}

impl BatchParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> BatchParamsBuilder {
        BatchParamsBuilder::new()
    }

    /// Read delimited input rows.
    ///
    /// Rows may have different lengths; the header line, if configured, is dropped.
    pub fn read_rows<R: io::Read>(&self, reader: R) -> Result<Vec<InputRow>, PhotClassError> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(self.has_header)
            .delimiter(self.delimiter)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        rdr.records()
            .map(|record| -> Result<InputRow, PhotClassError> {
                Ok(record?.iter().map(str::to_string).collect())
            })
            .collect()
    }
}

impl Default for BatchParams {
    fn default() -> Self {
        BatchParams {
            search_radius: DEFAULT_SEARCH_RADIUS,
            ra_column: 1,
            dec_column: 2,
            max_rows: MAX_BATCH_ROWS,
            malformed_row_policy: MalformedRowPolicy::Abort,
            correct_extinction: false,
            extinction_cone: DEFAULT_EXTINCTION_CONE,
            has_header: false,
            delimiter: b',',
        }
    }
}

/// Builder for [`BatchParams`], with validation.
#[derive(Debug, Clone, Default)]
pub struct BatchParamsBuilder {
    params: BatchParams,
}

impl BatchParamsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn search_radius(mut self, v: ArcSec) -> Self {
        self.params.search_radius = v;
        self
    }
    pub fn ra_column(mut self, v: usize) -> Self {
        self.params.ra_column = v;
        self
    }
    pub fn dec_column(mut self, v: usize) -> Self {
        self.params.dec_column = v;
        self
    }
    pub fn max_rows(mut self, v: usize) -> Self {
        self.params.max_rows = v;
        self
    }
    pub fn malformed_row_policy(mut self, v: MalformedRowPolicy) -> Self {
        self.params.malformed_row_policy = v;
        self
    }
    pub fn correct_extinction(mut self, v: bool) -> Self {
        self.params.correct_extinction = v;
        self
    }
    pub fn extinction_cone(mut self, v: ArcMin) -> Self {
        self.params.extinction_cone = v;
        self
    }
    pub fn has_header(mut self, v: bool) -> Self {
        self.params.has_header = v;
        self
    }
    pub fn delimiter(mut self, v: u8) -> Self {
        self.params.delimiter = v;
        self
    }

    /// Validate and produce the parameters.
    ///
    /// Validation rules
    /// -----------------
    /// * `0 < search_radius <= MAX_SEARCH_RADIUS`
    /// * `ra_column >= 1`, `dec_column >= 1`, and they differ
    /// * `max_rows >= 1`
    /// * `extinction_cone > 0`
    pub fn build(self) -> Result<BatchParams, PhotClassError> {
        let p = self.params;

        check_radius(p.search_radius)?;
        if p.ra_column == 0 || p.dec_column == 0 {
            return Err(PhotClassError::InvalidBatchParameter(
                "column numbers are 1-based".into(),
            ));
        }
        if p.ra_column == p.dec_column {
            return Err(PhotClassError::InvalidBatchParameter(
                "RA and Dec must be read from different columns".into(),
            ));
        }
        if p.max_rows == 0 {
            return Err(PhotClassError::InvalidBatchParameter(
                "max_rows must be >= 1".into(),
            ));
        }
        if !(p.extinction_cone > 0.0 && p.extinction_cone.is_finite()) {
            return Err(PhotClassError::InvalidBatchParameter(
                "extinction_cone must be > 0".into(),
            ));
        }
        Ok(p)
    }
}

/// Per-row payload of a [`BatchResult`].
#[derive(Debug, Clone, PartialEq)]
pub enum BatchRecord {
    /// Counterpart found in one catalog.
    Matched {
        entry: CatalogEntry,
        matches: Vec<MatchResult>,
        flags: Vec<&'static str>,
        /// Bands left uncorrected by the extinction step.
        extinction_note: Option<String>,
    },
    /// No catalog had a counterpart for the row.
    NoMatch,
    /// The row was skipped; carries the diagnostic.
    Malformed { message: String },
}

/// One output row of a batch run.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchResult {
    /// 1-based position of this result in the run output.
    pub row_number: usize,
    /// 1-based position of the input row that produced it.
    pub object_number: usize,
    pub target_ra: Option<Degree>,
    pub target_dec: Option<Degree>,
    pub record: BatchRecord,
}

impl BatchResult {
    pub fn entry(&self) -> Option<&CatalogEntry> {
        match &self.record {
            BatchRecord::Matched { entry, .. } => Some(entry),
            _ => None,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self.record, BatchRecord::NoMatch)
    }

    pub fn magnitudes(&self) -> Option<&BTreeMap<BandKey, Magnitude>> {
        self.entry().map(CatalogEntry::magnitudes)
    }
}

/// How a run ended.
#[derive(Debug)]
pub enum RunOutcome {
    Completed(Vec<BatchResult>),
    /// Stopped before a row; carries the results of the rows processed so far.
    Cancelled(Vec<BatchResult>),
    /// Stopped by an error; results are discarded.
    Errored(PhotClassError),
}

impl RunOutcome {
    pub fn state(&self) -> PipelineState {
        match self {
            RunOutcome::Completed(_) => PipelineState::Completed,
            RunOutcome::Cancelled(_) => PipelineState::Cancelled,
            RunOutcome::Errored(_) => PipelineState::Errored,
        }
    }

    pub fn results(&self) -> &[BatchResult] {
        match self {
            RunOutcome::Completed(r) | RunOutcome::Cancelled(r) => r,
            RunOutcome::Errored(_) => &[],
        }
    }

    pub fn into_results(self) -> Result<Vec<BatchResult>, PhotClassError> {
        match self {
            RunOutcome::Completed(r) | RunOutcome::Cancelled(r) => Ok(r),
            RunOutcome::Errored(err) => Err(err),
        }
    }
}

/// Handle on a run started with [`BatchPipeline::spawn`].
#[derive(Debug)]
pub struct BatchHandle {
    cancel: CancelToken,
    join: JoinHandle<RunOutcome>,
}

impl BatchHandle {
    /// Ask the worker to stop before its next row.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Wait for the worker and return its outcome.
    pub fn join(self) -> Result<RunOutcome, PhotClassError> {
        self.join.join().map_err(|_| PhotClassError::WorkerPanicked)
    }
}

/// Collaborators and parameters of one run, shareable with the worker thread.
#[derive(Clone)]
struct RunContext {
    source: Arc<dyn EntrySource>,
    tables: Arc<[LookupTable]>,
    detector: Arc<dyn AnomalyDetector>,
    extinction: Option<Arc<dyn Extinction>>,
    params: BatchParams,
}

impl RunContext {
    fn execute<S, P, C>(
        &self,
        rows: &[InputRow],
        catalogs: &[S],
        mut on_progress: P,
        mut is_cancelled: C,
    ) -> RunOutcome
    where
        S: AsRef<str>,
        P: FnMut(usize),
        C: FnMut() -> bool,
    {
        let start = Instant::now();
        let mut progress = RunProgress::new(rows.len());
        let mut results: Vec<BatchResult> = Vec::with_capacity(rows.len());

        info!(rows = rows.len(), catalogs = catalogs.len(), radius = self.params.search_radius,
            "batch run started");

        for (idx, row) in rows.iter().enumerate() {
            let object_number = idx + 1;

            if is_cancelled() {
                progress.finish();
                info!(processed = idx, results = results.len(), "batch run cancelled");
                return RunOutcome::Cancelled(results);
            }

            match self.process_row(row, object_number, catalogs, &mut results) {
                Ok(()) => {}
                Err(err @ PhotClassError::RowProcessing { .. })
                    if self.params.malformed_row_policy == MalformedRowPolicy::Skip =>
                {
                    warn!(object_number, %err, "malformed row skipped");
                    results.push(BatchResult {
                        row_number: results.len() + 1,
                        object_number,
                        target_ra: None,
                        target_dec: None,
                        record: BatchRecord::Malformed {
                            message: err.to_string(),
                        },
                    });
                }
                Err(err) => {
                    progress.finish();
                    warn!(object_number, %err, "batch run aborted");
                    return RunOutcome::Errored(err);
                }
            }

            progress.tick();
            on_progress(object_number);
        }

        progress.finish();
        info!(rows = rows.len(), results = results.len(),
            placeholders = results.iter().filter(|r| r.is_placeholder()).count(),
            elapsed_ms = start.elapsed().as_millis() as u64, "batch run completed");
        RunOutcome::Completed(results)
    }

    fn parse_position(
        &self,
        row: &InputRow,
        object: usize,
    ) -> Result<(Degree, Degree), PhotClassError> {
        let field = |column: usize| {
            column
                .checked_sub(1)
                .and_then(|idx| row.get(idx))
                .ok_or_else(|| PhotClassError::RowProcessing {
                    object,
                    message: format!("row has no column {column}"),
                })
        };
        let invalid = |err: PhotClassError| PhotClassError::RowProcessing {
            object,
            message: err.to_string(),
        };

        let ra = parse_ra(field(self.params.ra_column)?).map_err(invalid)?;
        let dec = parse_dec(field(self.params.dec_column)?).map_err(invalid)?;
        Ok((ra, dec))
    }

    fn process_row<S: AsRef<str>>(
        &self,
        row: &InputRow,
        object_number: usize,
        catalogs: &[S],
        results: &mut Vec<BatchResult>,
    ) -> Result<(), PhotClassError> {
        let (ra, dec) = self.parse_position(row, object_number)?;
        let mut matched = false;

        for catalog in catalogs {
            let catalog = catalog.as_ref();
            let candidates = self
                .source
                .query_by_coords(catalog, ra, dec, self.params.search_radius)
                .map_err(|err| match err {
                    err @ PhotClassError::EntrySource { .. } => err,
                    other => PhotClassError::EntrySource {
                        catalog: catalog.to_string(),
                        message: other.to_string(),
                    },
                })?;

            let Some(mut entry) = select_best(candidates) else {
                continue;
            };

            let extinction_note = match self.extinction.as_deref() {
                Some(ext) if self.params.correct_extinction => {
                    PhotometryCorrector::new(ext, self.params.extinction_cone)
                        .correct(&mut entry)
                        .no_data()
                        .map(|note| note.to_string())
                }
                _ => None,
            };

            let colors = entry.colors();
            let matches = self
                .tables
                .iter()
                .flat_map(|table| SpectralTypeMatcher::new(table).lookup(&colors))
                .collect();
            let flags = anomaly_records(&entry, self.detector.as_ref())
                .into_iter()
                .map(|(flag, _)| flag)
                .collect();

            debug!(object_number, catalog, source = %entry.source_id, "counterpart found");
            results.push(BatchResult {
                row_number: results.len() + 1,
                object_number,
                target_ra: Some(ra),
                target_dec: Some(dec),
                record: BatchRecord::Matched {
                    entry,
                    matches,
                    flags,
                    extinction_note,
                },
            });
            matched = true;
        }

        if !matched {
            results.push(BatchResult {
                row_number: results.len() + 1,
                object_number,
                target_ra: Some(ra),
                target_dec: Some(dec),
                record: BatchRecord::NoMatch,
            });
        }
        Ok(())
    }
}

/// Batch driver; one active run at a time.
pub struct BatchPipeline {
    context: RunContext,
    slot: RunSlot,
}

impl BatchPipeline {
    /// Pipeline matching against both bundled tables with the default anomaly thresholds.
    pub fn new(source: Arc<dyn EntrySource>, params: BatchParams) -> Result<Self, PhotClassError> {
        let tables = [LookupTableKind::MainSequence, LookupTableKind::MltDwarfs]
            .iter()
            .map(|kind| kind.load())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::with_tables(source, params, tables))
    }

    pub fn with_tables(
        source: Arc<dyn EntrySource>,
        params: BatchParams,
        tables: Vec<LookupTable>,
    ) -> Self {
        BatchPipeline {
            context: RunContext {
                source,
                tables: tables.into(),
                detector: Arc::new(PhotometricAnomalies),
                extinction: None,
                params,
            },
            slot: RunSlot::new(),
        }
    }

    pub fn with_detector(mut self, detector: impl AnomalyDetector + 'static) -> Self {
        self.context.detector = Arc::new(detector);
        self
    }

    pub fn with_extinction(mut self, extinction: impl Extinction + 'static) -> Self {
        self.context.extinction = Some(Arc::new(extinction));
        self
    }

    pub fn params(&self) -> &BatchParams {
        &self.context.params
    }

    /// Current state; after a run, the state it ended in.
    pub fn state(&self) -> PipelineState {
        self.slot.state()
    }

    pub fn is_running(&self) -> bool {
        self.slot.is_running()
    }

    /// Reject the run before anything is queried.
    fn validate<S: AsRef<str>>(
        &self,
        rows: &[InputRow],
        catalogs: &[S],
    ) -> Result<(), PhotClassError> {
        let p = &self.context.params;
        if rows.len() > p.max_rows {
            return Err(PhotClassError::TooManyRows {
                count: rows.len(),
                max: p.max_rows,
            });
        }
        if catalogs.is_empty() {
            return Err(PhotClassError::InvalidBatchParameter(
                "no catalog selected".into(),
            ));
        }
        if let Some(first) = rows.first() {
            let column = p.ra_column.max(p.dec_column);
            if column > first.len() {
                return Err(PhotClassError::ColumnOutOfRange {
                    column,
                    width: first.len(),
                });
            }
        }
        Ok(())
    }

    /// Run on the calling thread.
    ///
    /// Arguments
    /// -----------------
    /// * `rows`: input rows.
    /// * `catalogs`: catalogs queried for every row, in output order.
    /// * `on_progress`: called after each row with its 1-based object number.
    /// * `is_cancelled`: polled before each row.
    ///
    /// Return
    /// ----------
    /// * `Ok(RunOutcome)` once the run has started, however it ended.
    /// * `Err(PhotClassError)` if the input was rejected or a run is already active.
    pub fn run<S, P, C>(
        &self,
        rows: &[InputRow],
        catalogs: &[S],
        on_progress: P,
        is_cancelled: C,
    ) -> Result<RunOutcome, PhotClassError>
    where
        S: AsRef<str>,
        P: FnMut(usize),
        C: FnMut() -> bool,
    {
        self.validate(rows, catalogs)?;
        let guard = self.slot.acquire()?.started();
        let outcome = self
            .context
            .execute(rows, catalogs, on_progress, is_cancelled);
        guard.finish(outcome.state());
        Ok(outcome)
    }

    /// Run on a dedicated worker thread.
    ///
    /// Validation and the busy check happen synchronously; the returned handle cancels
    /// and joins the worker. If the thread cannot be created the pipeline keeps its
    /// previous state.
    pub fn spawn<S, P>(
        &self,
        rows: Vec<InputRow>,
        catalogs: Vec<S>,
        on_progress: P,
    ) -> Result<BatchHandle, PhotClassError>
    where
        S: AsRef<str> + Send + 'static,
        P: FnMut(usize) + Send + 'static,
    {
        self.validate(&rows, &catalogs)?;
        let guard = self.slot.acquire()?;

        let context = self.context.clone();
        let cancel = CancelToken::new();
        let token = cancel.clone();

        let join = thread::Builder::new()
            .name("photclass-batch".into())
            .spawn(move || {
                let guard = guard.started();
                let outcome =
                    context.execute(&rows, &catalogs, on_progress, || token.is_cancelled());
                guard.finish(outcome.state());
                outcome
            })?;

        Ok(BatchHandle { cancel, join })
    }
}
