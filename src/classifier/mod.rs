//! # Interactive classification of a single target
//!
//! [`Classifier`] drives the engine for one query point:
//!
//! 1. every selected catalog is queried through the [`EntrySource`] collaborator,
//! 2. the closest candidate is kept ([`select_best`]),
//! 3. its photometry is optionally corrected for extinction ([`PhotometryCorrector`]),
//! 4. its colors are matched against every configured [`LookupTable`]
//!    ([`SpectralTypeMatcher`]) and checked for anomaly signatures,
//! 5. all catalogs are folded into a [`ClassificationAggregator`] and ranked,
//! 6. the distance of the best-ranked spectral type is estimated from each resolved
//!    entry ([`DistanceEstimator`]).
//!
//! Resolutions are memoised per catalog for the last query point (see [`cache`]), so
//! re-classifying the same target with other exclusions does not query again.
//!
//! Cancellation is cooperative: the cancellation flag is polled before each catalog
//! query. [`Classifier::spawn`] runs the classification on a worker thread and returns
//! a [`ClassifierHandle`]; [`Classifier::classify`] runs it on the calling thread. One
//! run at a time: a second start while a run is active fails with
//! [`PhotClassError::RunInProgress`].
//!
//! ## Example
//! -----------------
//! ```rust,no_run
//! use std::sync::Arc;
//! use photclass::catalog::entry_source::InMemoryEntrySource;
//! use photclass::classifier::{Classifier, ClassifierConfig, ClassifierOutcome};
//!
//! let config = ClassifierConfig::builder().search_radius(5.0).build().unwrap();
//! let classifier = Classifier::new(config).unwrap();
//! let source = Arc::new(InMemoryEntrySource::new());
//!
//! let handle = classifier
//!     .spawn(source, vec!["AllWISE", "Gaia"], 10.684, 41.269, Vec::new())
//!     .unwrap();
//! if let ClassifierOutcome::Completed(result) = handle.join().unwrap() {
//!     println!("{:?}", result.best());
//! }
//! ```
pub mod cache;

use std::{
    sync::{Arc, Mutex, MutexGuard},
    thread::{self, JoinHandle},
};

use itertools::Itertools;
use tracing::{debug, info};

use crate::{
    catalog::{entry_source::EntrySource, CatalogEntry},
    classification::{
        anomaly_records, ClassificationAggregator, ClassifierRecord, RankedType,
    },
    constants::{
        ArcMin, ArcSec, Degree, SourceId, DEFAULT_EXTINCTION_CONE, DEFAULT_SEARCH_RADIUS,
        MAX_SEARCH_RADIUS,
    },
    conversion::{check_dec, check_ra},
    crossmatch::select_best,
    lookup::{
        distance::{DistanceEstimator, DistanceLookupResult},
        spectral_type::{MatchResult, SpectralTypeMatcher},
        taxonomy::is_known_type,
        LookupTable, LookupTableKind,
    },
    photclass_errors::PhotClassError,
    photometry::{
        anomaly::{AnomalyDetector, PhotometricAnomalies},
        Extinction, ExtinctionOutcome, PhotometryCorrector,
    },
    run_control::{CancelToken, PipelineState, RunSlot},
};

use cache::{QueryCache, QueryKey};

/// Settings of the interactive classifier.
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    /// Cone-search radius (arcseconds).
    pub search_radius: ArcSec,
    /// Correct the photometry for extinction when a collaborator is attached.
    pub correct_extinction: bool,
    /// Cone radius handed to the extinction collaborator (arcminutes).
    pub extinction_cone: ArcMin,
    /// Reference tables used for matching, in matching order.
    pub tables: Vec<LookupTableKind>,
    /// Estimate the distance of the best-ranked spectral type.
    pub estimate_distance: bool,
}

impl ClassifierConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> ClassifierConfigBuilder {
        ClassifierConfigBuilder::new()
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        ClassifierConfig {
            search_radius: DEFAULT_SEARCH_RADIUS,
            correct_extinction: false,
            extinction_cone: DEFAULT_EXTINCTION_CONE,
            tables: vec![LookupTableKind::MainSequence, LookupTableKind::MltDwarfs],
            estimate_distance: true,
        }
    }
}

/// Builder for [`ClassifierConfig`], with validation.
#[derive(Debug, Clone, Default)]
pub struct ClassifierConfigBuilder {
    config: ClassifierConfig,
}

impl ClassifierConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn search_radius(mut self, v: ArcSec) -> Self {
        self.config.search_radius = v;
        self
    }
    pub fn correct_extinction(mut self, v: bool) -> Self {
        self.config.correct_extinction = v;
        self
    }
    pub fn extinction_cone(mut self, v: ArcMin) -> Self {
        self.config.extinction_cone = v;
        self
    }
    pub fn tables(mut self, v: impl IntoIterator<Item = LookupTableKind>) -> Self {
        self.config.tables = v.into_iter().collect();
        self
    }
    pub fn estimate_distance(mut self, v: bool) -> Self {
        self.config.estimate_distance = v;
        self
    }

    /// Validate and produce the configuration.
    ///
    /// Validation rules
    /// -----------------
    /// * `0 < search_radius <= MAX_SEARCH_RADIUS`
    /// * `extinction_cone > 0`
    /// * at least one table, no table listed twice.
    pub fn build(self) -> Result<ClassifierConfig, PhotClassError> {
        let c = self.config;

        check_radius(c.search_radius)?;
        if !(c.extinction_cone > 0.0 && c.extinction_cone.is_finite()) {
            return Err(PhotClassError::InvalidClassifierParameter(
                "extinction_cone must be > 0".into(),
            ));
        }
        if c.tables.is_empty() {
            return Err(PhotClassError::InvalidClassifierParameter(
                "at least one lookup table is required".into(),
            ));
        }
        if !c.tables.iter().all_unique() {
            return Err(PhotClassError::InvalidClassifierParameter(
                "a lookup table is listed twice".into(),
            ));
        }
        Ok(c)
    }
}

/// Reject radii outside `(0, MAX_SEARCH_RADIUS]`.
pub(crate) fn check_radius(radius: ArcSec) -> Result<ArcSec, PhotClassError> {
    if radius > 0.0 && radius <= MAX_SEARCH_RADIUS {
        Ok(radius)
    } else {
        Err(PhotClassError::RadiusOutOfBounds {
            radius,
            max: MAX_SEARCH_RADIUS,
        })
    }
}

/// Everything derived from the counterpart of one catalog.
#[derive(Debug, Clone)]
pub struct CatalogResolution {
    /// Selected counterpart, after extinction correction if any.
    pub entry: CatalogEntry,
    /// Nearest spectral type per color, all tables concatenated.
    pub matches: Vec<MatchResult>,
    /// Raised anomaly flags with their tally records.
    pub anomalies: Vec<(&'static str, ClassifierRecord)>,
    /// Extinction correction summary, when a correction was attempted.
    pub extinction: Option<ExtinctionOutcome>,
}

impl CatalogResolution {
    pub fn flags(&self) -> Vec<&'static str> {
        self.anomalies.iter().map(|(flag, _)| *flag).collect()
    }
}

/// Result of a completed classification.
#[derive(Debug, Clone, Default)]
pub struct Classification {
    /// Resolved catalogs, in the requested catalog order.
    pub resolutions: Vec<CatalogResolution>,
    /// Ranked spectral types.
    pub ranked: Vec<RankedType>,
    /// Tallied records.
    pub audit: Vec<ClassifierRecord>,
    /// Distance estimates for the best-ranked known spectral type.
    pub distances: Vec<DistanceLookupResult>,
}

impl Classification {
    pub fn best(&self) -> Option<&RankedType> {
        self.ranked.first()
    }
}

/// Outcome of [`Classifier::classify`].
#[derive(Debug, Clone)]
pub enum ClassifierOutcome {
    Completed(Classification),
    /// Cancelled between two catalog queries; carries the catalogs resolved so far.
    Cancelled(Vec<CatalogResolution>),
}

impl ClassifierOutcome {
    pub fn state(&self) -> PipelineState {
        match self {
            ClassifierOutcome::Completed(_) => PipelineState::Completed,
            ClassifierOutcome::Cancelled(_) => PipelineState::Cancelled,
        }
    }
}

/// Handle on a classification started with [`Classifier::spawn`].
#[derive(Debug)]
pub struct ClassifierHandle {
    cancel: CancelToken,
    join: JoinHandle<Result<ClassifierOutcome, PhotClassError>>,
}

impl ClassifierHandle {
    /// Ask the worker to stop before its next catalog query.
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
    pub fn join(self) -> Result<ClassifierOutcome, PhotClassError> {
        self.join.join().map_err(|_| PhotClassError::WorkerPanicked)?
    }
}

/// Collaborators of a classification, shareable with a worker thread.
#[derive(Clone)]
struct Engine {
    config: ClassifierConfig,
    tables: Arc<[LookupTable]>,
    detector: Arc<dyn AnomalyDetector>,
    extinction: Option<Arc<dyn Extinction>>,
    cache: Arc<Mutex<QueryCache>>,
}

impl Engine {
    fn cache(&self) -> MutexGuard<'_, QueryCache> {
        self.cache.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn resolve(
        &self,
        source: &dyn EntrySource,
        catalog: &str,
        ra: Degree,
        dec: Degree,
    ) -> Result<Option<CatalogResolution>, PhotClassError> {
        let candidates = source.query_by_coords(catalog, ra, dec, self.config.search_radius)?;
        let n_candidates = candidates.len();
        let Some(mut entry) = select_best(candidates) else {
            debug!(catalog, "no counterpart");
            return Ok(None);
        };
        debug!(catalog, source = %entry.source_id, separation = entry.target_distance,
            n_candidates, "counterpart selected");

        let extinction = match (&self.extinction, self.config.correct_extinction) {
            (Some(ext), true) => {
                Some(PhotometryCorrector::new(ext.as_ref(), self.config.extinction_cone).correct(&mut entry))
            }
            _ => None,
        };

        let colors = entry.colors();
        let matches = self
            .tables
            .iter()
            .flat_map(|table| SpectralTypeMatcher::new(table).lookup(&colors))
            .collect();
        let anomalies = anomaly_records(&entry, self.detector.as_ref());

        Ok(Some(CatalogResolution {
            entry,
            matches,
            anomalies,
            extinction,
        }))
    }

    fn run<S, F>(
        &self,
        source: &dyn EntrySource,
        catalogs: &[S],
        ra: Degree,
        dec: Degree,
        exclusions: &[SourceId],
        mut should_cancel: F,
    ) -> Result<ClassifierOutcome, PhotClassError>
    where
        S: AsRef<str>,
        F: FnMut() -> bool,
    {
        self.cache()
            .select(QueryKey::new(ra, dec, self.config.search_radius));

        let mut resolutions = Vec::with_capacity(catalogs.len());
        for catalog in catalogs {
            let catalog = catalog.as_ref();
            if should_cancel() {
                info!(resolved = resolutions.len(), "classification cancelled");
                return Ok(ClassifierOutcome::Cancelled(resolutions));
            }

            let cached = self.cache().get(catalog).cloned();
            let resolution = match cached {
                Some(cached) => {
                    debug!(catalog, "cache hit");
                    cached
                }
                None => {
                    let resolved = self.resolve(source, catalog, ra, dec)?;
                    self.cache().insert(catalog, resolved.clone());
                    resolved
                }
            };
            resolutions.extend(resolution);
        }

        let mut aggregator = ClassificationAggregator::with_exclusions(exclusions.iter().cloned());
        for res in &resolutions {
            aggregator.add_matches(&res.entry, &res.matches);
            for (_, record) in &res.anomalies {
                aggregator.add_occurrence(record.clone());
            }
            aggregator.add_published_type(&res.entry);
        }

        let ranked = aggregator.ranked();
        let distances = if self.config.estimate_distance {
            self.estimate_distances(&ranked, &resolutions, exclusions)
        } else {
            Vec::new()
        };

        info!(catalogs = catalogs.len(), resolved = resolutions.len(),
            best = ?ranked.first().map(|r| r.spt.as_str()), "classification done");

        Ok(ClassifierOutcome::Completed(Classification {
            resolutions,
            ranked,
            audit: aggregator.audit().to_vec(),
            distances,
        }))
    }

    /// Distances for the best-ranked label that exists in the taxonomy, from every
    /// non-excluded entry and every table defining that label.
    fn estimate_distances(
        &self,
        ranked: &[RankedType],
        resolutions: &[CatalogResolution],
        exclusions: &[SourceId],
    ) -> Vec<DistanceLookupResult> {
        let Some(best) = ranked.iter().find(|r| is_known_type(&r.spt)) else {
            return Vec::new();
        };

        resolutions
            .iter()
            .filter(|res| !exclusions.contains(&res.entry.source_id))
            .flat_map(|res| {
                self.tables.iter().flat_map(move |table| {
                    DistanceEstimator::new(table).lookup(&best.spt, res.entry.magnitudes())
                })
            })
            .collect()
    }
}

/// Single-target classification engine; one active run at a time.
pub struct Classifier {
    engine: Engine,
    slot: RunSlot,
}

impl Classifier {
    /// Load the configured tables and use the default anomaly thresholds.
    pub fn new(config: ClassifierConfig) -> Result<Self, PhotClassError> {
        let tables = config
            .tables
            .iter()
            .map(|kind| kind.load())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::with_tables(config, tables))
    }

    /// Use caller-provided tables instead of the bundled ones.
    pub fn with_tables(config: ClassifierConfig, tables: Vec<LookupTable>) -> Self {
        Classifier {
            engine: Engine {
                config,
                tables: tables.into(),
                detector: Arc::new(PhotometricAnomalies),
                extinction: None,
                cache: Arc::new(Mutex::new(QueryCache::new())),
            },
            slot: RunSlot::new(),
        }
    }

    pub fn with_detector(mut self, detector: impl AnomalyDetector + 'static) -> Self {
        self.engine.detector = Arc::new(detector);
        self
    }

    pub fn with_extinction(mut self, extinction: impl Extinction + 'static) -> Self {
        self.engine.extinction = Some(Arc::new(extinction));
        self.engine.cache().clear();
        self
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.engine.config
    }

    pub fn tables(&self) -> &[LookupTable] {
        &self.engine.tables
    }

    /// Number of catalogs memoised for the last query point.
    pub fn cached_catalogs(&self) -> usize {
        self.engine.cache().len()
    }

    /// Current state; after a run, the state it ended in.
    pub fn state(&self) -> PipelineState {
        self.slot.state()
    }

    pub fn is_running(&self) -> bool {
        self.slot.is_running()
    }

    /// Query one catalog and derive everything from its closest candidate.
    ///
    /// Return
    /// ----------
    /// * `Ok(None)` when the catalog has no candidate in the search cone.
    /// * `Err(PhotClassError::EntrySource)` when the collaborator fails.
    pub fn resolve(
        &self,
        source: &dyn EntrySource,
        catalog: &str,
        ra: Degree,
        dec: Degree,
    ) -> Result<Option<CatalogResolution>, PhotClassError> {
        self.engine.resolve(source, catalog, ra, dec)
    }

    /// Classify the target at `(ra, dec)` across `catalogs`, on the calling thread.
    ///
    /// Arguments
    /// -----------------
    /// * `source`: catalog query collaborator.
    /// * `catalogs`: catalogs to query, in display order.
    /// * `ra`, `dec`: target position in degrees.
    /// * `exclusions`: source ids left out of the tally.
    /// * `should_cancel`: polled before each catalog query.
    ///
    /// Return
    /// ----------
    /// * `Ok(ClassifierOutcome::Completed)` with the ranked classification.
    /// * `Ok(ClassifierOutcome::Cancelled)` with the catalogs resolved before the stop.
    /// * `Err(PhotClassError::InvalidCoordinate)` for an invalid position,
    ///   `Err(PhotClassError::RunInProgress)` if another run is active, or the
    ///   entry-source error that interrupted the run.
    pub fn classify<S, F>(
        &self,
        source: &dyn EntrySource,
        catalogs: &[S],
        ra: Degree,
        dec: Degree,
        exclusions: &[SourceId],
        should_cancel: F,
    ) -> Result<ClassifierOutcome, PhotClassError>
    where
        S: AsRef<str>,
        F: FnMut() -> bool,
    {
        check_ra(ra)?;
        check_dec(dec)?;
        let guard = self.slot.acquire()?.started();
        let result = self
            .engine
            .run(source, catalogs, ra, dec, exclusions, should_cancel);
        guard.finish(run_state(&result));
        result
    }

    /// Classify on a dedicated worker thread.
    ///
    /// The coordinate check and the busy check happen synchronously; the returned
    /// handle cancels and joins the worker.
    pub fn spawn<S>(
        &self,
        source: Arc<dyn EntrySource>,
        catalogs: Vec<S>,
        ra: Degree,
        dec: Degree,
        exclusions: Vec<SourceId>,
    ) -> Result<ClassifierHandle, PhotClassError>
    where
        S: AsRef<str> + Send + 'static,
    {
        check_ra(ra)?;
        check_dec(dec)?;
        let guard = self.slot.acquire()?;

        let engine = self.engine.clone();
        let cancel = CancelToken::new();
        let token = cancel.clone();

        let join = thread::Builder::new()
            .name("photclass-classify".into())
            .spawn(move || {
                let guard = guard.started();
                let result = engine.run(&*source, &catalogs, ra, dec, &exclusions, || {
                    token.is_cancelled()
                });
                guard.finish(run_state(&result));
                result
            })?;

        Ok(ClassifierHandle { cancel, join })
    }
}

fn run_state(result: &Result<ClassifierOutcome, PhotClassError>) -> PipelineState {
    match result {
        Ok(outcome) => outcome.state(),
        Err(_) => PipelineState::Errored,
    }
}
