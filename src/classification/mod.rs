//! # Classification aggregation
//!
//! Fold per-entry spectral-type matches from several catalogs into a single
//! **occurrence tally**, then rank spectral types by how often they were matched.
//!
//! ## Overview
//! -----------------
//! Every [`MatchResult`] of every resolved catalog entry becomes a flattened
//! [`ClassifierRecord`]. Records are folded by
//! [`ClassificationAggregator::add_occurrence`]:
//!
//! 1. records whose `source_id` is in the exclusion set (sources the user removed
//!    from the classification) are skipped,
//! 2. records whose **signature** `(color_key, observed, spt)` was already seen in this
//!    run are discarded, so that coincidental duplicates do not inflate the count,
//! 3. remaining records increment the tally for their spectral type and are kept in
//!    the audit list.
//!
//! Anomaly flags (AGN / white-dwarf candidates) enter the tally through the same path
//! as pseudo spectral types, see [`ClassificationAggregator::add_anomalies`]. A spectral
//! type published by the catalog itself (SIMBAD `sp_type`) counts as one more vote,
//! see [`ClassificationAggregator::add_published_type`].
//!
//! ## Ranking
//! -----------------
//! [`ClassificationTally::ranked`] orders labels by count (descending), then by
//! [`taxonomy_ordinal`] (ascending). Labels outside the taxonomy carry the sentinel
//! ordinal `-1` and therefore come **first** among labels with the same count. The
//! label itself is the last key so that the order never depends on hashing.
//!
//! ## Example
//! -----------------
//! ```rust
//! use photclass::classification::{ClassificationAggregator, ClassifierRecord};
//!
//! let mut agg = ClassificationAggregator::new();
//! let rec = ClassifierRecord::new("AllWISE", "M5", "W1-W2", 0.21, 0.21, "J1");
//! assert!(agg.add_occurrence(rec.clone()));
//! assert!(!agg.add_occurrence(rec)); // same signature
//! assert_eq!(agg.tally().count("M5"), 1);
//! ```
pub mod display;

use std::collections::{HashMap, HashSet};

use ahash::RandomState;
use ordered_float::OrderedFloat;
use tracing::debug;

use crate::{
    catalog::CatalogEntry,
    constants::{
        CatalogName, ColorKey, SourceId, AGN_COLOR_KEY, AGN_WARNING, PUBLISHED_TYPE_KEY,
        WD_COLOR_KEY, WD_WARNING,
    },
    lookup::{
        spectral_type::MatchResult,
        taxonomy::{canonical_label, taxonomy_ordinal},
    },
    photometry::anomaly::AnomalyDetector,
};

/// A flattened match used for aggregation and audit display.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifierRecord {
    pub catalog_name: CatalogName,
    pub spt: String,
    pub color_key: ColorKey,
    pub observed: f64,
    pub reference: f64,
    pub source_id: SourceId,
}

type Signature = (ColorKey, OrderedFloat<f64>, String);

impl ClassifierRecord {
    pub fn new(
        catalog_name: impl Into<CatalogName>,
        spt: impl Into<String>,
        color_key: impl Into<ColorKey>,
        observed: f64,
        reference: f64,
        source_id: impl Into<SourceId>,
    ) -> Self {
        ClassifierRecord {
            catalog_name: catalog_name.into(),
            spt: spt.into(),
            color_key: color_key.into(),
            observed,
            reference,
            source_id: source_id.into(),
        }
    }

    /// Record for one match of `entry`.
    pub fn from_match(entry: &CatalogEntry, m: &MatchResult) -> Self {
        ClassifierRecord::new(
            entry.catalog_name.clone(),
            m.spt.clone(),
            m.color_key.clone(),
            m.observed,
            m.reference,
            entry.source_id.clone(),
        )
    }

    fn signature(&self) -> Signature {
        (
            self.color_key.clone(),
            OrderedFloat(self.observed),
            self.spt.clone(),
        )
    }
}

/// One ranked spectral type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedType {
    pub spt: String,
    pub count: usize,
    pub ordinal: i32,
}

/// Spectral type → number of independent matches.
#[derive(Debug, Clone, Default)]
pub struct ClassificationTally {
    counts: HashMap<String, usize, RandomState>,
}

impl ClassificationTally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&mut self, spt: &str) {
        *self.counts.entry(spt.to_string()).or_insert(0) += 1;
    }

    pub fn count(&self, spt: &str) -> usize {
        self.counts.get(spt).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Labels ranked by count (descending), taxonomy ordinal (ascending), then label.
    pub fn ranked(&self) -> Vec<RankedType> {
        let mut ranked: Vec<RankedType> = self
            .counts
            .iter()
            .map(|(spt, &count)| RankedType {
                spt: spt.clone(),
                count,
                ordinal: taxonomy_ordinal(spt),
            })
            .collect();

        ranked.sort_by(|a, b| {
            b.count
                .cmp(&a.count)
                .then(a.ordinal.cmp(&b.ordinal))
                .then_with(|| a.spt.cmp(&b.spt))
        });
        ranked
    }
}

impl FromIterator<(String, usize)> for ClassificationTally {
    fn from_iter<I: IntoIterator<Item = (String, usize)>>(iter: I) -> Self {
        ClassificationTally {
            counts: iter.into_iter().collect(),
        }
    }
}

/// Stateful fold of classifier records for one classification run.
#[derive(Debug, Clone, Default)]
pub struct ClassificationAggregator {
    tally: ClassificationTally,
    audit: Vec<ClassifierRecord>,
    seen: HashSet<Signature, RandomState>,
    exclusions: HashSet<SourceId, RandomState>,
}

impl ClassificationAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Aggregator skipping every record whose source id is in `exclusions`.
    pub fn with_exclusions(exclusions: impl IntoIterator<Item = SourceId>) -> Self {
        ClassificationAggregator {
            exclusions: exclusions.into_iter().collect(),
            ..Default::default()
        }
    }

    pub fn exclude(&mut self, source_id: impl Into<SourceId>) {
        self.exclusions.insert(source_id.into());
    }

    pub fn is_excluded(&self, source_id: &str) -> bool {
        self.exclusions.contains(source_id)
    }

    /// Fold one record into the tally.
    ///
    /// Return
    /// ----------
    /// * `true` if the record was tallied and added to the audit list,
    /// * `false` if it was excluded or its signature was already seen.
    pub fn add_occurrence(&mut self, record: ClassifierRecord) -> bool {
        if self.exclusions.contains(&record.source_id) {
            return false;
        }
        if !self.seen.insert(record.signature()) {
            debug!(spt = %record.spt, color = %record.color_key, observed = record.observed,
                "duplicate match signature discarded");
            return false;
        }

        self.tally.increment(&record.spt);
        self.audit.push(record);
        true
    }

    /// Fold every match of one resolved entry.
    ///
    /// Return
    /// ----------
    /// * The number of records actually tallied.
    pub fn add_matches(&mut self, entry: &CatalogEntry, matches: &[MatchResult]) -> usize {
        matches
            .iter()
            .filter(|m| self.add_occurrence(ClassifierRecord::from_match(entry, m)))
            .count()
    }

    /// Check the anomaly signatures `entry` supports and inject the raised flags.
    ///
    /// Return
    /// ----------
    /// * The flags raised for this entry (whether or not they were new to the tally).
    pub fn add_anomalies(
        &mut self,
        entry: &CatalogEntry,
        detector: &dyn AnomalyDetector,
    ) -> Vec<&'static str> {
        let flags = anomaly_records(entry, detector);
        flags
            .into_iter()
            .map(|(flag, record)| {
                self.add_occurrence(record);
                flag
            })
            .collect()
    }

    /// Tally the spectral type `entry` publishes, when it has one in the taxonomy.
    ///
    /// Return
    /// ----------
    /// * `true` if a record was tallied.
    pub fn add_published_type(&mut self, entry: &CatalogEntry) -> bool {
        published_type_record(entry).is_some_and(|record| self.add_occurrence(record))
    }

    pub fn tally(&self) -> &ClassificationTally {
        &self.tally
    }

    /// Tallied records, in folding order.
    pub fn audit(&self) -> &[ClassifierRecord] {
        &self.audit
    }

    pub fn ranked(&self) -> Vec<RankedType> {
        self.tally.ranked()
    }

    /// Top-ranked label, if anything was tallied.
    pub fn best(&self) -> Option<RankedType> {
        self.ranked().into_iter().next()
    }

    /// Clear the tally, audit list and seen signatures; exclusions are kept.
    pub fn reset(&mut self) {
        self.tally = ClassificationTally::default();
        self.audit.clear();
        self.seen.clear();
    }
}

/// Record for the spectral type published by `entry`, reduced to class and subtype.
///
/// The record's observed and reference values are the taxonomy ordinal of the label.
pub fn published_type_record(entry: &CatalogEntry) -> Option<ClassifierRecord> {
    if !entry.capabilities().has_simbad_type {
        return None;
    }
    let spt = canonical_label(entry.extension.spectral_type.as_deref()?)?;
    let ordinal = f64::from(taxonomy_ordinal(&spt));
    Some(ClassifierRecord::new(
        entry.catalog_name.clone(),
        spt,
        PUBLISHED_TYPE_KEY,
        ordinal,
        ordinal,
        entry.source_id.clone(),
    ))
}

/// Anomaly flags raised by `entry`, each with the record that represents it in a tally.
pub fn anomaly_records(
    entry: &CatalogEntry,
    detector: &dyn AnomalyDetector,
) -> Vec<(&'static str, ClassifierRecord)> {
    let caps = entry.capabilities();
    let mut flags = Vec::new();

    if caps.has_agn_colors {
        if let (Some(w1_w2), Some(w2_w3)) = (entry.w1_w2(), entry.w2_w3()) {
            if detector.is_possible_agn(w1_w2, w2_w3) {
                flags.push((
                    AGN_WARNING,
                    ClassifierRecord::new(
                        entry.catalog_name.clone(),
                        AGN_WARNING,
                        AGN_COLOR_KEY,
                        w1_w2,
                        w2_w3,
                        entry.source_id.clone(),
                    ),
                ));
            }
        }
    }

    if caps.has_wd_colors {
        if let (Some(abs_g), Some(bp_rp)) = (entry.abs_g(), entry.bp_rp()) {
            if detector.is_possible_wd(abs_g, bp_rp) {
                flags.push((
                    WD_WARNING,
                    ClassifierRecord::new(
                        entry.catalog_name.clone(),
                        WD_WARNING,
                        WD_COLOR_KEY,
                        abs_g,
                        bp_rp,
                        entry.source_id.clone(),
                    ),
                ));
            }
        }
    }

    flags
}

#[cfg(test)]
mod classification_test {
    use super::*;
    use crate::{catalog::EntryExtension, photometry::anomaly::PhotometricAnomalies};

    #[test]
    fn test_duplicate_signature_counted_once() {
        let mut agg = ClassificationAggregator::new();
        let a = ClassifierRecord::new("AllWISE", "M5", "W1-W2", 0.21, 0.21, "A");
        let b = ClassifierRecord::new("CatWISE", "M5", "W1-W2", 0.21, 0.21, "B");
        assert!(agg.add_occurrence(a));
        assert!(!agg.add_occurrence(b));
        assert_eq!(agg.tally().count("M5"), 1);
        assert_eq!(agg.audit().len(), 1);

        // same color and type, other value: independent
        let c = ClassifierRecord::new("CatWISE", "M5", "W1-W2", 0.22, 0.21, "B");
        assert!(agg.add_occurrence(c));
        assert_eq!(agg.tally().count("M5"), 2);
    }

    #[test]
    fn test_exclusions_skip_before_signature() {
        let mut agg = ClassificationAggregator::with_exclusions(["A".to_string()]);
        let a = ClassifierRecord::new("AllWISE", "M5", "W1-W2", 0.21, 0.21, "A");
        let b = ClassifierRecord::new("CatWISE", "M5", "W1-W2", 0.21, 0.21, "B");
        assert!(!agg.add_occurrence(a));
        // the excluded record did not consume the signature
        assert!(agg.add_occurrence(b));
        assert_eq!(agg.tally().count("M5"), 1);
        assert_eq!(agg.audit()[0].source_id, "B");
    }

    #[test]
    fn test_ranking_by_count_then_taxonomy() {
        let tally: ClassificationTally = [
            ("T1".to_string(), 1),
            ("L2".to_string(), 3),
            ("M5".to_string(), 3),
        ]
        .into_iter()
        .collect();
        let ranked: Vec<String> = tally.ranked().into_iter().map(|r| r.spt).collect();
        assert_eq!(ranked, vec!["M5", "L2", "T1"]);
    }

    #[test]
    fn test_unknown_labels_first_on_ties() {
        let tally: ClassificationTally = [
            ("M5".to_string(), 2),
            (AGN_WARNING.to_string(), 2),
            ("K0".to_string(), 5),
        ]
        .into_iter()
        .collect();
        let ranked = tally.ranked();
        assert_eq!(ranked[0].spt, "K0");
        assert_eq!(ranked[1].spt, AGN_WARNING);
        assert_eq!(ranked[1].ordinal, -1);
        assert_eq!(ranked[2].spt, "M5");
    }

    #[test]
    fn test_anomaly_flags_enter_tally() {
        let detector = PhotometricAnomalies;
        let quasar = CatalogEntry::new("AllWISE", "QSO", 1.0, 1.0).with_extension(EntryExtension {
            w1_w2: Some(1.1),
            w2_w3: Some(3.0),
            ..Default::default()
        });
        let mut agg = ClassificationAggregator::new();
        assert_eq!(agg.add_anomalies(&quasar, &detector), vec![AGN_WARNING]);
        // a second report of the same colors is not counted twice
        assert_eq!(agg.add_anomalies(&quasar, &detector), vec![AGN_WARNING]);
        assert_eq!(agg.tally().count(AGN_WARNING), 1);
        assert_eq!(agg.best().unwrap().spt, AGN_WARNING);

        let wd = CatalogEntry::new("Gaia", "WD", 1.0, 1.0).with_extension(EntryExtension {
            abs_g: Some(12.0),
            bp_rp: Some(0.1),
            ..Default::default()
        });
        assert_eq!(agg.add_anomalies(&wd, &detector), vec![WD_WARNING]);
        assert_eq!(agg.tally().count(WD_WARNING), 1);
    }

    #[test]
    fn test_published_type_counts_as_vote() {
        let simbad = CatalogEntry::new("SIMBAD", "LHS 292", 1.0, 1.0).with_extension(EntryExtension {
            spectral_type: Some("M6.5Ve".into()),
            ..Default::default()
        });
        let record = published_type_record(&simbad).unwrap();
        assert_eq!(record.spt, "M6.5");
        assert_eq!(record.color_key, PUBLISHED_TYPE_KEY);
        assert_eq!(record.observed, 665.0);

        let mut agg = ClassificationAggregator::new();
        assert!(agg.add_published_type(&simbad));
        assert!(!agg.add_published_type(&simbad));
        assert_eq!(agg.tally().count("M6.5"), 1);

        // object type only, or a label outside the taxonomy: nothing to tally
        let otype_only = CatalogEntry::new("SIMBAD", "a", 1.0, 1.0).with_extension(EntryExtension {
            object_type: Some("QSO".into()),
            ..Default::default()
        });
        let white_dwarf = CatalogEntry::new("SIMBAD", "b", 1.0, 1.0).with_extension(EntryExtension {
            spectral_type: Some("DA2".into()),
            ..Default::default()
        });
        assert!(!agg.add_published_type(&otype_only));
        assert!(!agg.add_published_type(&white_dwarf));
        assert_eq!(agg.tally().len(), 1);
    }

    #[test]
    fn test_reset_keeps_exclusions() {
        let mut agg = ClassificationAggregator::new();
        agg.exclude("X");
        agg.add_occurrence(ClassifierRecord::new("c", "M5", "J-K", 0.9, 0.88, "Y"));
        agg.reset();
        assert!(agg.tally().is_empty());
        assert!(agg.audit().is_empty());
        assert!(agg.is_excluded("X"));
        assert!(agg.add_occurrence(ClassifierRecord::new("c", "M5", "J-K", 0.9, 0.88, "Y")));
    }
}
