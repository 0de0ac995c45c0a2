//! # Counterpart selection
//!
//! Given the candidates an [`EntrySource`](crate::catalog::entry_source::EntrySource)
//! returned for a query point, pick the **counterpart**: the candidate closest to the
//! query point.
//!
//! ## Rules
//! -----------------
//! * The metric is the candidate's `target_distance` (arcseconds), already computed by
//!   the entry source.
//! * Ties are broken by input order: the first candidate wins (stable ordering).
//! * An empty candidate list yields `None`, meaning "no counterpart within the radius".
//!   This is a normal outcome, not an error.
//! * A NaN target distance ranks after every finite one.
use itertools::Itertools;
use ordered_float::OrderedFloat;

use crate::catalog::CatalogEntry;

/// Index of the candidate with the smallest target distance, first one on ties.
fn best_index(candidates: &[CatalogEntry]) -> Option<usize> {
    candidates
        .iter()
        .position_min_by_key(|c| OrderedFloat(c.target_distance))
}

/// Borrow the candidate with the smallest target distance.
///
/// Arguments
/// -----------------
/// * `candidates`: entries returned for one query point, in source order.
///
/// Return
/// ----------
/// * `Some(&entry)` – the closest candidate (first one on ties).
/// * `None` – if `candidates` is empty.
pub fn best_candidate(candidates: &[CatalogEntry]) -> Option<&CatalogEntry> {
    best_index(candidates).map(|i| &candidates[i])
}

/// Take ownership of the best counterpart among `candidates`.
///
/// See also
/// ------------
/// * [`best_candidate`] – Borrowing variant with the same selection rule.
pub fn select_best(candidates: Vec<CatalogEntry>) -> Option<CatalogEntry> {
    let index = best_index(&candidates)?;
    candidates.into_iter().nth(index)
}
