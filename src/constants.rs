//! # Constants and type definitions for photclass
//!
//! This module centralizes the **unit conversions**, **engine limits**, and **common type
//! definitions** used throughout the `photclass` library.
//!
//! ## Overview
//!
//! - Unit conversions (degrees ↔ radians, arcseconds ↔ degrees)
//! - Limits enforced on user input (search radius, batch size)
//! - Core type aliases used across the crate
//! - Labels of the anomaly flags injected in the classification tally
//!
//! These definitions are used by all main modules, including the cross-match selector,
//! the lookup matchers, and the batch pipeline.

// -------------------------------------------------------------------------------------------------
// Unit conversions
// -------------------------------------------------------------------------------------------------

/// Degrees → radians
pub const RADEG: f64 = std::f64::consts::PI / 180.0;

/// Arcseconds per degree
pub const ARCSEC_PER_DEG: f64 = 3600.0;

// -------------------------------------------------------------------------------------------------
// Engine limits
// -------------------------------------------------------------------------------------------------

/// Largest search radius accepted for a cone query (arcseconds).
pub const MAX_SEARCH_RADIUS: ArcSec = 300.0;

/// Default search radius for a cone query (arcseconds).
pub const DEFAULT_SEARCH_RADIUS: ArcSec = 5.0;

/// Default ceiling on the number of rows accepted by a batch run.
pub const MAX_BATCH_ROWS: usize = 50_000;

/// Default cone radius handed to the extinction collaborator (arcminutes).
pub const DEFAULT_EXTINCTION_CONE: ArcMin = 2.0;

// -------------------------------------------------------------------------------------------------
// Type aliases
// -------------------------------------------------------------------------------------------------

/// Angle in degrees
pub type Degree = f64;
/// Angle in arcseconds
pub type ArcSec = f64;
/// Angle in arcminutes
pub type ArcMin = f64;
/// Distance in parsecs
pub type Parsec = f64;
/// Magnitude (apparent or absolute)
pub type Magnitude = f64;
/// Photometric band name (e.g. `"G"`, `"W1"`)
pub type BandKey = String;
/// Color index name (e.g. `"W1-W2"`)
pub type ColorKey = String;
/// Name of an external catalog (e.g. `"AllWISE"`)
pub type CatalogName = String;
/// Source identifier inside a catalog
pub type SourceId = String;

// -------------------------------------------------------------------------------------------------
// Anomaly flags
// -------------------------------------------------------------------------------------------------

/// Pseudo spectral-type label injected when the WISE colors match an AGN signature.
pub const AGN_WARNING: &str = "AGN?";

/// Pseudo spectral-type label injected when the Gaia photometry matches a white dwarf.
pub const WD_WARNING: &str = "WD?";

/// Color key under which the AGN flag is recorded in the audit list.
pub const AGN_COLOR_KEY: &str = "W1-W2/W2-W3";

/// Color key under which the white-dwarf flag is recorded in the audit list.
pub const WD_COLOR_KEY: &str = "M_G/BP-RP";

/// Key under which a spectral type published by the catalog is recorded.
pub const PUBLISHED_TYPE_KEY: &str = "sp_type";
