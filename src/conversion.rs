//! Coordinate parsing, angular separation and distance-modulus helpers.
use nalgebra::Vector3;

use crate::{
    constants::{ArcSec, Degree, Magnitude, Parsec, ARCSEC_PER_DEG, RADEG},
    photclass_errors::PhotClassError,
};

/// Parse a right ascension string in the sexagesimal format `HH MM SS.SS` to degrees.
///
/// Arguments
/// ---------
/// * `ra`: a string representing the right ascension, whitespace or colon separated
///
/// Returns
/// -------
/// * `Option<Degree>`: the right ascension in degrees, or `None` if the format is invalid.
pub(crate) fn parse_ra_to_deg(ra: &str) -> Option<Degree> {
    let parts: Vec<&str> = ra.split(|c: char| c.is_whitespace() || c == ':').collect();
    let parts: Vec<&str> = parts.into_iter().filter(|p| !p.is_empty()).collect();
    if parts.len() != 3 {
        return None;
    }

    let h: f64 = parts[0].parse().ok()?;
    let m: f64 = parts[1].parse().ok()?;
    let s: f64 = parts[2].parse().ok()?;

    Some((h + m / 60.0 + s / 3600.0) * 15.0)
}

/// Parse a declination string in the sexagesimal format `±DD MM SS.SS` to degrees.
///
/// Arguments
/// ---------
/// * `dec`: a string representing the declination, whitespace or colon separated
///
/// Returns
/// -------
/// * `Option<Degree>`: the declination in degrees, or `None` if the format is invalid.
pub(crate) fn parse_dec_to_deg(dec: &str) -> Option<Degree> {
    let parts: Vec<&str> = dec.split(|c: char| c.is_whitespace() || c == ':').collect();
    let parts: Vec<&str> = parts.into_iter().filter(|p| !p.is_empty()).collect();
    if parts.len() != 3 {
        return None;
    }

    let sign = if parts[0].starts_with('-') { -1.0 } else { 1.0 };
    let d: f64 = parts[0].trim_start_matches(&['-', '+'][..]).parse().ok()?;
    let m: f64 = parts[1].parse().ok()?;
    let s: f64 = parts[2].parse().ok()?;

    Some(sign * (d + m / 60.0 + s / 3600.0))
}

/// Parse a right ascension given either in decimal degrees or in sexagesimal hours.
///
/// The value must lie in `[0, 360)`.
pub fn parse_ra(input: &str) -> Result<Degree, PhotClassError> {
    let trimmed = input.trim();
    let ra = trimmed
        .parse::<f64>()
        .ok()
        .or_else(|| parse_ra_to_deg(trimmed))
        .ok_or_else(|| PhotClassError::InvalidCoordinate(format!("RA '{trimmed}' is not numeric")))?;
    check_ra(ra)
}

/// Parse a declination given either in decimal degrees or in sexagesimal degrees.
///
/// The value must lie in `[-90, 90]`.
pub fn parse_dec(input: &str) -> Result<Degree, PhotClassError> {
    let trimmed = input.trim();
    let dec = trimmed
        .parse::<f64>()
        .ok()
        .or_else(|| parse_dec_to_deg(trimmed))
        .ok_or_else(|| {
            PhotClassError::InvalidCoordinate(format!("Dec '{trimmed}' is not numeric"))
        })?;
    check_dec(dec)
}

pub(crate) fn check_ra(ra: Degree) -> Result<Degree, PhotClassError> {
    if ra.is_finite() && (0.0..360.0).contains(&ra) {
        Ok(ra)
    } else {
        Err(PhotClassError::InvalidCoordinate(format!(
            "RA {ra} outside [0, 360)"
        )))
    }
}

pub(crate) fn check_dec(dec: Degree) -> Result<Degree, PhotClassError> {
    if dec.is_finite() && (-90.0..=90.0).contains(&dec) {
        Ok(dec)
    } else {
        Err(PhotClassError::InvalidCoordinate(format!(
            "Dec {dec} outside [-90, 90]"
        )))
    }
}

/// Unit vector on the celestial sphere for an equatorial position given in degrees.
#[inline]
fn unit_vector(ra: Degree, dec: Degree) -> Vector3<f64> {
    let (sin_ra, cos_ra) = (ra * RADEG).sin_cos();
    let (sin_dec, cos_dec) = (dec * RADEG).sin_cos();
    Vector3::new(cos_dec * cos_ra, cos_dec * sin_ra, sin_dec)
}

/// Angular separation between two equatorial positions.
///
/// Uses `atan2(|a × b|, a · b)` on the unit vectors, which stays accurate both for
/// sub-arcsecond separations and for nearly antipodal points.
///
/// Arguments
/// -----------------
/// * `ra1`, `dec1`: first position in degrees.
/// * `ra2`, `dec2`: second position in degrees.
///
/// Return
/// ----------
/// * The separation in **arcseconds**, always `>= 0`.
pub fn angular_separation(ra1: Degree, dec1: Degree, ra2: Degree, dec2: Degree) -> ArcSec {
    let a = unit_vector(ra1, dec1);
    let b = unit_vector(ra2, dec2);
    let sep_rad = a.cross(&b).norm().atan2(a.dot(&b));
    sep_rad.abs() / RADEG * ARCSEC_PER_DEG
}

/// Distance from the distance modulus: `d = 10^((m - M + 5) / 5)` parsecs.
#[inline]
pub fn distance_from_modulus(apparent: Magnitude, absolute: Magnitude) -> Parsec {
    10f64.powf((apparent - absolute + 5.0) / 5.0)
}

/// Propagate a 1-σ uncertainty on the absolute magnitude to the distance.
///
/// From `∂d/∂M = -d · ln(10) / 5`.
#[inline]
pub fn distance_error(distance: Parsec, sigma_absolute: Magnitude) -> Parsec {
    distance * std::f64::consts::LN_10 / 5.0 * sigma_absolute.abs()
}

/// Absolute magnitude from an apparent magnitude and a parallax in milliarcseconds.
///
/// Returns `None` for non-positive parallaxes.
pub fn absolute_magnitude(apparent: Magnitude, parallax_mas: f64) -> Option<Magnitude> {
    if parallax_mas > 0.0 && parallax_mas.is_finite() {
        Some(apparent + 5.0 * (parallax_mas / 100.0).log10())
    } else {
        None
    }
}

#[cfg(test)]
mod conversion_test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_ra_to_deg() {
        assert_relative_eq!(
            parse_ra_to_deg("22 52 23.37").unwrap(),
            343.097375,
            epsilon = 1e-9
        );
        assert_relative_eq!(
            parse_ra_to_deg("00:42:44.3").unwrap(),
            10.684583333333332,
            epsilon = 1e-9
        );
        assert_eq!(parse_ra_to_deg("1 2 3.4.5"), None);
        assert_eq!(parse_ra_to_deg("1 2"), None);
    }

    #[test]
    fn test_dec_to_deg() {
        assert_relative_eq!(
            parse_dec_to_deg("-00 30 14.2").unwrap(),
            -0.5039444444444444,
            epsilon = 1e-9
        );
        assert_relative_eq!(
            parse_dec_to_deg("+41:16:09").unwrap(),
            41.26916666666667,
            epsilon = 1e-9
        );
        assert_eq!(parse_dec_to_deg("89 15"), None);
    }

    #[test]
    fn test_parse_coordinates() {
        assert_eq!(parse_ra("10.684").unwrap(), 10.684);
        assert_eq!(parse_dec(" 41.269 ").unwrap(), 41.269);
        assert!(matches!(
            parse_ra("abc"),
            Err(PhotClassError::InvalidCoordinate(_))
        ));
        assert!(parse_ra("360.0").is_err());
        assert!(parse_dec("-90.5").is_err());
        assert!(parse_dec("NaN").is_err());
    }

    #[test]
    fn test_angular_separation() {
        assert_eq!(angular_separation(10.0, 20.0, 10.0, 20.0), 0.0);
        assert_relative_eq!(
            angular_separation(10.0, 0.0, 10.0, 1.0 / 3600.0),
            1.0,
            epsilon = 1e-6
        );
        assert_relative_eq!(
            angular_separation(0.0, 0.0, 180.0, 0.0),
            180.0 * 3600.0,
            epsilon = 1e-6
        );
        // RA offsets shrink with cos(dec)
        assert_relative_eq!(
            angular_separation(0.0, 60.0, 2.0 / 3600.0, 60.0),
            1.0,
            epsilon = 1e-4
        );
    }

    #[test]
    fn test_distance_modulus() {
        assert_relative_eq!(distance_from_modulus(15.0, 10.0), 100.0, epsilon = 1e-9);
        assert_relative_eq!(distance_from_modulus(10.0, 10.0), 10.0, epsilon = 1e-12);
        assert_relative_eq!(
            distance_error(100.0, 0.1),
            100.0 * std::f64::consts::LN_10 / 50.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_absolute_magnitude() {
        assert_relative_eq!(absolute_magnitude(10.0, 100.0).unwrap(), 10.0, epsilon = 1e-12);
        assert_relative_eq!(absolute_magnitude(15.0, 10.0).unwrap(), 10.0, epsilon = 1e-12);
        assert_eq!(absolute_magnitude(15.0, 0.0), None);
        assert_eq!(absolute_magnitude(15.0, -1.2), None);
    }
}
