//! Fixed ordering of spectral-type labels.
//!
//! The ordinal is used as the secondary key when ranking a classification tally:
//! `O0 < … < O9.5 < B0 < … < M9 < L0 < … < T9 < Y0 < …`. Luminosity-class suffixes
//! (`"M5V"`, `"K2III"`) are ignored. Labels outside the taxonomy, including the
//! anomaly pseudo-labels, get [`UNKNOWN_ORDINAL`].
use once_cell::sync::Lazy;
use regex::Regex;

/// Ordinal of labels that are not part of the taxonomy.
pub const UNKNOWN_ORDINAL: i32 = -1;

/// Spectral classes in temperature order.
const CLASSES: [char; 10] = ['O', 'B', 'A', 'F', 'G', 'K', 'M', 'L', 'T', 'Y'];

static SPT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([OBAFGKMLTY])\s*(\d+(?:\.\d+)?)").expect("valid spectral type regex")
});

/// Position of `label` in the spectral-type taxonomy.
///
/// The ordinal is `100 × class index + 10 × subtype` (half subtypes keep their
/// own slot), so `M5 → 650`, `L2 → 720`, `T1 → 810`.
///
/// Return
/// ----------
/// * The ordinal, or [`UNKNOWN_ORDINAL`] if the label cannot be parsed or its subtype
///   is 10 or more.
pub fn taxonomy_ordinal(label: &str) -> i32 {
    parse(label)
        .map(|(class, subtype, _)| class as i32 * 100 + (subtype * 10.0).round() as i32)
        .unwrap_or(UNKNOWN_ORDINAL)
}

/// Class and subtype of `label`, without luminosity class or peculiarity suffixes
/// (`"M5.5Ve" → "M5.5"`).
pub fn canonical_label(label: &str) -> Option<String> {
    parse(label).map(|(_, _, canonical)| canonical)
}

fn parse(label: &str) -> Option<(usize, f64, String)> {
    let caps = SPT_REGEX.captures(label)?;
    let letter = caps.get(1)?.as_str();
    let digits = caps.get(2)?.as_str();

    let class = CLASSES.iter().position(|k| letter.starts_with(*k))?;
    let subtype = digits.parse::<f64>().ok().filter(|s| *s < 10.0)?;
    Some((class, subtype, format!("{letter}{digits}")))
}

/// True if `label` belongs to the taxonomy.
pub fn is_known_type(label: &str) -> bool {
    taxonomy_ordinal(label) != UNKNOWN_ORDINAL
}

#[cfg(test)]
mod taxonomy_test {
    use super::*;

    #[test]
    fn test_ordinals() {
        assert_eq!(taxonomy_ordinal("O0"), 0);
        assert_eq!(taxonomy_ordinal("M5"), 650);
        assert_eq!(taxonomy_ordinal("M5V"), 650);
        assert_eq!(taxonomy_ordinal("L2"), 720);
        assert_eq!(taxonomy_ordinal("T1"), 810);
        assert_eq!(taxonomy_ordinal("K2.5III"), 525);
        assert!(taxonomy_ordinal("M5") < taxonomy_ordinal("L2"));
        assert!(taxonomy_ordinal("L2") < taxonomy_ordinal("T1"));
    }

    #[test]
    fn test_two_digit_subtype_is_not_truncated() {
        assert_eq!(taxonomy_ordinal("T10"), UNKNOWN_ORDINAL);
        assert_ne!(taxonomy_ordinal("T10"), taxonomy_ordinal("T1"));
        assert_eq!(taxonomy_ordinal("M9.5"), 695);
        assert!(!is_known_type("L12"));
    }

    #[test]
    fn test_canonical_label() {
        assert_eq!(canonical_label("M5V").as_deref(), Some("M5"));
        assert_eq!(canonical_label(" K2.5III").as_deref(), Some("K2.5"));
        assert_eq!(canonical_label("DA"), None);
        assert_eq!(canonical_label("T10"), None);
    }

    #[test]
    fn test_unknown_labels() {
        assert_eq!(taxonomy_ordinal("AGN?"), UNKNOWN_ORDINAL);
        assert_eq!(taxonomy_ordinal("WD?"), UNKNOWN_ORDINAL);
        assert_eq!(taxonomy_ordinal(""), UNKNOWN_ORDINAL);
        assert_eq!(taxonomy_ordinal("M"), UNKNOWN_ORDINAL);
        assert!(!is_known_type("DA"));
        assert!(is_known_type("G2V"));
    }
}
