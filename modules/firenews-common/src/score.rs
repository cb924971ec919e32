//! FIRE score codec.
//!
//! The integer score (0 = most unreliable, 100 = most reliable) is the only
//! value ever persisted. Label, confidence and risk category are derived from
//! it on every read, so they cannot drift out of sync with the stored score.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::FireError;

/// Single decision boundary between "fake" and "real".
pub const REAL_THRESHOLD: i64 = 50;

/// Lower bound of the "Unverified" band.
pub const UNVERIFIED_THRESHOLD: i64 = 35;

pub const MIN_SCORE: i64 = 0;
pub const MAX_SCORE: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Label {
    Real,
    Fake,
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Real => write!(f, "real"),
            Label::Fake => write!(f, "fake"),
        }
    }
}

impl FromStr for Label {
    type Err = FireError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "real" => Ok(Label::Real),
            "fake" => Ok(Label::Fake),
            other => Err(FireError::Validation(format!(
                "label must be \"real\" or \"fake\", got {other:?}"
            ))),
        }
    }
}

/// Three-band risk descriptor shown next to a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskCategory {
    #[serde(rename = "No risk detected")]
    NoRisk,
    #[serde(rename = "Unverified")]
    Unverified,
    #[serde(rename = "Likely misleading")]
    LikelyMisleading,
}

impl fmt::Display for RiskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskCategory::NoRisk => write!(f, "No risk detected"),
            RiskCategory::Unverified => write!(f, "Unverified"),
            RiskCategory::LikelyMisleading => write!(f, "Likely misleading"),
        }
    }
}

pub fn derive_label(score: i64) -> Label {
    if score >= REAL_THRESHOLD {
        Label::Real
    } else {
        Label::Fake
    }
}

pub fn derive_category(score: i64) -> RiskCategory {
    if score >= REAL_THRESHOLD {
        RiskCategory::NoRisk
    } else if score >= UNVERIFIED_THRESHOLD {
        RiskCategory::Unverified
    } else {
        RiskCategory::LikelyMisleading
    }
}

/// Confidence recovered from the score alone. Inverse of [`compose_score`]
/// up to integer truncation; the predictor's own confidence is not stored.
pub fn derive_confidence(score: i64) -> f64 {
    if score >= REAL_THRESHOLD {
        (score - REAL_THRESHOLD) as f64 / 50.0
    } else {
        (REAL_THRESHOLD - score) as f64 / 50.0
    }
}

/// Build a score from a label and a confidence in `[0, 1]`.
///
/// `real` lands in `[50, 100]`, `fake` in `[0, 50]`; both truncate toward
/// zero after scaling. An offset within 1e-9 of a whole number is
/// taken as that number, so `0.56` scales to exactly 28.
pub fn compose_score(label: Label, confidence: f64) -> Result<i64, FireError> {
    if !(0.0..=1.0).contains(&confidence) {
        return Err(FireError::Validation(format!(
            "confidence must be between 0 and 1, got {confidence}"
        )));
    }
    let offset = snap(confidence * 50.0);
    let score = match label {
        Label::Real => (REAL_THRESHOLD as f64 + offset).floor(),
        Label::Fake => (REAL_THRESHOLD as f64 - offset).floor(),
    };
    Ok(score as i64)
}

const SNAP_EPSILON: f64 = 1e-9;

fn snap(value: f64) -> f64 {
    let nearest = value.round();
    if (value - nearest).abs() < SNAP_EPSILON {
        nearest
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_flips_exactly_at_fifty() {
        for s in MIN_SCORE..=MAX_SCORE {
            assert_eq!(derive_label(s) == Label::Real, s >= 50, "score {s}");
        }
    }

    #[test]
    fn every_score_lands_in_one_band() {
        for s in MIN_SCORE..=MAX_SCORE {
            let expected = if s >= 50 {
                RiskCategory::NoRisk
            } else if s >= 35 {
                RiskCategory::Unverified
            } else {
                RiskCategory::LikelyMisleading
            };
            assert_eq!(derive_category(s), expected, "score {s}");
        }
    }

    #[test]
    fn band_boundaries() {
        assert_eq!(derive_category(50), RiskCategory::NoRisk);
        assert_eq!(derive_category(49), RiskCategory::Unverified);
        assert_eq!(derive_category(35), RiskCategory::Unverified);
        assert_eq!(derive_category(34), RiskCategory::LikelyMisleading);
    }

    #[test]
    fn fifty_is_real_with_zero_confidence() {
        assert_eq!(derive_label(50), Label::Real);
        assert_eq!(derive_category(50).to_string(), "No risk detected");
        assert_eq!(derive_confidence(50), 0.0);
        assert_eq!(compose_score(Label::Real, 0.0).unwrap(), 50);
        assert_eq!(compose_score(Label::Fake, 0.0).unwrap(), 50);
    }

    #[test]
    fn real_point_six_round_trips() {
        let score = compose_score(Label::Real, 0.6).unwrap();
        assert_eq!(score, 80);
        assert_eq!(derive_label(score), Label::Real);
        assert!((derive_confidence(score) - 0.6).abs() < 1e-9);
    }

    #[test]
    fn fake_full_confidence_round_trips() {
        let score = compose_score(Label::Fake, 1.0).unwrap();
        assert_eq!(score, 0);
        assert_eq!(derive_label(score), Label::Fake);
        assert_eq!(derive_confidence(score), 1.0);
    }

    #[test]
    fn compose_truncates() {
        // 50 + 0.333 * 50 = 66.65
        assert_eq!(compose_score(Label::Real, 0.333).unwrap(), 66);
        // 50 - 0.333 * 50 = 33.35
        assert_eq!(compose_score(Label::Fake, 0.333).unwrap(), 33);
        // 0.56 * 50 is 28.000000000000004 in binary floating point
        assert_eq!(compose_score(Label::Fake, 0.56).unwrap(), 22);
        assert_eq!(compose_score(Label::Real, 0.56).unwrap(), 78);
        assert_eq!(compose_score(Label::Real, 0.58).unwrap(), 79);
        assert_eq!(compose_score(Label::Fake, 0.58).unwrap(), 21);
    }

    #[test]
    fn compose_rejects_out_of_range_confidence() {
        assert!(matches!(
            compose_score(Label::Real, 1.01),
            Err(FireError::Validation(_))
        ));
        assert!(matches!(
            compose_score(Label::Fake, -0.1),
            Err(FireError::Validation(_))
        ));
        assert!(matches!(
            compose_score(Label::Fake, f64::NAN),
            Err(FireError::Validation(_))
        ));
    }

    #[test]
    fn label_parses_wire_values() {
        assert_eq!("real".parse::<Label>().unwrap(), Label::Real);
        assert_eq!(" FAKE ".parse::<Label>().unwrap(), Label::Fake);
        assert!("maybe".parse::<Label>().is_err());
    }

    #[test]
    fn category_serializes_to_display_string() {
        let json = serde_json::to_string(&RiskCategory::LikelyMisleading).unwrap();
        assert_eq!(json, "\"Likely misleading\"");
    }
}
