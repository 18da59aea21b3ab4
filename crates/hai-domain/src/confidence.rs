//! Ordered confidence levels shared by every criteria engine.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Confidence attached to a classification decision.
///
/// Ordering is meaningful: `Insufficient < Possible < Probable < Definite`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLevel {
    #[default]
    Insufficient,
    Possible,
    Probable,
    Definite,
}

impl ConfidenceLevel {
    /// Map a numeric confidence in `[0, 1]` onto a level.
    ///
    /// Returns `None` for NaN or out-of-range scores.
    pub fn from_score(score: f64) -> Option<Self> {
        if !(0.0..=1.0).contains(&score) {
            return None;
        }
        Some(if score >= 0.9 {
            Self::Definite
        } else if score >= 0.7 {
            Self::Probable
        } else if score >= 0.4 {
            Self::Possible
        } else {
            Self::Insufficient
        })
    }

    /// Lower bound of the score band this level covers.
    pub fn score(self) -> f64 {
        match self {
            Self::Insufficient => 0.0,
            Self::Possible => 0.4,
            Self::Probable => 0.7,
            Self::Definite => 0.9,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Insufficient => "insufficient",
            Self::Possible => "possible",
            Self::Probable => "probable",
            Self::Definite => "definite",
        }
    }
}

impl std::fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConfidenceLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "insufficient" | "none" => Ok(Self::Insufficient),
            "possible" | "low" => Ok(Self::Possible),
            "probable" | "medium" => Ok(Self::Probable),
            "definite" | "high" => Ok(Self::Definite),
            other => Err(format!("unknown confidence level: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering() {
        assert!(ConfidenceLevel::Insufficient < ConfidenceLevel::Possible);
        assert!(ConfidenceLevel::Possible < ConfidenceLevel::Probable);
        assert!(ConfidenceLevel::Probable < ConfidenceLevel::Definite);
    }

    #[test]
    fn test_from_score_bands() {
        assert_eq!(ConfidenceLevel::from_score(0.95), Some(ConfidenceLevel::Definite));
        assert_eq!(ConfidenceLevel::from_score(0.9), Some(ConfidenceLevel::Definite));
        assert_eq!(ConfidenceLevel::from_score(0.75), Some(ConfidenceLevel::Probable));
        assert_eq!(ConfidenceLevel::from_score(0.4), Some(ConfidenceLevel::Possible));
        assert_eq!(ConfidenceLevel::from_score(0.1), Some(ConfidenceLevel::Insufficient));
    }

    #[test]
    fn test_from_score_rejects_out_of_range() {
        assert_eq!(ConfidenceLevel::from_score(1.2), None);
        assert_eq!(ConfidenceLevel::from_score(-0.1), None);
        assert_eq!(ConfidenceLevel::from_score(f64::NAN), None);
    }

    #[test]
    fn test_score_round_trips_through_bands() {
        for level in [
            ConfidenceLevel::Insufficient,
            ConfidenceLevel::Possible,
            ConfidenceLevel::Probable,
            ConfidenceLevel::Definite,
        ] {
            assert_eq!(ConfidenceLevel::from_score(level.score()), Some(level));
        }
    }

    #[test]
    fn test_parse_categorical() {
        assert_eq!("Probable".parse::<ConfidenceLevel>(), Ok(ConfidenceLevel::Probable));
        assert_eq!("high".parse::<ConfidenceLevel>(), Ok(ConfidenceLevel::Definite));
        assert!("certain".parse::<ConfidenceLevel>().is_err());
    }
}
