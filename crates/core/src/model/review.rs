use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{CardId, CollectionId};

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

/// Rejected review input. Raised before any scheduling field is touched.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ReviewError {
    #[error("review score must be between 0 and 5, got {0}")]
    InvalidScore(i64),

    #[error("review score must be a whole number, got {0:?}")]
    MalformedScore(String),

    #[error("review score is required")]
    MissingScore,
}

//
// ─── REVIEW SCORE ─────────────────────────────────────────────────────────────
//

/// Self-assessed recall quality on the six-point SM-2 scale.
///
/// - `0..=2`: a miss. The streak resets and the card comes back today.
/// - `3`: a marginal pass. Ease is adjusted but the card still comes back today.
/// - `4..=5`: a pass that lengthens the review interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct ReviewScore(u8);

impl ReviewScore {
    pub const MIN: u8 = 0;
    pub const MAX: u8 = 5;

    /// Validates a raw score.
    ///
    /// # Errors
    ///
    /// Returns `ReviewError::InvalidScore` if the value is outside `0..=5`.
    pub fn new(value: i64) -> Result<Self, ReviewError> {
        match u8::try_from(value) {
            Ok(v) if v <= Self::MAX => Ok(Self(v)),
            _ => Err(ReviewError::InvalidScore(value)),
        }
    }

    #[must_use]
    pub fn value(self) -> u8 {
        self.0
    }

    /// Scores above 2 count as a pass when adjusting the ease factor.
    #[must_use]
    pub fn is_pass(self) -> bool {
        self.0 > 2
    }

    /// Scores of 4 and 5 push the next review into the future.
    #[must_use]
    pub fn lengthens_interval(self) -> bool {
        self.0 >= 4
    }
}

impl TryFrom<i64> for ReviewScore {
    type Error = ReviewError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<u8> for ReviewScore {
    type Error = ReviewError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(i64::from(value))
    }
}

impl From<ReviewScore> for i64 {
    fn from(score: ReviewScore) -> Self {
        i64::from(score.0)
    }
}

impl FromStr for ReviewScore {
    type Err = ReviewError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ReviewError::MissingScore);
        }
        let value: i64 = trimmed
            .parse()
            .map_err(|_| ReviewError::MalformedScore(trimmed.to_owned()))?;
        Self::new(value)
    }
}

impl fmt::Display for ReviewScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

//
// ─── REVIEW OUTCOME ───────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewOutcome {
    Pass,
    Miss,
}

impl ReviewOutcome {
    #[must_use]
    pub fn from_score(score: ReviewScore) -> Self {
        if score.is_pass() { Self::Pass } else { Self::Miss }
    }
}

//
// ─── REVIEW LOG ───────────────────────────────────────────────────────────────
//

/// Record of a single scored review, persisted alongside the card update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewLog {
    pub card_id: CardId,
    pub collection_id: CollectionId,
    pub score: ReviewScore,
    pub reviewed_on: NaiveDate,
    pub next_review: NaiveDate,
    pub efactor: f64,
    pub consecutive_correct: u32,
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_the_full_range() {
        for raw in 0..=5 {
            assert_eq!(ReviewScore::new(raw).unwrap().value(), raw as u8);
        }
    }

    #[test]
    fn rejects_out_of_range_values() {
        assert_eq!(ReviewScore::new(-1), Err(ReviewError::InvalidScore(-1)));
        assert_eq!(ReviewScore::new(6), Err(ReviewError::InvalidScore(6)));
        assert_eq!(
            ReviewScore::new(i64::MAX),
            Err(ReviewError::InvalidScore(i64::MAX))
        );
        assert!(ReviewScore::try_from(200_u8).is_err());
    }

    #[test]
    fn parses_from_text() {
        assert_eq!(" 4 ".parse::<ReviewScore>().unwrap().value(), 4);
        assert_eq!("".parse::<ReviewScore>(), Err(ReviewError::MissingScore));
        assert_eq!(
            "3.5".parse::<ReviewScore>(),
            Err(ReviewError::MalformedScore("3.5".into()))
        );
        assert_eq!("9".parse::<ReviewScore>(), Err(ReviewError::InvalidScore(9)));
    }

    #[test]
    fn pass_and_interval_thresholds_differ() {
        let three = ReviewScore::new(3).unwrap();
        assert!(three.is_pass());
        assert!(!three.lengthens_interval());

        let two = ReviewScore::new(2).unwrap();
        assert_eq!(ReviewOutcome::from_score(two), ReviewOutcome::Miss);
        assert!(ReviewScore::new(4).unwrap().lengthens_interval());
    }

    #[test]
    fn deserializing_rejects_invalid_scores() {
        assert!(serde_json::from_str::<ReviewScore>("5").is_ok());
        assert!(serde_json::from_str::<ReviewScore>("7").is_err());
    }
}
