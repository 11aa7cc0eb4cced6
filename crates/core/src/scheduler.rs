use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{ReviewError, ReviewOutcome, ReviewScore};

/// Ease factor given to every new card.
pub const INITIAL_EFACTOR: f64 = 2.5;

/// Hard floor for the ease factor.
pub const MIN_EFACTOR: f64 = 1.3;

/// Interval after the first passing review with score >= 4.
const FIRST_INTERVAL_DAYS: u32 = 1;

/// Interval after the second consecutive passing review with score >= 4.
const SECOND_INTERVAL_DAYS: u32 = 6;

// Repeated `+ 0.1` steps leave efactor a hair off its decimal value, which
// must not move an interval by a whole day under floor or ceil.
const ROUNDING_SLACK: f64 = 1e-9;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum SchedulingStateError {
    #[error("efactor must be finite and at least 1.3, got {provided}")]
    InvalidEfactor { provided: f64 },
}

//
// ─── SCHEDULING STATE ──────────────────────────────────────────────────────────
//

/// The scheduling fields of a kanji card.
///
/// This is the only state the scheduler reads or writes. Store it with each
/// card and hand it back to [`Scheduler::score_review`] on the next review.
///
/// # Examples
///
/// ```
/// # use kanji_core::scheduler::SchedulingState;
/// let created_on = chrono::NaiveDate::from_ymd_opt(2024, 4, 1).unwrap();
/// let state = SchedulingState::new(created_on);
/// assert_eq!(state.efactor(), 2.5);
/// assert_eq!(state.next_review(), created_on);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PersistedState")]
pub struct SchedulingState {
    total_reviews: u32,
    consecutive_correct: u32,
    efactor: f64,
    last_reviewed: NaiveDate,
    last_missed: NaiveDate,
    next_review: NaiveDate,
}

/// Wire shape of [`SchedulingState`]; deserializing goes through
/// [`SchedulingState::from_persisted`] so the ease floor always holds.
#[derive(Deserialize)]
struct PersistedState {
    total_reviews: u32,
    consecutive_correct: u32,
    efactor: f64,
    last_reviewed: NaiveDate,
    last_missed: NaiveDate,
    next_review: NaiveDate,
}

impl TryFrom<PersistedState> for SchedulingState {
    type Error = SchedulingStateError;

    fn try_from(raw: PersistedState) -> Result<Self, Self::Error> {
        Self::from_persisted(
            raw.total_reviews,
            raw.consecutive_correct,
            raw.efactor,
            raw.last_reviewed,
            raw.last_missed,
            raw.next_review,
        )
    }
}

impl SchedulingState {
    /// Default state of a freshly created card: due on its creation day.
    #[must_use]
    pub fn new(created_on: NaiveDate) -> Self {
        Self {
            total_reviews: 0,
            consecutive_correct: 0,
            efactor: INITIAL_EFACTOR,
            last_reviewed: created_on,
            last_missed: created_on,
            next_review: created_on,
        }
    }

    /// Rehydrate a state from storage.
    ///
    /// # Errors
    ///
    /// Returns `SchedulingStateError::InvalidEfactor` if `efactor` is below
    /// [`MIN_EFACTOR`] or not finite.
    pub fn from_persisted(
        total_reviews: u32,
        consecutive_correct: u32,
        efactor: f64,
        last_reviewed: NaiveDate,
        last_missed: NaiveDate,
        next_review: NaiveDate,
    ) -> Result<Self, SchedulingStateError> {
        if !efactor.is_finite() || efactor < MIN_EFACTOR {
            return Err(SchedulingStateError::InvalidEfactor { provided: efactor });
        }
        Ok(Self {
            total_reviews,
            consecutive_correct,
            efactor,
            last_reviewed,
            last_missed,
            next_review,
        })
    }

    #[must_use]
    pub fn total_reviews(&self) -> u32 {
        self.total_reviews
    }

    #[must_use]
    pub fn consecutive_correct(&self) -> u32 {
        self.consecutive_correct
    }

    #[must_use]
    pub fn efactor(&self) -> f64 {
        self.efactor
    }

    #[must_use]
    pub fn last_reviewed(&self) -> NaiveDate {
        self.last_reviewed
    }

    #[must_use]
    pub fn last_missed(&self) -> NaiveDate {
        self.last_missed
    }

    #[must_use]
    pub fn next_review(&self) -> NaiveDate {
        self.next_review
    }
}

//
// ─── CONFIG ────────────────────────────────────────────────────────────────────
//

/// How a fractional interval (`(streak - 1) * efactor`) becomes whole days.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntervalRounding {
    /// Drop the fractional day. Adding fractional days to a calendar date
    /// behaves this way, so it is the default.
    #[default]
    Floor,
    /// Round half away from zero.
    Round,
    /// Any fractional day pushes the review one day later.
    Ceil,
}

impl IntervalRounding {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn whole_days(self, days: f64) -> u32 {
        let rounded = match self {
            IntervalRounding::Floor => (days + ROUNDING_SLACK).floor(),
            IntervalRounding::Round => days.round(),
            IntervalRounding::Ceil => (days - ROUNDING_SLACK).ceil(),
        };
        if rounded >= f64::from(u32::MAX) {
            u32::MAX
        } else {
            (rounded.max(1.0)) as u32
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    pub rounding: IntervalRounding,
}

//
// ─── SCHEDULED REVIEW ──────────────────────────────────────────────────────────
//

/// Result of scoring one review: the new state plus what drove it.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledReview {
    pub state: SchedulingState,
    pub score: ReviewScore,
    pub outcome: ReviewOutcome,
    /// Days between `last_reviewed` and `next_review`; 0 when due again today.
    pub interval_days: u32,
}

//
// ─── SCHEDULER ─────────────────────────────────────────────────────────────────
//

/// SM-2 scheduler.
///
/// Pure and stateless apart from its configuration: the same state, score
/// and day always produce the same result.
///
/// # Examples
///
/// ```
/// # use kanji_core::scheduler::{Scheduler, SchedulingState};
/// # use kanji_core::model::ReviewScore;
/// let today = chrono::NaiveDate::from_ymd_opt(2024, 4, 1).unwrap();
/// let scheduler = Scheduler::new();
/// let state = SchedulingState::new(today);
///
/// let reviewed = scheduler.score_review(&state, ReviewScore::new(4)?, today);
/// assert_eq!(reviewed.state.consecutive_correct(), 1);
/// assert_eq!(reviewed.interval_days, 1);
/// # Ok::<(), kanji_core::model::ReviewError>(())
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct Scheduler {
    config: SchedulerConfig,
}

impl Scheduler {
    /// Create a scheduler that floors fractional intervals.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_config(config: SchedulerConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> SchedulerConfig {
        self.config
    }

    /// Apply a validated score to `state` as of `today`.
    #[must_use]
    pub fn score_review(
        &self,
        state: &SchedulingState,
        score: ReviewScore,
        today: NaiveDate,
    ) -> ScheduledReview {
        let mut next = state.clone();
        next.total_reviews = next.total_reviews.saturating_add(1);
        next.last_reviewed = today;

        let outcome = ReviewOutcome::from_score(score);
        match outcome {
            ReviewOutcome::Pass => {
                next.efactor = next_efactor(next.efactor, score);
                next.consecutive_correct = next.consecutive_correct.saturating_add(1);
            }
            ReviewOutcome::Miss => {
                next.consecutive_correct = 0;
                next.last_missed = today;
            }
        }

        let mut interval = if score.lengthens_interval() {
            interval_days(next.consecutive_correct, next.efactor, self.config.rounding)
        } else {
            0
        };
        let latest = latest_review_day().max(today);
        next.next_review = today
            .checked_add_days(Days::new(u64::from(interval)))
            .map_or(latest, |day| day.min(latest));
        if next.next_review == latest {
            interval = u32::try_from((latest - today).num_days()).unwrap_or(u32::MAX);
        }

        ScheduledReview {
            state: next,
            score,
            outcome,
            interval_days: interval,
        }
    }

    /// Validate a raw score and apply it.
    ///
    /// # Errors
    ///
    /// Returns `ReviewError::InvalidScore` if `raw` is outside `0..=5`;
    /// nothing is computed in that case.
    pub fn score_raw(
        &self,
        state: &SchedulingState,
        raw: i64,
        today: NaiveDate,
    ) -> Result<ScheduledReview, ReviewError> {
        let score = ReviewScore::new(raw)?;
        Ok(self.score_review(state, score, today))
    }
}

/// Last day a review can be scheduled on. Storage compares dates as
/// `YYYY-MM-DD` text, which only sorts correctly for four-digit years.
#[must_use]
pub fn latest_review_day() -> NaiveDate {
    NaiveDate::from_ymd_opt(9999, 12, 31).unwrap_or(NaiveDate::MAX)
}

/// SM-2 ease update for a passing score, clamped to [`MIN_EFACTOR`].
#[must_use]
pub fn next_efactor(efactor: f64, score: ReviewScore) -> f64 {
    let q = 5.0 - f64::from(score.value());
    let updated = efactor + (0.1 - q * (0.08 + q * 0.02));
    updated.max(MIN_EFACTOR)
}

/// Whole-day interval for a card whose streak (already incremented) is `streak`.
#[must_use]
pub fn interval_days(streak: u32, efactor: f64, rounding: IntervalRounding) -> u32 {
    match streak {
        0 | 1 => FIRST_INTERVAL_DAYS,
        2 => SECOND_INTERVAL_DAYS,
        n => rounding.whole_days(f64::from(n - 1) * efactor),
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_today;
    use chrono::Duration;

    fn score(v: i64) -> ReviewScore {
        ReviewScore::new(v).unwrap()
    }

    fn state_with(consecutive_correct: u32, efactor: f64) -> SchedulingState {
        let day = fixed_today() - Duration::days(10);
        SchedulingState::from_persisted(3, consecutive_correct, efactor, day, day, fixed_today())
            .unwrap()
    }

    #[test]
    fn new_state_has_defaults() {
        let s = SchedulingState::new(fixed_today());
        assert_eq!(s.total_reviews(), 0);
        assert_eq!(s.consecutive_correct(), 0);
        assert_eq!(s.efactor(), INITIAL_EFACTOR);
        assert_eq!(s.last_reviewed(), fixed_today());
        assert_eq!(s.last_missed(), fixed_today());
        assert_eq!(s.next_review(), fixed_today());
    }

    #[test]
    fn from_persisted_rejects_low_efactor() {
        let d = fixed_today();
        assert!(matches!(
            SchedulingState::from_persisted(0, 0, 1.2, d, d, d),
            Err(SchedulingStateError::InvalidEfactor { .. })
        ));
        assert!(SchedulingState::from_persisted(0, 0, f64::NAN, d, d, d).is_err());
    }

    #[test]
    fn invalid_raw_scores_fail_without_computing() {
        let s = Scheduler::new();
        let state = SchedulingState::new(fixed_today());
        for raw in [-1, 6, 100, i64::MIN] {
            let err = s.score_raw(&state, raw, fixed_today()).unwrap_err();
            assert_eq!(err, ReviewError::InvalidScore(raw));
        }
    }

    #[test]
    fn every_valid_score_counts_and_stamps_the_review() {
        let s = Scheduler::new();
        let today = fixed_today();
        let state = state_with(4, 2.2);
        for raw in 0..=5 {
            let r = s.score_raw(&state, raw, today).unwrap();
            assert_eq!(r.state.total_reviews(), state.total_reviews() + 1);
            assert_eq!(r.state.last_reviewed(), today);
        }
    }

    #[test]
    fn first_score_of_four_schedules_tomorrow() {
        let s = Scheduler::new();
        let today = fixed_today();
        let r = s.score_review(&SchedulingState::new(today), score(4), today);
        assert_eq!(r.state.consecutive_correct(), 1);
        assert_eq!(r.interval_days, 1);
        assert_eq!(r.state.next_review(), today + Duration::days(1));
        assert_eq!(r.state.efactor(), 2.5);
    }

    #[test]
    fn second_score_of_four_schedules_six_days_out() {
        let s = Scheduler::new();
        let today = fixed_today();
        let first = s.score_review(&SchedulingState::new(today), score(4), today);
        let second = s.score_review(&first.state, score(4), today);
        assert_eq!(second.state.consecutive_correct(), 2);
        assert_eq!(second.interval_days, 6);
        assert_eq!(second.state.next_review(), today + Duration::days(6));
    }

    #[test]
    fn long_streak_interval_uses_efactor() {
        let s = Scheduler::new();
        let today = fixed_today();
        // streak 3 -> 4, efactor 2.5 -> 2.6, interval floor(3 * 2.6) = 7
        let r = s.score_review(&state_with(3, 2.5), score(5), today);
        assert_eq!(r.state.consecutive_correct(), 4);
        assert!((r.state.efactor() - 2.6).abs() < 1e-9);
        assert_eq!(r.interval_days, 7);
        assert_eq!(r.state.next_review(), today + Duration::days(7));
    }

    #[test]
    fn score_three_is_a_pass_but_due_today() {
        let s = Scheduler::new();
        let today = fixed_today();
        let before = state_with(2, 2.5);
        let r = s.score_review(&before, score(3), today);
        assert_eq!(r.outcome, ReviewOutcome::Pass);
        assert_eq!(r.state.consecutive_correct(), 3);
        assert!((r.state.efactor() - 2.36).abs() < 1e-9);
        assert_eq!(r.state.next_review(), today);
        assert_eq!(r.state.last_missed(), before.last_missed());
        assert_eq!(r.interval_days, 0);
    }

    #[test]
    fn score_one_is_a_miss() {
        let s = Scheduler::new();
        let today = fixed_today();
        let before = state_with(5, 2.1);
        let r = s.score_review(&before, score(1), today);
        assert_eq!(r.outcome, ReviewOutcome::Miss);
        assert_eq!(r.state.consecutive_correct(), 0);
        assert_eq!(r.state.last_missed(), today);
        assert_eq!(r.state.next_review(), today);
        assert_eq!(r.state.efactor(), 2.1);
    }

    #[test]
    fn scores_below_four_always_come_back_today() {
        let s = Scheduler::new();
        let today = fixed_today();
        for raw in 0..4 {
            let r = s.score_raw(&state_with(7, 2.8), raw, today).unwrap();
            assert_eq!(r.state.next_review(), today, "score {raw}");
        }
    }

    #[test]
    fn scores_of_four_and_up_land_in_the_future() {
        let s = Scheduler::new();
        let today = fixed_today();
        for streak in 0..10 {
            for raw in 4..=5 {
                let r = s.score_raw(&state_with(streak, 1.3), raw, today).unwrap();
                assert!(r.state.next_review() > r.state.last_reviewed());
            }
        }
    }

    #[test]
    fn efactor_never_drops_below_floor() {
        let s = Scheduler::new();
        let today = fixed_today();
        let mut state = SchedulingState::new(today);
        let pattern = [3, 3, 0, 3, 5, 3, 3, 3, 1, 3, 4, 3, 3, 3, 3, 3, 2, 3];
        for _ in 0..5 {
            for raw in pattern {
                state = s.score_raw(&state, raw, today).unwrap().state;
                assert!(state.efactor() >= MIN_EFACTOR);
            }
        }
        assert_eq!(state.efactor(), MIN_EFACTOR);
    }

    #[test]
    fn identical_cards_reschedule_together() {
        let s = Scheduler::new();
        let today = fixed_today();
        let a = s.score_review(&SchedulingState::new(today), score(4), today);
        let b = s.score_review(&SchedulingState::new(today), score(4), today);
        assert_eq!(a.state.next_review(), b.state.next_review());
    }

    #[test]
    fn stronger_history_reschedules_further_out() {
        let s = Scheduler::new();
        let today = fixed_today();
        let strong = s.score_review(&state_with(6, 2.6), score(5), today);
        let weak = s.score_review(&state_with(3, 1.8), score(5), today);
        assert!(strong.state.next_review() > weak.state.next_review());
    }

    #[test]
    fn higher_score_reschedules_further_out() {
        let s = Scheduler::new();
        let today = fixed_today();
        let five = s.score_review(&state_with(6, 2.6), score(5), today);
        let four = s.score_review(&state_with(6, 2.6), score(4), today);
        assert!(five.state.next_review() > four.state.next_review());
    }

    #[test]
    fn rounding_policies_differ_on_fractional_intervals() {
        // streak 3 -> 4, efactor 1.8 -> 1.8 at score 4: 3 * 1.8 = 5.4
        let today = fixed_today();
        let state = state_with(3, 1.8);
        let days = |rounding| {
            Scheduler::with_config(SchedulerConfig { rounding })
                .score_review(&state, score(4), today)
                .interval_days
        };
        assert_eq!(days(IntervalRounding::Floor), 5);
        assert_eq!(days(IntervalRounding::Round), 5);
        assert_eq!(days(IntervalRounding::Ceil), 6);
    }

    #[test]
    fn floor_tolerates_efactor_drift() {
        // 2.5 + 0.1 + 0.1 is not exactly 2.7 in f64
        let ef = 2.5 + 0.1 + 0.1;
        assert_eq!(interval_days(11, ef, IntervalRounding::Floor), 27);
        assert_eq!(interval_days(11, ef, IntervalRounding::Ceil), 27);
    }

    #[test]
    fn huge_intervals_stop_at_the_last_four_digit_year() {
        let s = Scheduler::new();
        let today = fixed_today();
        let r = s.score_review(&state_with(u32::MAX - 1, 1_000.0), score(5), today);
        assert_eq!(r.state.next_review(), latest_review_day());
        assert_eq!(r.state.next_review().to_string(), "9999-12-31");
        assert_eq!(
            i64::from(r.interval_days),
            (latest_review_day() - today).num_days()
        );
        assert!(r.state.next_review().to_string() > today.to_string());
    }

    #[test]
    fn deserializing_enforces_the_efactor_floor() {
        let ok = serde_json::json!({
            "total_reviews": 3,
            "consecutive_correct": 2,
            "efactor": 1.3,
            "last_reviewed": "2023-11-10",
            "last_missed": "2023-11-01",
            "next_review": "2023-11-14",
        });
        let state: SchedulingState = serde_json::from_value(ok.clone()).unwrap();
        assert_eq!(state.efactor(), MIN_EFACTOR);

        let mut low = ok;
        low["efactor"] = serde_json::json!(0.5);
        let err = serde_json::from_value::<SchedulingState>(low).unwrap_err();
        assert!(err.to_string().contains("at least 1.3"));
    }

    #[test]
    fn counters_saturate() {
        let d = fixed_today();
        let state = SchedulingState::from_persisted(u32::MAX, u32::MAX, 2.5, d, d, d).unwrap();
        let r = Scheduler::new().score_review(&state, score(4), d);
        assert_eq!(r.state.total_reviews(), u32::MAX);
        assert_eq!(r.state.consecutive_correct(), u32::MAX);
    }
}
