use kanji_core::model::ReviewOutcome;
use kanji_core::scheduler::ScheduledReview;
use serde::Serialize;

/// Running counts for one study sitting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StudyTally {
    pub reviewed: u32,
    pub passed: u32,
    pub missed: u32,
    /// Reviews that left the card due again today (score below 4).
    pub repeated: u32,
}

impl StudyTally {
    pub fn record(&mut self, review: &ScheduledReview) {
        self.reviewed = self.reviewed.saturating_add(1);
        match review.outcome {
            ReviewOutcome::Pass => self.passed = self.passed.saturating_add(1),
            ReviewOutcome::Miss => self.missed = self.missed.saturating_add(1),
        }
        if !review.score.lengthens_interval() {
            self.repeated = self.repeated.saturating_add(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kanji_core::model::ReviewScore;
    use kanji_core::scheduler::{Scheduler, SchedulingState};
    use kanji_core::time::fixed_today;

    #[test]
    fn tally_splits_passes_misses_and_repeats() {
        let scheduler = Scheduler::new();
        let state = SchedulingState::new(fixed_today());
        let mut tally = StudyTally::default();

        for raw in [5, 3, 1] {
            let review =
                scheduler.score_review(&state, ReviewScore::new(raw).unwrap(), fixed_today());
            tally.record(&review);
        }

        assert_eq!(
            tally,
            StudyTally {
                reviewed: 3,
                passed: 2,
                missed: 1,
                repeated: 2,
            }
        );
    }
}
