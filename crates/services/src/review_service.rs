use chrono::NaiveDate;

use kanji_core::{
    model::{CardId, KanjiCard, ReviewScore},
    scheduler::{ScheduledReview, Scheduler},
    time::Clock,
};
use storage::repository::{CardRepository, ReviewPersistence, StorageError};

use crate::error::ReviewServiceError;

//
// ─── REVIEW RESULT ─────────────────────────────────────────────────────────────
//

/// Result of a persisted review: updated card, scheduled outcome, and log ID.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistedReview {
    pub card: KanjiCard,
    pub log_id: i64,
    pub review: ScheduledReview,
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Coordinates applying a user's score to a card using the scheduler.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReviewService {
    clock: Clock,
    scheduler: Scheduler,
}

impl ReviewService {
    /// Create a review service using the default scheduler and real-time clock.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a review service with a custom scheduler (still uses default clock).
    #[must_use]
    pub fn with_scheduler(scheduler: Scheduler) -> Self {
        Self {
            clock: Clock::default(),
            scheduler,
        }
    }

    /// Override the clock (usually for deterministic testing).
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Calendar day according to the service's clock.
    #[must_use]
    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    #[must_use]
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Apply a raw score to a card in memory.
    ///
    /// # Errors
    ///
    /// Returns `ReviewServiceError::Review` if the score is outside `0..=5`;
    /// the card is left untouched.
    pub fn review_card(
        &self,
        card: &mut KanjiCard,
        raw_score: i64,
        today: NaiveDate,
    ) -> Result<ScheduledReview, ReviewServiceError> {
        let score = ReviewScore::new(raw_score)?;
        Ok(card.apply_review(&self.scheduler, score, today))
    }

    /// Apply a review to an in-memory card and persist the update + log atomically.
    ///
    /// If persistence fails, the card is rolled back to its original state.
    ///
    /// # Errors
    ///
    /// Returns `ReviewServiceError::Review` for invalid scores.
    /// Returns storage errors if persistence fails, including
    /// `StorageError::Conflict` when the card changed since it was read.
    pub async fn review_card_persisted(
        &self,
        card: &mut KanjiCard,
        raw_score: i64,
        today: NaiveDate,
        reviews: &dyn ReviewPersistence,
    ) -> Result<(ScheduledReview, i64), ReviewServiceError> {
        let original = card.clone();

        let review = self.review_card(card, raw_score, today)?;
        let log = card.review_log(&review);

        match reviews.apply_review(card, log).await {
            Ok(applied) => {
                card.bump_revision();
                tracing::debug!(
                    card_id = %card.id(),
                    score = %review.score,
                    interval_days = review.interval_days,
                    next_review = %review.state.next_review(),
                    "review applied"
                );
                debug_assert_eq!(card.revision(), applied.revision);
                Ok((review, applied.log_id))
            }
            Err(err) => {
                *card = original;
                tracing::warn!(card_id = %card.id(), error = %err, "review not persisted");
                Err(err.into())
            }
        }
    }

    /// Load a card, apply a review, and persist the updated card and review log atomically.
    ///
    /// Uses the service clock for the review day.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the card is missing.
    /// Returns `ReviewServiceError::Review` for invalid scores.
    /// Returns storage errors if persistence fails.
    pub async fn review_card_persisted_by_id(
        &self,
        card_id: CardId,
        cards: &dyn CardRepository,
        reviews: &dyn ReviewPersistence,
        raw_score: i64,
    ) -> Result<PersistedReview, ReviewServiceError> {
        let score = ReviewScore::new(raw_score)?;
        let mut card = cards.get_card(card_id).await?.ok_or(StorageError::NotFound)?;

        let today = self.today();
        let (review, log_id) = self
            .review_card_persisted(&mut card, i64::from(score), today, reviews)
            .await?;

        Ok(PersistedReview {
            card,
            log_id,
            review,
        })
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
