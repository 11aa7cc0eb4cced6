use std::sync::Arc;

use chrono::NaiveDate;
use kanji_core::model::{CollectionId, Kanji, KanjiCard};
use kanji_core::scheduler::{ScheduledReview, Scheduler};
use kanji_core::selector::DuePolicy;
use storage::repository::{CardRepository, KanjiRepository, ReviewPersistence, StorageError};

use crate::error::StudyError;
use crate::review_service::ReviewService;
use crate::Clock;

/// A due card together with the kanji it quizzes.
#[derive(Debug, Clone, PartialEq)]
pub struct StudyCard {
    pub card: KanjiCard,
    pub kanji: Kanji,
}

/// Result of answering a single card.
#[derive(Debug, Clone, PartialEq)]
pub struct StudyAnswer {
    pub card: KanjiCard,
    pub review: ScheduledReview,
    pub log_id: i64,
    /// Cards of the collection still due after this answer.
    pub remaining: u32,
}

/// Drives the review loop: fetch the next due card, score it, persist, repeat
/// until nothing is due.
#[derive(Clone)]
pub struct StudyLoopService {
    clock: Clock,
    policy: DuePolicy,
    review: ReviewService,
    kanji: Arc<dyn KanjiRepository>,
    cards: Arc<dyn CardRepository>,
    reviews: Arc<dyn ReviewPersistence>,
}

impl StudyLoopService {
    #[must_use]
    pub fn new(
        clock: Clock,
        kanji: Arc<dyn KanjiRepository>,
        cards: Arc<dyn CardRepository>,
        reviews: Arc<dyn ReviewPersistence>,
    ) -> Self {
        Self {
            clock,
            policy: DuePolicy::default(),
            review: ReviewService::new().with_clock(clock),
            kanji,
            cards,
            reviews,
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: DuePolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn with_scheduler(mut self, scheduler: Scheduler) -> Self {
        self.review = ReviewService::with_scheduler(scheduler).with_clock(self.clock);
        self
    }

    #[must_use]
    pub fn policy(&self) -> DuePolicy {
        self.policy
    }

    #[must_use]
    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// The next card to review, or `None` when the collection is done for today.
    ///
    /// # Errors
    ///
    /// Returns `StudyError::Storage` for repository failures, including a card
    /// whose kanji is missing.
    pub async fn next_card(
        &self,
        collection_id: CollectionId,
    ) -> Result<Option<StudyCard>, StudyError> {
        let Some(card) = self
            .cards
            .next_due(collection_id, self.today(), self.policy)
            .await?
        else {
            return Ok(None);
        };

        let kanji = self
            .kanji
            .get_kanji(card.kanji_id())
            .await?
            .ok_or(StorageError::NotFound)?;

        Ok(Some(StudyCard { card, kanji }))
    }

    /// Score `current` and persist the result.
    ///
    /// # Errors
    ///
    /// Returns `StudyError::Review` for invalid scores (nothing is written) and
    /// `StudyError::Storage` when persistence fails.
    pub async fn answer(
        &self,
        current: &StudyCard,
        raw_score: i64,
    ) -> Result<StudyAnswer, StudyError> {
        let today = self.today();
        let mut card = current.card.clone();
        let (review, log_id) = self
            .review
            .review_card_persisted(&mut card, raw_score, today, self.reviews.as_ref())
            .await?;

        let remaining = self
            .cards
            .due_count(card.collection_id(), today, self.policy)
            .await?;

        Ok(StudyAnswer {
            card,
            review,
            log_id,
            remaining,
        })
    }

    /// Fetch the next due card and score it in one step.
    ///
    /// # Errors
    ///
    /// Returns `StudyError::NothingDue` when no card is due, otherwise as
    /// [`StudyLoopService::answer`].
    pub async fn answer_next(
        &self,
        collection_id: CollectionId,
        raw_score: i64,
    ) -> Result<StudyAnswer, StudyError> {
        let current = self
            .next_card(collection_id)
            .await?
            .ok_or(StudyError::NothingDue)?;
        self.answer(&current, raw_score).await
    }
}
