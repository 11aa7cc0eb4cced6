use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::model::ids::{CardId, CollectionId, KanjiId};
use crate::model::review::{ReviewError, ReviewLog, ReviewScore};
use crate::scheduler::{ScheduledReview, Scheduler, SchedulingState, SchedulingStateError};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum CardError {
    #[error("mnemonic cannot be empty")]
    EmptyMnemonic,

    #[error(transparent)]
    InvalidSchedulingState(#[from] SchedulingStateError),
}

//
// ─── CARD DRAFT ────────────────────────────────────────────────────────────────
//

/// Unvalidated card input: which kanji goes in which collection, and how to remember it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardDraft {
    pub collection_id: CollectionId,
    pub kanji_id: KanjiId,
    pub mnemonic: String,
}

impl CardDraft {
    #[must_use]
    pub fn new(collection_id: CollectionId, kanji_id: KanjiId, mnemonic: impl Into<String>) -> Self {
        Self {
            collection_id,
            kanji_id,
            mnemonic: mnemonic.into(),
        }
    }

    /// Validate the draft as of `now`.
    ///
    /// # Errors
    ///
    /// Returns `CardError::EmptyMnemonic` if the mnemonic is blank.
    pub fn validate(self, now: DateTime<Utc>) -> Result<ValidatedCard, CardError> {
        let mnemonic = self.mnemonic.trim();
        if mnemonic.is_empty() {
            return Err(CardError::EmptyMnemonic);
        }
        Ok(ValidatedCard {
            collection_id: self.collection_id,
            kanji_id: self.kanji_id,
            mnemonic: mnemonic.to_owned(),
            created_at: now,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedCard {
    pub collection_id: CollectionId,
    pub kanji_id: KanjiId,
    pub mnemonic: String,
    pub created_at: DateTime<Utc>,
}

impl ValidatedCard {
    /// Attach a storage-assigned id; the card starts with default scheduling state.
    #[must_use]
    pub fn assign_id(self, id: CardId) -> KanjiCard {
        KanjiCard {
            id,
            collection_id: self.collection_id,
            kanji_id: self.kanji_id,
            mnemonic: self.mnemonic,
            created_at: self.created_at,
            scheduling: SchedulingState::new(self.created_at.date_naive()),
            revision: 0,
        }
    }
}

//
// ─── KANJI CARD ────────────────────────────────────────────────────────────────
//

/// A flash card pairing one kanji with a mnemonic inside one collection.
///
/// Only storage rebuilds cards, through [`KanjiCard::from_persisted`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KanjiCard {
    id: CardId,
    collection_id: CollectionId,
    kanji_id: KanjiId,
    mnemonic: String,
    created_at: DateTime<Utc>,
    scheduling: SchedulingState,
    revision: u64,
}

impl KanjiCard {
    /// Create a brand-new card due on its creation day.
    ///
    /// # Errors
    ///
    /// Returns `CardError::EmptyMnemonic` if the mnemonic is blank.
    pub fn new(
        id: CardId,
        collection_id: CollectionId,
        kanji_id: KanjiId,
        mnemonic: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, CardError> {
        Ok(CardDraft::new(collection_id, kanji_id, mnemonic)
            .validate(created_at)?
            .assign_id(id))
    }

    /// Rehydrate a card from storage.
    ///
    /// # Errors
    ///
    /// Returns `CardError::EmptyMnemonic` if the stored mnemonic is blank.
    pub fn from_persisted(
        id: CardId,
        collection_id: CollectionId,
        kanji_id: KanjiId,
        mnemonic: String,
        created_at: DateTime<Utc>,
        scheduling: SchedulingState,
        revision: u64,
    ) -> Result<Self, CardError> {
        if mnemonic.trim().is_empty() {
            return Err(CardError::EmptyMnemonic);
        }
        Ok(Self {
            id,
            collection_id,
            kanji_id,
            mnemonic,
            created_at,
            scheduling,
            revision,
        })
    }

    #[must_use]
    pub fn id(&self) -> CardId {
        self.id
    }

    #[must_use]
    pub fn collection_id(&self) -> CollectionId {
        self.collection_id
    }

    #[must_use]
    pub fn kanji_id(&self) -> KanjiId {
        self.kanji_id
    }

    #[must_use]
    pub fn mnemonic(&self) -> &str {
        &self.mnemonic
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn scheduling(&self) -> &SchedulingState {
        &self.scheduling
    }

    /// Optimistic concurrency token owned by storage.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    #[must_use]
    pub fn next_review(&self) -> NaiveDate {
        self.scheduling.next_review()
    }

    /// Replace the scheduling state with an already computed review.
    pub fn apply_scheduled(&mut self, review: &ScheduledReview) {
        self.scheduling = review.state.clone();
    }

    /// Score a review and update this card in place.
    pub fn apply_review(
        &mut self,
        scheduler: &Scheduler,
        score: ReviewScore,
        today: NaiveDate,
    ) -> ScheduledReview {
        let review = scheduler.score_review(&self.scheduling, score, today);
        self.apply_scheduled(&review);
        review
    }

    /// Validate a raw score and apply it.
    ///
    /// # Errors
    ///
    /// Returns `ReviewError::InvalidScore` for values outside `0..=5`; the
    /// card is left untouched.
    pub fn set_review_score(
        &mut self,
        scheduler: &Scheduler,
        raw: i64,
        today: NaiveDate,
    ) -> Result<ScheduledReview, ReviewError> {
        let score = ReviewScore::new(raw)?;
        Ok(self.apply_review(scheduler, score, today))
    }

    /// Build the log entry describing `review` of this card.
    #[must_use]
    pub fn review_log(&self, review: &ScheduledReview) -> ReviewLog {
        ReviewLog {
            card_id: self.id,
            collection_id: self.collection_id,
            score: review.score,
            reviewed_on: review.state.last_reviewed(),
            next_review: review.state.next_review(),
            efactor: review.state.efactor(),
            consecutive_correct: review.state.consecutive_correct(),
        }
    }

    /// Storage hook: record that a write landed.
    pub fn bump_revision(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
