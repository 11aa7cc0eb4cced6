//! Picks the next card to review from a collection.
//!
//! Candidates are ordered so that the most recently missed cards come back
//! first, then lower streaks, then lower ease. Card id breaks any remaining
//! tie so the choice is fully deterministic.

use std::cmp::Ordering;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::model::{CollectionId, KanjiCard};

/// Which `next_review` dates count as due.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuePolicy {
    /// Only cards whose `next_review` is exactly today.
    #[default]
    ScheduledToday,
    /// Cards scheduled for today or any earlier day.
    IncludeOverdue,
}

impl DuePolicy {
    #[must_use]
    pub fn is_due(self, next_review: NaiveDate, today: NaiveDate) -> bool {
        match self {
            DuePolicy::ScheduledToday => next_review == today,
            DuePolicy::IncludeOverdue => next_review <= today,
        }
    }
}

/// Ordering among due cards: `last_missed` desc, `consecutive_correct` asc,
/// `efactor` asc, id asc.
#[must_use]
pub fn due_ordering(a: &KanjiCard, b: &KanjiCard) -> Ordering {
    let (sa, sb) = (a.scheduling(), b.scheduling());
    sb.last_missed()
        .cmp(&sa.last_missed())
        .then_with(|| sa.consecutive_correct().cmp(&sb.consecutive_correct()))
        .then_with(|| sa.efactor().total_cmp(&sb.efactor()))
        .then_with(|| a.id().cmp(&b.id()))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DueSelector {
    policy: DuePolicy,
}

impl DueSelector {
    #[must_use]
    pub fn new(policy: DuePolicy) -> Self {
        Self { policy }
    }

    #[must_use]
    pub fn policy(&self) -> DuePolicy {
        self.policy
    }

    #[must_use]
    pub fn is_due(&self, card: &KanjiCard, collection_id: CollectionId, today: NaiveDate) -> bool {
        card.collection_id() == collection_id && self.policy.is_due(card.next_review(), today)
    }

    /// The single next card to review in `collection_id`, or `None` when
    /// nothing is due.
    pub fn next_due<'a, I>(
        &self,
        cards: I,
        collection_id: CollectionId,
        today: NaiveDate,
    ) -> Option<&'a KanjiCard>
    where
        I: IntoIterator<Item = &'a KanjiCard>,
    {
        cards
            .into_iter()
            .filter(|card| self.is_due(card, collection_id, today))
            .min_by(|a, b| due_ordering(a, b))
    }
}
