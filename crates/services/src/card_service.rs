use std::sync::Arc;

use chrono::NaiveDate;
use kanji_core::model::{CardDraft, CollectionId, KanjiCard};
use kanji_core::selector::DuePolicy;
use serde::Serialize;
use storage::repository::{CardRepository, KanjiRepository};

use crate::error::CardServiceError;
use crate::Clock;

/// Orchestrates card creation and per-collection counts.
#[derive(Clone)]
pub struct CardService {
    clock: Clock,
    kanji: Arc<dyn KanjiRepository>,
    cards: Arc<dyn CardRepository>,
}

/// Aggregate counts for a collection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct CollectionStats {
    pub total: u32,
    pub due: u32,
    pub overdue: u32,
}

impl CardService {
    #[must_use]
    pub fn new(clock: Clock, kanji: Arc<dyn KanjiRepository>, cards: Arc<dyn CardRepository>) -> Self {
        Self {
            clock,
            kanji,
            cards,
        }
    }

    /// Create a card for `character` in a collection. The card is due on the
    /// day it is created.
    ///
    /// # Errors
    ///
    /// Returns `CardServiceError::UnknownKanji` if the character is not in the
    /// catalogue, `CardServiceError::Card` for a blank mnemonic, and
    /// `CardServiceError::Storage` on conflicts or persistence failures.
    pub async fn create_card(
        &self,
        collection_id: CollectionId,
        character: char,
        mnemonic: &str,
    ) -> Result<KanjiCard, CardServiceError> {
        let kanji = self
            .kanji
            .find_kanji(character)
            .await?
            .ok_or(CardServiceError::UnknownKanji(character))?;

        let draft = CardDraft::new(collection_id, kanji.id, mnemonic).validate(self.clock.now())?;
        let card = self.cards.insert_card(draft).await?;
        tracing::info!(card_id = %card.id(), kanji = %character, "card created");
        Ok(card)
    }

    /// Counts for the `stats` view: all cards, cards due exactly today, and
    /// cards whose review day has already passed.
    ///
    /// # Errors
    ///
    /// Returns `CardServiceError::Storage` if repository access fails.
    pub async fn collection_stats(
        &self,
        collection_id: CollectionId,
        today: NaiveDate,
    ) -> Result<CollectionStats, CardServiceError> {
        let total = self.cards.list_cards(collection_id).await?.len();
        let due = self
            .cards
            .due_count(collection_id, today, DuePolicy::ScheduledToday)
            .await?;
        let due_or_overdue = self
            .cards
            .due_count(collection_id, today, DuePolicy::IncludeOverdue)
            .await?;

        Ok(CollectionStats {
            total: u32::try_from(total).unwrap_or(u32::MAX),
            due,
            overdue: due_or_overdue.saturating_sub(due),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use kanji_core::model::{CardError, CollectionDraft, KanjiDraft};
    use kanji_core::time::{fixed_clock, fixed_now, fixed_today};
    use storage::repository::{CollectionRepository, InMemoryRepository, StorageError};

    async fn service() -> (CardService, CollectionId) {
        let repo = InMemoryRepository::new();
        let collection = repo
            .insert_collection(CollectionDraft::new("default").validate(fixed_now()).unwrap())
            .await
            .unwrap();
        for (c, k, i) in [("日", "day", 12), ("月", "month", 13)] {
            repo.insert_kanji(KanjiDraft::new(c, k, i).validate().unwrap())
                .await
                .unwrap();
        }
        let svc = CardService::new(fixed_clock(), Arc::new(repo.clone()), Arc::new(repo));
        (svc, collection.id())
    }

    #[tokio::test]
    async fn create_card_is_due_today() {
        let (svc, collection) = service().await;
        let card = svc.create_card(collection, '日', "midday sun").await.unwrap();
        assert_eq!(card.next_review(), fixed_today());

        let stats = svc.collection_stats(collection, fixed_today()).await.unwrap();
        assert_eq!(stats, CollectionStats { total: 1, due: 1, overdue: 0 });

        let later = svc
            .collection_stats(collection, fixed_today() + Duration::days(2))
            .await
            .unwrap();
        assert_eq!(later, CollectionStats { total: 1, due: 0, overdue: 1 });
    }

    #[tokio::test]
    async fn unknown_kanji_is_rejected() {
        let (svc, collection) = service().await;
        let err = svc.create_card(collection, '木', "tree").await.unwrap_err();
        assert!(matches!(err, CardServiceError::UnknownKanji('木')));
    }

    #[tokio::test]
    async fn blank_mnemonic_is_rejected() {
        let (svc, collection) = service().await;
        let err = svc.create_card(collection, '月', "   ").await.unwrap_err();
        assert!(matches!(err, CardServiceError::Card(CardError::EmptyMnemonic)));
    }

    #[tokio::test]
    async fn duplicate_card_conflicts() {
        let (svc, collection) = service().await;
        svc.create_card(collection, '月', "waxing moon").await.unwrap();
        let err = svc
            .create_card(collection, '月', "waning moon")
            .await
            .unwrap_err();
        assert!(matches!(err, CardServiceError::Storage(StorageError::Conflict)));
    }
}
