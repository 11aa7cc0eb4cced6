use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::NaiveDate;
use kanji_core::model::{
    CardId, Collection, CollectionId, Kanji, KanjiCard, KanjiId, ReviewLog, ValidatedCard,
    ValidatedCollection, ValidatedKanji,
};
use kanji_core::selector::{DuePolicy, DueSelector};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    /// A uniqueness constraint was violated or a card changed since it was read.
    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// A persisted review log entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewLogRecord {
    pub id: i64,
    pub log: ReviewLog,
}

/// What a successful review write produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppliedWrite {
    pub revision: u64,
    pub log_id: i64,
}

#[async_trait]
pub trait KanjiRepository: Send + Sync {
    /// Store a new kanji.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the character, keyword or Heisig
    /// index is already taken.
    async fn insert_kanji(&self, kanji: ValidatedKanji) -> Result<Kanji, StorageError>;

    /// Fetch a kanji by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_kanji(&self, id: KanjiId) -> Result<Option<Kanji>, StorageError>;

    /// Fetch a kanji by its character.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn find_kanji(&self, character: char) -> Result<Option<Kanji>, StorageError>;

    /// All kanji ordered by Heisig index.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_kanji(&self) -> Result<Vec<Kanji>, StorageError>;
}

#[async_trait]
pub trait CollectionRepository: Send + Sync {
    /// Store a new collection.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the name is already taken.
    async fn insert_collection(
        &self,
        collection: ValidatedCollection,
    ) -> Result<Collection, StorageError>;

    /// Fetch a collection by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_collection(&self, id: CollectionId) -> Result<Option<Collection>, StorageError>;

    /// Fetch a collection by exact name.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn find_collection(&self, name: &str) -> Result<Option<Collection>, StorageError>;
}

#[async_trait]
pub trait CardRepository: Send + Sync {
    /// Store a new card with default scheduling state.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the collection or kanji is missing,
    /// `StorageError::Conflict` if the collection already has a card for the
    /// kanji or the same mnemonic.
    async fn insert_card(&self, card: ValidatedCard) -> Result<KanjiCard, StorageError>;

    /// Fetch a card by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_card(&self, id: CardId) -> Result<Option<KanjiCard>, StorageError>;

    /// All cards of a collection, ordered by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_cards(&self, collection_id: CollectionId) -> Result<Vec<KanjiCard>, StorageError>;

    /// The next card to review in a collection, using the same filter and
    /// ordering as [`DueSelector`].
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn next_due(
        &self,
        collection_id: CollectionId,
        today: NaiveDate,
        policy: DuePolicy,
    ) -> Result<Option<KanjiCard>, StorageError>;

    /// Number of cards in a collection that are due.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn due_count(
        &self,
        collection_id: CollectionId,
        today: NaiveDate,
        policy: DuePolicy,
    ) -> Result<u32, StorageError>;
}

#[async_trait]
pub trait ReviewLogRepository: Send + Sync {
    /// Review history of a card, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn logs_for_card(&self, card_id: CardId) -> Result<Vec<ReviewLogRecord>, StorageError>;
}

/// Atomic write of a reviewed card plus its log entry.
#[async_trait]
pub trait ReviewPersistence: Send + Sync {
    /// Persist the card's scheduling fields and append `log`.
    ///
    /// The write only lands if the stored revision still equals
    /// `card.revision()`; the stored revision is then incremented.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the card is missing,
    /// `StorageError::Conflict` if the card was written since it was read or
    /// the log does not belong to the card.
    async fn apply_review(
        &self,
        card: &KanjiCard,
        log: ReviewLog,
    ) -> Result<AppliedWrite, StorageError>;
}

//
// ─── IN-MEMORY ─────────────────────────────────────────────────────────────────
//

#[derive(Default)]
struct MemoryState {
    kanji: BTreeMap<KanjiId, Kanji>,
    collections: BTreeMap<CollectionId, Collection>,
    cards: BTreeMap<CardId, KanjiCard>,
    logs: Vec<ReviewLogRecord>,
    next_id: u64,
}

impl MemoryState {
    fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, StorageError> {
        self.state
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }
}

#[async_trait]
impl KanjiRepository for InMemoryRepository {
    async fn insert_kanji(&self, kanji: ValidatedKanji) -> Result<Kanji, StorageError> {
        let mut guard = self.lock()?;
        let taken = guard.kanji.values().any(|k| {
            k.character == kanji.character
                || k.keyword == kanji.keyword
                || k.heisig_index == kanji.heisig_index
        });
        if taken {
            return Err(StorageError::Conflict);
        }
        let id = KanjiId::new(guard.allocate_id());
        let kanji = kanji.assign_id(id);
        guard.kanji.insert(id, kanji.clone());
        Ok(kanji)
    }

    async fn get_kanji(&self, id: KanjiId) -> Result<Option<Kanji>, StorageError> {
        Ok(self.lock()?.kanji.get(&id).cloned())
    }

    async fn find_kanji(&self, character: char) -> Result<Option<Kanji>, StorageError> {
        Ok(self
            .lock()?
            .kanji
            .values()
            .find(|k| k.character == character)
            .cloned())
    }

    async fn list_kanji(&self) -> Result<Vec<Kanji>, StorageError> {
        let mut all: Vec<Kanji> = self.lock()?.kanji.values().cloned().collect();
        all.sort_by_key(|k| k.heisig_index);
        Ok(all)
    }
}

#[async_trait]
impl CollectionRepository for InMemoryRepository {
    async fn insert_collection(
        &self,
        collection: ValidatedCollection,
    ) -> Result<Collection, StorageError> {
        let mut guard = self.lock()?;
        if guard
            .collections
            .values()
            .any(|c| c.name() == collection.name)
        {
            return Err(StorageError::Conflict);
        }
        let id = CollectionId::new(guard.allocate_id());
        let collection = collection.assign_id(id);
        guard.collections.insert(id, collection.clone());
        Ok(collection)
    }

    async fn get_collection(&self, id: CollectionId) -> Result<Option<Collection>, StorageError> {
        Ok(self.lock()?.collections.get(&id).cloned())
    }

    async fn find_collection(&self, name: &str) -> Result<Option<Collection>, StorageError> {
        Ok(self
            .lock()?
            .collections
            .values()
            .find(|c| c.name() == name)
            .cloned())
    }
}

#[async_trait]
impl CardRepository for InMemoryRepository {
    async fn insert_card(&self, card: ValidatedCard) -> Result<KanjiCard, StorageError> {
        let mut guard = self.lock()?;
        if !guard.collections.contains_key(&card.collection_id)
            || !guard.kanji.contains_key(&card.kanji_id)
        {
            return Err(StorageError::NotFound);
        }
        let duplicate = guard.cards.values().any(|c| {
            c.collection_id() == card.collection_id
                && (c.kanji_id() == card.kanji_id || c.mnemonic() == card.mnemonic)
        });
        if duplicate {
            return Err(StorageError::Conflict);
        }
        let id = CardId::new(guard.allocate_id());
        let card = card.assign_id(id);
        guard.cards.insert(id, card.clone());
        Ok(card)
    }

    async fn get_card(&self, id: CardId) -> Result<Option<KanjiCard>, StorageError> {
        Ok(self.lock()?.cards.get(&id).cloned())
    }

    async fn list_cards(&self, collection_id: CollectionId) -> Result<Vec<KanjiCard>, StorageError> {
        Ok(self
            .lock()?
            .cards
            .values()
            .filter(|c| c.collection_id() == collection_id)
            .cloned()
            .collect())
    }

    async fn next_due(
        &self,
        collection_id: CollectionId,
        today: NaiveDate,
        policy: DuePolicy,
    ) -> Result<Option<KanjiCard>, StorageError> {
        let guard = self.lock()?;
        Ok(DueSelector::new(policy)
            .next_due(guard.cards.values(), collection_id, today)
            .cloned())
    }

    async fn due_count(
        &self,
        collection_id: CollectionId,
        today: NaiveDate,
        policy: DuePolicy,
    ) -> Result<u32, StorageError> {
        let guard = self.lock()?;
        let selector = DueSelector::new(policy);
        let count = guard
            .cards
            .values()
            .filter(|c| selector.is_due(c, collection_id, today))
            .count();
        u32::try_from(count).map_err(|_| StorageError::Serialization("due count overflow".into()))
    }
}

#[async_trait]
impl ReviewLogRepository for InMemoryRepository {
    async fn logs_for_card(&self, card_id: CardId) -> Result<Vec<ReviewLogRecord>, StorageError> {
        Ok(self
            .lock()?
            .logs
            .iter()
            .filter(|r| r.log.card_id == card_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ReviewPersistence for InMemoryRepository {
    async fn apply_review(
        &self,
        card: &KanjiCard,
        log: ReviewLog,
    ) -> Result<AppliedWrite, StorageError> {
        if log.card_id != card.id() || log.collection_id != card.collection_id() {
            return Err(StorageError::Conflict);
        }

        let mut guard = self.lock()?;
        let stored = guard.cards.get(&card.id()).ok_or(StorageError::NotFound)?;
        if stored.revision() != card.revision() {
            tracing::warn!(
                card_id = %card.id(),
                expected = card.revision(),
                found = stored.revision(),
                "stale review write rejected"
            );
            return Err(StorageError::Conflict);
        }

        let mut updated = card.clone();
        updated.bump_revision();
        let revision = updated.revision();
        guard.cards.insert(card.id(), updated);

        let log_id = i64::try_from(guard.logs.len() + 1)
            .map_err(|_| StorageError::Serialization("log id overflow".into()))?;
        guard.logs.push(ReviewLogRecord { id: log_id, log });

        Ok(AppliedWrite { revision, log_id })
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub kanji: Arc<dyn KanjiRepository>,
    pub collections: Arc<dyn CollectionRepository>,
    pub cards: Arc<dyn CardRepository>,
    pub review_logs: Arc<dyn ReviewLogRepository>,
    pub reviews: Arc<dyn ReviewPersistence>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        Self {
            kanji: Arc::new(repo.clone()),
            collections: Arc::new(repo.clone()),
            cards: Arc::new(repo.clone()),
            review_logs: Arc::new(repo.clone()),
            reviews: Arc::new(repo),
        }
    }
}
