use std::sync::Arc;

use kanji_core::model::{Collection, CollectionDraft};
use kanji_core::selector::DuePolicy;
use storage::repository::{CollectionRepository, Storage};

use crate::card_service::CardService;
use crate::error::AppServicesError;
use crate::review_service::ReviewService;
use crate::study::StudyLoopService;
use crate::Clock;

/// Assembles app-facing services around one storage backend and one collection.
#[derive(Clone)]
pub struct AppServices {
    clock: Clock,
    storage: Storage,
    collection: Collection,
    collection_created: bool,
    study_loop: Arc<StudyLoopService>,
    card_service: Arc<CardService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization or collection setup fails.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        collection_name: &str,
        policy: DuePolicy,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Self::from_storage(storage, clock, collection_name, policy).await
    }

    /// Build services over an existing storage aggregate, creating the named
    /// collection if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the collection name is invalid or storage fails.
    pub async fn from_storage(
        storage: Storage,
        clock: Clock,
        collection_name: &str,
        policy: DuePolicy,
    ) -> Result<Self, AppServicesError> {
        let (collection, collection_created) =
            ensure_collection(storage.collections.as_ref(), clock, collection_name).await?;

        let study_loop = Arc::new(
            StudyLoopService::new(
                clock,
                Arc::clone(&storage.kanji),
                Arc::clone(&storage.cards),
                Arc::clone(&storage.reviews),
            )
            .with_policy(policy),
        );
        let card_service = Arc::new(CardService::new(
            clock,
            Arc::clone(&storage.kanji),
            Arc::clone(&storage.cards),
        ));

        Ok(Self {
            clock,
            storage,
            collection,
            collection_created,
            study_loop,
            card_service,
        })
    }

    #[must_use]
    pub fn clock(&self) -> Clock {
        self.clock
    }

    #[must_use]
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    #[must_use]
    pub fn collection(&self) -> &Collection {
        &self.collection
    }

    /// Whether the collection was created while building these services.
    #[must_use]
    pub fn collection_created(&self) -> bool {
        self.collection_created
    }

    #[must_use]
    pub fn review_service(&self) -> ReviewService {
        ReviewService::new().with_clock(self.clock)
    }

    #[must_use]
    pub fn study_loop(&self) -> Arc<StudyLoopService> {
        Arc::clone(&self.study_loop)
    }

    #[must_use]
    pub fn card_service(&self) -> Arc<CardService> {
        Arc::clone(&self.card_service)
    }
}

async fn ensure_collection(
    collections: &dyn CollectionRepository,
    clock: Clock,
    name: &str,
) -> Result<(Collection, bool), AppServicesError> {
    let draft = CollectionDraft::new(name).validate(clock.now())?;
    if let Some(existing) = collections.find_collection(&draft.name).await? {
        return Ok((existing, false));
    }

    let collection = collections.insert_collection(draft).await?;
    tracing::info!(collection = collection.name(), "created collection");
    Ok((collection, true))
}
