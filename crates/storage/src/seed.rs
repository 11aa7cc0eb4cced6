//! Sample data: the opening Heisig kanji and a collection with one card each.
//!
//! Seeding is idempotent. Kanji, the collection and cards that already exist
//! are reused instead of inserted again.

use chrono::{DateTime, Utc};
use kanji_core::Error as CoreError;
use kanji_core::model::{CardDraft, Collection, CollectionDraft, KanjiDraft};
use thiserror::Error;

use crate::repository::{Storage, StorageError};

/// `(character, keyword, heisig index, mnemonic)`
pub const SAMPLE_KANJI: &[(&str, &str, u32, &str)] = &[
    ("一", "one", 1, "a single finger held out flat"),
    ("二", "two", 2, "two fingers laid one above the other"),
    ("三", "three", 3, "three fingers stacked like a ladder"),
    ("四", "four", 4, "four walls of a room with a window"),
    ("五", "five", 5, "a sideways five drawn with a ruler"),
    ("六", "six", 6, "a top hat sitting on two legs"),
    ("七", "seven", 7, "a seven cut straight through the middle"),
    ("八", "eight", 8, "a pair of legs walking apart"),
    ("九", "nine", 9, "a baseball player swinging at the ninth inning"),
    ("十", "ten", 10, "a cross, the roman ten turned upright"),
    ("口", "mouth", 11, "an open mouth seen from the front"),
    ("日", "day", 12, "the sun with one line across its face"),
    ("月", "month", 13, "a crescent moon hanging in a frame"),
    ("田", "rice field", 14, "a paddy cut into four plots"),
    ("目", "eye", 15, "an eye turned on its side"),
];

pub const DEFAULT_COLLECTION: &str = "Heisig starter";

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SeedError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Invalid(#[from] CoreError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedReport {
    pub collection: Collection,
    pub kanji_created: u32,
    pub cards_created: u32,
}

/// Insert the sample kanji and one card per kanji into `collection_name`.
///
/// # Errors
///
/// Returns `SeedError` if validation or any storage call fails.
pub async fn seed_sample(
    storage: &Storage,
    collection_name: &str,
    now: DateTime<Utc>,
) -> Result<SeedReport, SeedError> {
    let collection = match storage.collections.find_collection(collection_name.trim()).await? {
        Some(existing) => existing,
        None => {
            let draft = CollectionDraft::new(collection_name)
                .validate(now)
                .map_err(CoreError::from)?;
            storage.collections.insert_collection(draft).await?
        }
    };

    let existing_cards = storage.cards.list_cards(collection.id()).await?;

    let mut kanji_created = 0_u32;
    let mut cards_created = 0_u32;
    for &(character, keyword, index, mnemonic) in SAMPLE_KANJI {
        let validated = KanjiDraft::new(character, keyword, index)
            .validate()
            .map_err(CoreError::from)?;

        let kanji = match storage.kanji.find_kanji(validated.character).await? {
            Some(existing) => existing,
            None => {
                kanji_created += 1;
                storage.kanji.insert_kanji(validated).await?
            }
        };

        if existing_cards.iter().any(|c| c.kanji_id() == kanji.id) {
            continue;
        }
        let card = CardDraft::new(collection.id(), kanji.id, mnemonic)
            .validate(now)
            .map_err(CoreError::from)?;
        storage.cards.insert_card(card).await?;
        cards_created += 1;
    }

    tracing::info!(
        collection = collection.name(),
        kanji_created,
        cards_created,
        "seeded sample kanji"
    );

    Ok(SeedReport {
        collection,
        kanji_created,
        cards_created,
    })
}
