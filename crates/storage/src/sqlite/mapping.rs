use chrono::{DateTime, NaiveDate, Utc};
use kanji_core::model::{
    CardId, Collection, CollectionId, Kanji, KanjiCard, KanjiId, ReviewLog, ReviewScore,
};
use kanji_core::scheduler::SchedulingState;
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::{ReviewLogRecord, StorageError};

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

fn i64_to_u32(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn id_to_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn map_kanji_row(row: &SqliteRow) -> Result<Kanji, StorageError> {
    let text: String = row.try_get("character").map_err(ser)?;
    let mut chars = text.chars();
    let character = match (chars.next(), chars.next()) {
        (Some(c), None) => c,
        _ => {
            return Err(StorageError::Serialization(format!(
                "invalid kanji character: {text:?}"
            )));
        }
    };

    Ok(Kanji {
        id: KanjiId::new(i64_to_u64("kanji_id", row.try_get("id").map_err(ser)?)?),
        character,
        keyword: row.try_get("keyword").map_err(ser)?,
        heisig_index: i64_to_u32("heisig_index", row.try_get("heisig_index").map_err(ser)?)?,
    })
}

pub(crate) fn map_collection_row(row: &SqliteRow) -> Result<Collection, StorageError> {
    Collection::new(
        CollectionId::new(i64_to_u64("collection_id", row.try_get("id").map_err(ser)?)?),
        row.try_get::<String, _>("name").map_err(ser)?,
        row.try_get::<DateTime<Utc>, _>("created_at").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_card_row(row: &SqliteRow) -> Result<KanjiCard, StorageError> {
    let scheduling = SchedulingState::from_persisted(
        i64_to_u32("total_reviews", row.try_get("total_reviews").map_err(ser)?)?,
        i64_to_u32(
            "consecutive_correct",
            row.try_get("consecutive_correct").map_err(ser)?,
        )?,
        row.try_get::<f64, _>("efactor").map_err(ser)?,
        row.try_get::<NaiveDate, _>("last_reviewed").map_err(ser)?,
        row.try_get::<NaiveDate, _>("last_missed").map_err(ser)?,
        row.try_get::<NaiveDate, _>("next_review").map_err(ser)?,
    )
    .map_err(ser)?;

    KanjiCard::from_persisted(
        CardId::new(i64_to_u64("card_id", row.try_get("id").map_err(ser)?)?),
        CollectionId::new(i64_to_u64(
            "collection_id",
            row.try_get("collection_id").map_err(ser)?,
        )?),
        KanjiId::new(i64_to_u64("kanji_id", row.try_get("kanji_id").map_err(ser)?)?),
        row.try_get::<String, _>("mnemonic").map_err(ser)?,
        row.try_get::<DateTime<Utc>, _>("created_at").map_err(ser)?,
        scheduling,
        i64_to_u64("revision", row.try_get("revision").map_err(ser)?)?,
    )
    .map_err(ser)
}

pub(crate) fn map_review_log_row(row: &SqliteRow) -> Result<ReviewLogRecord, StorageError> {
    let score = ReviewScore::new(row.try_get::<i64, _>("score").map_err(ser)?).map_err(ser)?;
    Ok(ReviewLogRecord {
        id: row.try_get("id").map_err(ser)?,
        log: ReviewLog {
            card_id: CardId::new(i64_to_u64("card_id", row.try_get("card_id").map_err(ser)?)?),
            collection_id: CollectionId::new(i64_to_u64(
                "collection_id",
                row.try_get("collection_id").map_err(ser)?,
            )?),
            score,
            reviewed_on: row.try_get("reviewed_on").map_err(ser)?,
            next_review: row.try_get("next_review").map_err(ser)?,
            efactor: row.try_get("efactor").map_err(ser)?,
            consecutive_correct: i64_to_u32(
                "consecutive_correct",
                row.try_get("consecutive_correct").map_err(ser)?,
            )?,
        },
    })
}
