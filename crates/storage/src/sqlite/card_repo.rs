use chrono::NaiveDate;
use kanji_core::model::{CardId, CollectionId, KanjiCard, ValidatedCard};
use kanji_core::selector::DuePolicy;
use sqlx::Row;

use super::{
    SqliteRepository, conn,
    mapping::{id_to_i64, map_card_row},
    map_write_error,
};
use crate::repository::{CardRepository, StorageError};

const CARD_COLUMNS: &str = r"
    id, collection_id, kanji_id, mnemonic, created_at,
    total_reviews, consecutive_correct, efactor,
    last_reviewed, last_missed, next_review, revision
";

fn due_filter(policy: DuePolicy) -> &'static str {
    match policy {
        DuePolicy::ScheduledToday => "collection_id = ?1 AND next_review = ?2",
        DuePolicy::IncludeOverdue => "collection_id = ?1 AND next_review <= ?2",
    }
}

#[async_trait::async_trait]
impl CardRepository for SqliteRepository {
    async fn insert_card(&self, card: ValidatedCard) -> Result<KanjiCard, StorageError> {
        let collection_id = id_to_i64("collection_id", card.collection_id.value())?;
        let kanji_id = id_to_i64("kanji_id", card.kanji_id.value())?;
        let created_on = card.created_at.date_naive();

        let res = sqlx::query(
            r"
            INSERT INTO cards (
                collection_id, kanji_id, mnemonic, created_at,
                total_reviews, consecutive_correct, efactor,
                last_reviewed, last_missed, next_review, revision
            )
            VALUES (?1, ?2, ?3, ?4, 0, 0, ?5, ?6, ?6, ?6, 0)
            ",
        )
        .bind(collection_id)
        .bind(kanji_id)
        .bind(card.mnemonic.as_str())
        .bind(card.created_at)
        .bind(kanji_core::scheduler::INITIAL_EFACTOR)
        .bind(created_on)
        .execute(&self.pool)
        .await
        .map_err(map_write_error)?;

        let id = u64::try_from(res.last_insert_rowid())
            .map_err(|_| StorageError::Serialization("card_id sign overflow".into()))?;
        Ok(card.assign_id(CardId::new(id)))
    }

    async fn get_card(&self, id: CardId) -> Result<Option<KanjiCard>, StorageError> {
        let sql = format!("SELECT {CARD_COLUMNS} FROM cards WHERE id = ?1");
        let row = sqlx::query(&sql)
            .bind(id_to_i64("card_id", id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        row.as_ref().map(map_card_row).transpose()
    }

    async fn list_cards(&self, collection_id: CollectionId) -> Result<Vec<KanjiCard>, StorageError> {
        let sql = format!("SELECT {CARD_COLUMNS} FROM cards WHERE collection_id = ?1 ORDER BY id ASC");
        let rows = sqlx::query(&sql)
            .bind(id_to_i64("collection_id", collection_id.value())?)
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;

        rows.iter().map(map_card_row).collect()
    }

    async fn next_due(
        &self,
        collection_id: CollectionId,
        today: NaiveDate,
        policy: DuePolicy,
    ) -> Result<Option<KanjiCard>, StorageError> {
        let sql = format!(
            r"
            SELECT {CARD_COLUMNS}
            FROM cards
            WHERE {filter}
            ORDER BY last_missed DESC, consecutive_correct ASC, efactor ASC, id ASC
            LIMIT 1
            ",
            filter = due_filter(policy),
        );
        let row = sqlx::query(&sql)
            .bind(id_to_i64("collection_id", collection_id.value())?)
            .bind(today)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        row.as_ref().map(map_card_row).transpose()
    }

    async fn due_count(
        &self,
        collection_id: CollectionId,
        today: NaiveDate,
        policy: DuePolicy,
    ) -> Result<u32, StorageError> {
        let sql = format!(
            "SELECT COUNT(*) AS due FROM cards WHERE {filter}",
            filter = due_filter(policy),
        );
        let row = sqlx::query(&sql)
            .bind(id_to_i64("collection_id", collection_id.value())?)
            .bind(today)
            .fetch_one(&self.pool)
            .await
            .map_err(conn)?;

        let due: i64 = row
            .try_get("due")
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        u32::try_from(due).map_err(|_| StorageError::Serialization(format!("invalid due count: {due}")))
    }
}
