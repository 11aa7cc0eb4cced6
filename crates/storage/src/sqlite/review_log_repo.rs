use kanji_core::model::{CardId, KanjiCard, ReviewLog};

use super::{
    SqliteRepository, conn,
    mapping::{id_to_i64, map_review_log_row},
};
use crate::repository::{
    AppliedWrite, ReviewLogRecord, ReviewLogRepository, ReviewPersistence, StorageError,
};

#[async_trait::async_trait]
impl ReviewLogRepository for SqliteRepository {
    async fn logs_for_card(&self, card_id: CardId) -> Result<Vec<ReviewLogRecord>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT
                    id, collection_id, card_id, score, reviewed_on,
                    next_review, efactor, consecutive_correct
                FROM review_logs
                WHERE card_id = ?1
                ORDER BY id ASC
            ",
        )
        .bind(id_to_i64("card_id", card_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_review_log_row).collect()
    }
}

#[async_trait::async_trait]
impl ReviewPersistence for SqliteRepository {
    async fn apply_review(
        &self,
        card: &KanjiCard,
        log: ReviewLog,
    ) -> Result<AppliedWrite, StorageError> {
        if log.card_id != card.id() || log.collection_id != card.collection_id() {
            return Err(StorageError::Conflict);
        }

        let card_id = id_to_i64("card_id", card.id().value())?;
        let collection_id = id_to_i64("collection_id", card.collection_id().value())?;
        let expected = id_to_i64("revision", card.revision())?;
        let revision = card.revision().wrapping_add(1);
        let state = card.scheduling();

        let mut tx = self.pool.begin().await.map_err(conn)?;

        let updated = sqlx::query(
            r"
            UPDATE cards SET
                total_reviews = ?1,
                consecutive_correct = ?2,
                efactor = ?3,
                last_reviewed = ?4,
                last_missed = ?5,
                next_review = ?6,
                revision = revision + 1
            WHERE id = ?7 AND collection_id = ?8 AND revision = ?9
            ",
        )
        .bind(i64::from(state.total_reviews()))
        .bind(i64::from(state.consecutive_correct()))
        .bind(state.efactor())
        .bind(state.last_reviewed())
        .bind(state.last_missed())
        .bind(state.next_review())
        .bind(card_id)
        .bind(collection_id)
        .bind(expected)
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        if updated.rows_affected() == 0 {
            let exists = sqlx::query("SELECT 1 FROM cards WHERE id = ?1 AND collection_id = ?2")
                .bind(card_id)
                .bind(collection_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(conn)?
                .is_some();
            tx.rollback().await.map_err(conn)?;
            if !exists {
                return Err(StorageError::NotFound);
            }
            tracing::warn!(
                card_id = %card.id(),
                expected = card.revision(),
                "stale review write rejected"
            );
            return Err(StorageError::Conflict);
        }

        let res = sqlx::query(
            r"
                INSERT INTO review_logs (
                    collection_id, card_id, score, reviewed_on,
                    next_review, efactor, consecutive_correct
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ",
        )
        .bind(collection_id)
        .bind(card_id)
        .bind(i64::from(log.score))
        .bind(log.reviewed_on)
        .bind(log.next_review)
        .bind(log.efactor)
        .bind(i64::from(log.consecutive_correct))
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        tx.commit().await.map_err(conn)?;

        Ok(AppliedWrite {
            revision,
            log_id: res.last_insert_rowid(),
        })
    }
}
