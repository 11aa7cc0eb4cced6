use kanji_core::model::{Kanji, KanjiId, ValidatedKanji};

use super::{
    SqliteRepository, conn,
    mapping::{id_to_i64, map_kanji_row},
    map_write_error,
};
use crate::repository::{KanjiRepository, StorageError};

#[async_trait::async_trait]
impl KanjiRepository for SqliteRepository {
    async fn insert_kanji(&self, kanji: ValidatedKanji) -> Result<Kanji, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO kanji (character, keyword, heisig_index)
            VALUES (?1, ?2, ?3)
            ",
        )
        .bind(kanji.character.to_string())
        .bind(kanji.keyword.as_str())
        .bind(i64::from(kanji.heisig_index))
        .execute(&self.pool)
        .await
        .map_err(map_write_error)?;

        let id = u64::try_from(res.last_insert_rowid())
            .map_err(|_| StorageError::Serialization("kanji_id sign overflow".into()))?;
        Ok(kanji.assign_id(KanjiId::new(id)))
    }

    async fn get_kanji(&self, id: KanjiId) -> Result<Option<Kanji>, StorageError> {
        let row = sqlx::query(
            "SELECT id, character, keyword, heisig_index FROM kanji WHERE id = ?1",
        )
        .bind(id_to_i64("kanji_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        row.as_ref().map(map_kanji_row).transpose()
    }

    async fn find_kanji(&self, character: char) -> Result<Option<Kanji>, StorageError> {
        let row = sqlx::query(
            "SELECT id, character, keyword, heisig_index FROM kanji WHERE character = ?1",
        )
        .bind(character.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        row.as_ref().map(map_kanji_row).transpose()
    }

    async fn list_kanji(&self) -> Result<Vec<Kanji>, StorageError> {
        let rows = sqlx::query(
            "SELECT id, character, keyword, heisig_index FROM kanji ORDER BY heisig_index ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_kanji_row).collect()
    }
}
