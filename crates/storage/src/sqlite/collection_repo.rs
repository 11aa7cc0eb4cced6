use kanji_core::model::{Collection, CollectionId, ValidatedCollection};

use super::{
    SqliteRepository, conn,
    mapping::{id_to_i64, map_collection_row},
    map_write_error,
};
use crate::repository::{CollectionRepository, StorageError};

#[async_trait::async_trait]
impl CollectionRepository for SqliteRepository {
    async fn insert_collection(
        &self,
        collection: ValidatedCollection,
    ) -> Result<Collection, StorageError> {
        let res = sqlx::query("INSERT INTO collections (name, created_at) VALUES (?1, ?2)")
            .bind(collection.name.as_str())
            .bind(collection.created_at)
            .execute(&self.pool)
            .await
            .map_err(map_write_error)?;

        let id = u64::try_from(res.last_insert_rowid())
            .map_err(|_| StorageError::Serialization("collection_id sign overflow".into()))?;
        Ok(collection.assign_id(CollectionId::new(id)))
    }

    async fn get_collection(&self, id: CollectionId) -> Result<Option<Collection>, StorageError> {
        let row = sqlx::query("SELECT id, name, created_at FROM collections WHERE id = ?1")
            .bind(id_to_i64("collection_id", id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        row.as_ref().map(map_collection_row).transpose()
    }

    async fn find_collection(&self, name: &str) -> Result<Option<Collection>, StorageError> {
        let row = sqlx::query("SELECT id, name, created_at FROM collections WHERE name = ?1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        row.as_ref().map(map_collection_row).transpose()
    }
}
