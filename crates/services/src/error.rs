//! Shared error types for the services crate.

use thiserror::Error;

use kanji_core::model::{CardError, CollectionError, ReviewError};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by `ReviewService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ReviewServiceError {
    #[error(transparent)]
    Review(#[from] ReviewError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `CardService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CardServiceError {
    #[error("no kanji {0} in the catalogue")]
    UnknownKanji(char),
    #[error(transparent)]
    Card(#[from] CardError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by the study loop.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StudyError {
    #[error("no cards due for review")]
    NothingDue,
    #[error(transparent)]
    Review(#[from] ReviewError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<ReviewServiceError> for StudyError {
    fn from(err: ReviewServiceError) -> Self {
        match err {
            ReviewServiceError::Review(e) => StudyError::Review(e),
            ReviewServiceError::Storage(e) => StudyError::Storage(e),
        }
    }
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Collection(#[from] CollectionError),
}
