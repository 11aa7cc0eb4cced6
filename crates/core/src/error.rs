use thiserror::Error;

use crate::model::{CardError, CollectionError, KanjiError, ReviewError};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Review(#[from] ReviewError),
    #[error(transparent)]
    Kanji(#[from] KanjiError),
    #[error(transparent)]
    Collection(#[from] CollectionError),
    #[error(transparent)]
    Card(#[from] CardError),
}
