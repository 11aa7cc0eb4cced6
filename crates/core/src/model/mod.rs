mod card;
mod collection;
mod ids;
mod kanji;
mod review;

pub use ids::{CardId, CollectionId, KanjiId, ParseIdError};

pub use card::{CardDraft, CardError, KanjiCard, ValidatedCard};
pub use collection::{Collection, CollectionDraft, CollectionError, ValidatedCollection};
pub use kanji::{Kanji, KanjiDraft, KanjiError, ValidatedKanji};
pub use review::{ReviewError, ReviewLog, ReviewOutcome, ReviewScore};
