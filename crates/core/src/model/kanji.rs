use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::KanjiId;

const MAX_KEYWORD_CHARS: usize = 50;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum KanjiError {
    #[error("kanji character cannot be empty")]
    EmptyCharacter,

    #[error("kanji must be exactly one character, got {0:?}")]
    MultipleCharacters(String),

    #[error("kanji keyword cannot be empty")]
    EmptyKeyword,

    #[error("kanji keyword must be at most 50 characters")]
    KeywordTooLong,

    #[error("heisig index must be positive")]
    InvalidHeisigIndex,
}

/// Unvalidated kanji input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KanjiDraft {
    pub character: String,
    pub keyword: String,
    pub heisig_index: u32,
}

impl KanjiDraft {
    #[must_use]
    pub fn new(character: impl Into<String>, keyword: impl Into<String>, heisig_index: u32) -> Self {
        Self {
            character: character.into(),
            keyword: keyword.into(),
            heisig_index,
        }
    }

    /// Validate the draft.
    ///
    /// # Errors
    ///
    /// Returns `KanjiError` when the character is not a single non-blank
    /// character, the keyword is blank or too long, or the index is zero.
    pub fn validate(self) -> Result<ValidatedKanji, KanjiError> {
        let trimmed = self.character.trim();
        let mut chars = trimmed.chars();
        let character = match (chars.next(), chars.next()) {
            (None, _) => return Err(KanjiError::EmptyCharacter),
            (Some(c), None) => c,
            (Some(_), Some(_)) => {
                return Err(KanjiError::MultipleCharacters(trimmed.to_owned()));
            }
        };

        let keyword = self.keyword.trim();
        if keyword.is_empty() {
            return Err(KanjiError::EmptyKeyword);
        }
        if keyword.chars().count() > MAX_KEYWORD_CHARS {
            return Err(KanjiError::KeywordTooLong);
        }
        if self.heisig_index == 0 {
            return Err(KanjiError::InvalidHeisigIndex);
        }

        Ok(ValidatedKanji {
            character,
            keyword: keyword.to_owned(),
            heisig_index: self.heisig_index,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedKanji {
    pub character: char,
    pub keyword: String,
    pub heisig_index: u32,
}

impl ValidatedKanji {
    #[must_use]
    pub fn assign_id(self, id: KanjiId) -> Kanji {
        Kanji {
            id,
            character: self.character,
            keyword: self.keyword,
            heisig_index: self.heisig_index,
        }
    }
}

/// A single character with its keyword and position in Heisig's ordering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Kanji {
    pub id: KanjiId,
    pub character: char,
    pub keyword: String,
    pub heisig_index: u32,
}
