use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::CollectionId;

const MAX_NAME_CHARS: usize = 50;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CollectionError {
    #[error("collection name cannot be empty")]
    EmptyName,

    #[error("collection name must be at most 50 characters")]
    NameTooLong,
}

/// Unvalidated collection input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionDraft {
    pub name: String,
}

impl CollectionDraft {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Validate the draft as of `now`.
    ///
    /// # Errors
    ///
    /// Returns `CollectionError` if the trimmed name is empty or too long.
    pub fn validate(self, now: DateTime<Utc>) -> Result<ValidatedCollection, CollectionError> {
        Ok(ValidatedCollection {
            name: validate_name(self.name)?,
            created_at: now,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedCollection {
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl ValidatedCollection {
    #[must_use]
    pub fn assign_id(self, id: CollectionId) -> Collection {
        Collection {
            id,
            name: self.name,
            created_at: self.created_at,
        }
    }
}

/// A named set of kanji cards studied together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    id: CollectionId,
    name: String,
    created_at: DateTime<Utc>,
}

impl Collection {
    /// Creates a collection with a validated name.
    ///
    /// # Errors
    ///
    /// Returns `CollectionError` if the trimmed name is empty or too long.
    pub fn new(
        id: CollectionId,
        name: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, CollectionError> {
        let name = validate_name(name.into())?;
        Ok(Self {
            id,
            name,
            created_at,
        })
    }

    #[must_use]
    pub fn id(&self) -> CollectionId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Renames the collection.
    ///
    /// # Errors
    ///
    /// Returns `CollectionError` if the new name is invalid; the old name is kept.
    pub fn rename(&mut self, name: impl Into<String>) -> Result<(), CollectionError> {
        self.name = validate_name(name.into())?;
        Ok(())
    }
}

fn validate_name(raw: String) -> Result<String, CollectionError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(CollectionError::EmptyName);
    }
    if trimmed.chars().count() > MAX_NAME_CHARS {
        return Err(CollectionError::NameTooLong);
    }
    Ok(trimmed.to_owned())
}
