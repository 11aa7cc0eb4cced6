#![forbid(unsafe_code)]

pub mod app_services;
pub mod card_service;
pub mod error;
pub mod review_service;
pub mod study;

pub use kanji_core::Clock;

pub use app_services::AppServices;
pub use card_service::{CardService, CollectionStats};
pub use error::{AppServicesError, CardServiceError, ReviewServiceError, StudyError};
pub use review_service::{PersistedReview, ReviewService};
pub use study::{StudyAnswer, StudyCard, StudyLoopService, StudyTally};
