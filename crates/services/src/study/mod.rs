mod tally;
mod workflow;

// Public API of the study subsystem.
pub use crate::error::StudyError;
pub use tally::StudyTally;
pub use workflow::{StudyAnswer, StudyCard, StudyLoopService};
