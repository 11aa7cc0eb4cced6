#![forbid(unsafe_code)]

pub mod error;
pub mod model;
pub mod scheduler;
pub mod selector;
pub mod time;

pub use error::Error;
pub use scheduler::{IntervalRounding, ScheduledReview, Scheduler, SchedulerConfig};
pub use selector::{DuePolicy, DueSelector};
pub use time::Clock;
