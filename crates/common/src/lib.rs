//! Shared types for the aggregate persistence core.

pub mod outcome;
pub mod types;

pub use outcome::{Outcome, OutcomeAccessError, failure, success};
pub use types::AggregateId;
