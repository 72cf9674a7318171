//! Success/failure outcome helpers.
//!
//! Every fallible operation in the workspace returns a plain
//! [`std::result::Result`], which already holds exactly one of a value or an
//! error. This module adds the vocabulary operational callers expect
//! (`success`, `failure`, `is_success`, `is_failure`) and guarded accessors
//! that report a contract violation instead of panicking when the wrong side
//! is read.

use thiserror::Error;

/// Raised when the wrong side of an outcome is accessed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum OutcomeAccessError {
    #[error("cannot access the value of a failed outcome")]
    ValueOnFailure,

    #[error("cannot access the error of a successful outcome")]
    ErrorOnSuccess,
}

/// Builds a successful outcome.
pub fn success<T, E>(value: T) -> Result<T, E> {
    Ok(value)
}

/// Builds a failed outcome.
pub fn failure<T, E>(error: E) -> Result<T, E> {
    Err(error)
}

/// Outcome accessors for [`Result`].
pub trait Outcome<T, E> {
    fn is_success(&self) -> bool;

    fn is_failure(&self) -> bool;

    /// The value, absent on failure.
    fn value(&self) -> Option<&T>;

    /// The error, absent on success.
    fn error(&self) -> Option<&E>;

    /// The value, or [`OutcomeAccessError::ValueOnFailure`].
    fn try_value(&self) -> Result<&T, OutcomeAccessError> {
        self.value().ok_or(OutcomeAccessError::ValueOnFailure)
    }

    /// The error, or [`OutcomeAccessError::ErrorOnSuccess`].
    fn try_error(&self) -> Result<&E, OutcomeAccessError> {
        self.error().ok_or(OutcomeAccessError::ErrorOnSuccess)
    }
}

impl<T, E> Outcome<T, E> for Result<T, E> {
    fn is_success(&self) -> bool {
        self.is_ok()
    }

    fn is_failure(&self) -> bool {
        self.is_err()
    }

    fn value(&self) -> Option<&T> {
        self.as_ref().ok()
    }

    fn error(&self) -> Option<&E> {
        self.as_ref().err()
    }
}
