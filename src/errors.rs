use std::time::Duration;

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use thiserror::Error;

/// Errors surfaced by engine operations
#[derive(Error, Debug)]
pub enum EngineError {
    /// A state transition or value would break a domain rule
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),
    /// Missing entity, or one owned by somebody else
    #[error("Not found")]
    NotFound,
    /// The materializer could not place a session
    #[error("Schedule infeasible: {0}")]
    ScheduleInfeasible(String),
    #[error("Storage error: {0}")]
    Storage(anyhow::Error),
}

pub type EngineResult<T> = Result<T, EngineError>;

impl EngineError {
    pub fn invariant(message: impl Into<String>) -> Self {
        EngineError::InvariantViolation(message.into())
    }
}

/// A guarded write found the record in an unexpected state
///
/// Raised inside repository transactions to roll them back. Converted into
/// `EngineError::InvariantViolation` at the engine boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct WriteConflict(pub String);

impl From<anyhow::Error> for EngineError {
    fn from(err: anyhow::Error) -> Self {
        if let Some(conflict) = err.downcast_ref::<WriteConflict>() {
            return EngineError::InvariantViolation(conflict.0.clone());
        }
        if let Some(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info)) =
            err.downcast_ref::<DieselError>()
        {
            return EngineError::InvariantViolation(format!(
                "unique constraint violated: {}",
                info.message()
            ));
        }
        EngineError::Storage(err)
    }
}

impl From<DieselError> for EngineError {
    fn from(err: DieselError) -> Self {
        EngineError::from(anyhow::Error::from(err))
    }
}

/// A rejected advisor response, naming the first offending field path
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid field `{field}`: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Failures inside the advisor client
///
/// These are logged and collapsed to `None` before reaching callers.
#[derive(Error, Debug)]
pub enum AdvisorError {
    #[error("advisor is disabled")]
    Disabled,
    #[error("advisor call timed out after {0:?}")]
    Timeout(Duration),
    #[error("advisor call cancelled")]
    Cancelled,
    #[error("provider error: {0}")]
    Provider(String),
    #[error("malformed advisor response: {0}")]
    Malformed(String),
    #[error("advisor response rejected: {0}")]
    Rejected(#[from] ValidationError),
}

impl From<reqwest::Error> for AdvisorError {
    fn from(err: reqwest::Error) -> Self {
        AdvisorError::Provider(err.to_string())
    }
}
