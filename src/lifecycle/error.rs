use crate::db::SessionStatus;

use super::state::Operation;

#[derive(thiserror::Error, Debug)]
pub enum LifecycleError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("session {0} not found")]
    NotFound(String),

    #[error(
        "Cannot {operation} session: session must be in {} state, current state: {status}",
        .operation.required_description()
    )]
    InvalidTransition {
        operation: Operation,
        status: SessionStatus,
    },

    #[error("storage failure: {0:#}")]
    Storage(#[from] anyhow::Error),
}

impl From<rusqlite::Error> for LifecycleError {
    fn from(err: rusqlite::Error) -> Self {
        LifecycleError::Storage(anyhow::Error::new(err))
    }
}

impl LifecycleError {
    pub fn kind(&self) -> &'static str {
        match self {
            LifecycleError::Validation(_) => "validation_error",
            LifecycleError::NotFound(_) => "not_found",
            LifecycleError::InvalidTransition { .. } => "invalid_transition",
            LifecycleError::Storage(_) => "storage_failure",
        }
    }
}

pub type LifecycleResult<T> = Result<T, LifecycleError>;
