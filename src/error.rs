//! Error handling module
//!
//! Centralized error types for command handlers and jobs.

use uuid::Uuid;

use crate::pipeline::HookError;
use crate::repository::RepositoryError;

/// Application-wide Result type
pub type AppResult<T> = Result<T, AppError>;

/// Application error types
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Command rejections
    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    #[error("Character not found: {0}")]
    CharacterNotFound(Uuid),

    #[error("Party not found: {0}")]
    PartyNotFound(Uuid),

    #[error("Version conflict: concurrent modification detected")]
    VersionConflict,

    // Domain errors
    #[error(transparent)]
    Domain(#[from] crate::domain::DomainError),

    // Infrastructure errors
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

impl AppError {
    /// Whether the caller can fix this by retrying with fresh state
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::VersionConflict)
    }
}

/// Commit failures surface as a version conflict when another writer won the
/// race; everything else is an infrastructure error.
impl From<HookError> for AppError {
    fn from(error: HookError) -> Self {
        if error.is_concurrency_conflict() {
            return AppError::VersionConflict;
        }

        match error {
            HookError::Store(store_error) => {
                AppError::Repository(RepositoryError::Store(store_error))
            }
        }
    }
}
