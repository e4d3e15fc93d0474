use thiserror::Error;
use validator::ValidationErrors;

use crate::dao::{
    models::{GuildId, PuzzleKey},
    storage::StorageError,
};

/// Errors surfaced by the settings and puzzle repositories.
///
/// "Not found" cases are distinct from storage failures so callers can react
/// differently (offer to create vs. report an error).
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Underlying storage failed; not retried here.
    #[error("storage unavailable")]
    Unavailable(#[source] StorageError),
    /// The guild has no settings record yet.
    #[error("no settings stored for guild {0}")]
    SettingsNotFound(GuildId),
    /// No puzzle record matches the composite key.
    #[error("no puzzle record for {0}")]
    MissingPuzzle(PuzzleKey),
    /// A record failed invariant validation and was not persisted.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        ServiceError::Unavailable(err)
    }
}

impl From<ValidationErrors> for ServiceError {
    fn from(err: ValidationErrors) -> Self {
        ServiceError::InvalidInput(format!("validation failed: {err}"))
    }
}
