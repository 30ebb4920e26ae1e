use thiserror::Error;
use uuid::Uuid;

/// Errors raised by the [`ApplicationRegistry`](super::ApplicationRegistry).
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Application {0} not found")]
    NotFound(Uuid),

    #[error("Persistence error: {0}")]
    Persistence(#[from] sqlx::Error),
}
