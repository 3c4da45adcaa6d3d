use thiserror::Error;

/// Errors that may occur during DTO generation.
#[derive(Debug, Error)]
pub enum Error {
    /// The executors failed to accept or run the batch.
    #[error(transparent)]
    Executor(#[from] dtogen_executor::Error),

    /// DTOs cannot be declared in an empty namespace.
    #[error("DTO namespace must not be empty")]
    EmptyNamespace,
}
