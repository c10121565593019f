use sable_core::CompilationError;
use thiserror::Error;

/// Failure of a [`Compilation`](crate::Compilation) step.
#[derive(Debug, Error)]
pub enum SableError {
    /// Errors were reported to the diagnostics; nothing is emitted.
    #[error("compilation failed with {errors} error(s)")]
    Failed { errors: usize },

    /// Emission hit an internal error.
    #[error(transparent)]
    Emit(#[from] CompilationError),
}

pub type SableResult<T> = Result<T, SableError>;
