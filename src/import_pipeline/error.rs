//! Errors surfaced across the import pipeline (spec.md §7).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("{0}")]
    Validation(String),

    #[error("{entity} not found: {reference}")]
    NotFound { entity: &'static str, reference: String },

    /// An AI collaborator call failed. Callers fall back to the fuzzy
    /// matcher rather than surfacing this to the end user — it is only
    /// ever logged via `tracing::warn!`.
    #[error("external collaborator error: {0}")]
    External(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type ImportResult<T> = Result<T, ImportError>;
