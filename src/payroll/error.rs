//! Error kinds shared across the payroll core (spec.md §7).
//!
//! These map to the error *kinds* the spec names, not to the original
//! source's Django `ValueError`/exception soup: `Validation`,
//! `IllegalTransition`, `NotFound`, `RateResolution`, `FormulaEvaluation`,
//! `ConcurrencyConflict`, `External`, and `Internal`.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum PayrollError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("illegal transition: cannot {action} from {current} (attempted {attempted})")]
    IllegalTransition {
        action: String,
        current: String,
        attempted: String,
    },

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("no active {kind} rate for date {as_of}")]
    RateResolution { kind: String, as_of: chrono::NaiveDate },

    #[error("formula evaluation failed: {0}")]
    FormulaEvaluation(String),

    #[error("concurrency conflict: {0}")]
    ConcurrencyConflict(String),

    #[error("external collaborator failed: {0}")]
    External(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type PayrollResult<T> = Result<T, PayrollError>;

impl PayrollError {
    pub fn illegal_transition(action: &str, current: impl ToString, attempted: impl ToString) -> Self {
        PayrollError::IllegalTransition {
            action: action.to_string(),
            current: current.to_string(),
            attempted: attempted.to_string(),
        }
    }
}
