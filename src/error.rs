//! Errors surfaced to callers of the solve loop.
//!
//! Parse and schema failures are not here: they are consumed by the repair
//! loop and recorded in the outcome history (see [`crate::parser::ParseFailure`]).

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SolveError {
    /// Rejected before any backend call.
    #[error("unsupported task type: {0} (expected one of mcq, numeric, proof_outline, short_answer)")]
    UnsupportedTaskType(String),

    /// Malformed request, rejected before any backend call.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("backend timed out after {}s", .0.as_secs_f64())]
    BackendTimeout(Duration),
}

impl SolveError {
    /// Backend failures are transient; everything else is the caller's fault.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SolveError::BackendUnavailable(_) | SolveError::BackendTimeout(_)
        )
    }
}

pub type SolveResult<T> = std::result::Result<T, SolveError>;
