pub mod repair;

use std::future::Future;

use async_trait::async_trait;
use serde::Serialize;

use crate::client::TokenUsage;
use crate::error::{SolveError, SolveResult};
use crate::parser::CandidateAnswer;
use crate::task::{Answer, TaskType};
use crate::verifier::VerificationResult;

/// One question to solve. Lives for a single request.
#[derive(Debug, Clone, PartialEq)]
pub struct SolveRequest {
    pub task_type: TaskType,
    pub question: String,
    /// Per-request attempt budget; must not exceed the configured maximum.
    pub max_attempts: Option<usize>,
}

impl SolveRequest {
    pub fn new(task_type: TaskType, question: impl Into<String>) -> Self {
        Self {
            task_type,
            question: question.into(),
            max_attempts: None,
        }
    }

    /// Build a request from an untrusted task-type name.
    pub fn from_parts(task_type: &str, question: impl Into<String>) -> SolveResult<Self> {
        Ok(Self::new(task_type.parse()?, question))
    }

    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    /// Check the request and resolve its attempt budget against `ceiling`.
    pub fn validate(&self, ceiling: usize) -> SolveResult<usize> {
        if self.question.trim().is_empty() {
            return Err(SolveError::InvalidRequest(
                "question must not be empty".to_string(),
            ));
        }
        match self.max_attempts {
            None => Ok(ceiling),
            Some(n) if (1..=ceiling).contains(&n) => Ok(n),
            Some(n) => Err(SolveError::InvalidRequest(format!(
                "max_attempts must be between 1 and {ceiling}, got {n}"
            ))),
        }
    }
}

/// A candidate and the judgment it received.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    pub candidate: CandidateAnswer,
    pub verification: VerificationResult,
}

/// Everything a caller learns from one solve.
///
/// `verified` is true only when the last history entry passed. When it is
/// false, `final_answer` is the last candidate's fields, best effort.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SolveOutcome {
    pub final_answer: Option<Answer>,
    pub verified: bool,
    pub attempts: usize,
    pub history: Vec<HistoryEntry>,
    pub usage: TokenUsage,
}

/// The outermost boundary. The HTTP layer and the CLI only know this trait.
#[async_trait]
pub trait Engine: Send + Sync {
    async fn solve(&self, request: &SolveRequest) -> SolveResult<SolveOutcome>;
}

/// Run `engine` on `request` unless `cancel` resolves first.
///
/// `None` means the solve was abandoned; the in-flight backend call is dropped.
pub async fn solve_or_cancel(
    engine: &dyn Engine,
    request: &SolveRequest,
    cancel: impl Future<Output = ()>,
) -> Option<SolveResult<SolveOutcome>> {
    tokio::select! {
        result = engine.solve(request) => Some(result),
        _ = cancel => None,
    }
}
