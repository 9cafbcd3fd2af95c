pub mod mock;
pub mod ollama;

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::{SolveError, SolveResult};
use crate::prompts::Prompt;

/// Token usage from one or more backend calls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl TokenUsage {
    /// Accumulate another usage into this one.
    pub fn add(&mut self, other: TokenUsage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
    }

    /// Total tokens (input + output).
    pub fn total(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}

/// Raw text from the backend plus optional token usage.
#[derive(Debug, Clone)]
pub struct Completion {
    pub text: String,
    pub usage: Option<TokenUsage>,
}

/// The text-completion backend. Could be Ollama, or a test script.
///
/// Implementations do no retrying of their own; the repair loop decides
/// what happens after a failure.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Model used for a stage, for logs and response metadata.
    fn model(&self, stage: crate::prompts::Stage) -> &str;

    /// Fails with `BackendUnavailable` or `BackendTimeout`.
    async fn complete(&self, prompt: &Prompt, timeout: Duration) -> SolveResult<Completion>;
}

/// Call `client`, abandoning the request if it outlives `timeout`.
pub async fn complete_within(
    client: &dyn ModelClient,
    prompt: &Prompt,
    timeout: Duration,
) -> SolveResult<Completion> {
    match tokio::time::timeout(timeout, client.complete(prompt, timeout)).await {
        Ok(result) => result,
        Err(_) => Err(SolveError::BackendTimeout(timeout)),
    }
}
