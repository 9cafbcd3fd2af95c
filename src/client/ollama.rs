use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Completion, ModelClient, TokenUsage};
use crate::config::Config;
use crate::consts::HEALTH_TIMEOUT;
use crate::error::{SolveError, SolveResult};
use crate::prompts::{Prompt, Stage};

/// A client for a local Ollama server's chat endpoint.
pub struct OllamaClient {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    verifier_model: String,
    temperature: f32,
    seed: u64,
}

impl OllamaClient {
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            verifier_model: config.verifier_model.clone(),
            temperature: config.temperature,
            seed: config.seed,
        }
    }

    /// Probe `GET /api/tags` to check the server is up.
    pub async fn health(&self) -> SolveResult<()> {
        let url = format!("{}/api/tags", self.endpoint);
        let resp = self
            .http
            .get(&url)
            .timeout(HEALTH_TIMEOUT)
            .send()
            .await
            .map_err(|e| map_transport_error(e, HEALTH_TIMEOUT))?;

        if !resp.status().is_success() {
            return Err(SolveError::BackendUnavailable(format!(
                "health check returned {}",
                resp.status()
            )));
        }
        Ok(())
    }

    fn build_request<'a>(&'a self, prompt: &'a Prompt) -> ChatRequest<'a> {
        ChatRequest {
            model: self.model(prompt.stage),
            messages: vec![
                Message {
                    role: "system",
                    content: prompt.system,
                },
                Message {
                    role: "user",
                    content: &prompt.user,
                },
            ],
            stream: false,
            options: Options {
                temperature: self.temperature,
                seed: self.seed,
            },
        }
    }
}

#[async_trait]
impl ModelClient for OllamaClient {
    fn model(&self, stage: Stage) -> &str {
        match stage {
            Stage::Verify => &self.verifier_model,
            Stage::Solve | Stage::Repair => &self.model,
        }
    }

    async fn complete(&self, prompt: &Prompt, timeout: Duration) -> SolveResult<Completion> {
        let url = format!("{}/api/chat", self.endpoint);
        let body = self.build_request(prompt);

        let resp = self
            .http
            .post(&url)
            .timeout(timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| map_transport_error(e, timeout))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(SolveError::BackendUnavailable(format!(
                "ollama returned {status}: {}",
                text.trim()
            )));
        }

        let chat: ChatResponse = resp.json().await.map_err(|e| {
            if e.is_timeout() {
                SolveError::BackendTimeout(timeout)
            } else {
                SolveError::BackendUnavailable(format!("malformed ollama response: {e}"))
            }
        })?;

        let text = chat.message.content;
        if text.trim().is_empty() {
            return Err(SolveError::BackendUnavailable(
                "ollama returned an empty response".to_string(),
            ));
        }

        let usage = match (chat.prompt_eval_count, chat.eval_count) {
            (None, None) => None,
            (input, output) => Some(TokenUsage {
                input_tokens: input.unwrap_or(0),
                output_tokens: output.unwrap_or(0),
            }),
        };

        debug!(
            stage = %prompt.stage,
            model = body.model,
            chars = text.len(),
            "ollama completion received"
        );

        Ok(Completion { text, usage })
    }
}

fn map_transport_error(e: reqwest::Error, timeout: Duration) -> SolveError {
    if e.is_timeout() {
        SolveError::BackendTimeout(timeout)
    } else {
        SolveError::BackendUnavailable(e.to_string())
    }
}

// --- API types ---

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    stream: bool,
    options: Options,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct Options {
    temperature: f32,
    seed: u64,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ResponseMessage,
    prompt_eval_count: Option<u64>,
    eval_count: Option<u64>,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: String,
}
