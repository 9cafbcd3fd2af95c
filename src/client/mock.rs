use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use super::{Completion, ModelClient, TokenUsage};
use crate::error::{SolveError, SolveResult};
use crate::prompts::{Prompt, Stage};

/// One scripted backend reaction.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Return this text.
    Text(String),
    /// Fail as if the backend were down.
    Unavailable,
    /// Never answer; the caller's timeout has to fire.
    Hang,
}

impl From<&str> for MockReply {
    fn from(text: &str) -> Self {
        MockReply::Text(text.to_string())
    }
}

impl From<String> for MockReply {
    fn from(text: String) -> Self {
        MockReply::Text(text)
    }
}

/// A scripted backend for tests. Replies in order and records every prompt.
pub struct MockModel {
    replies: Vec<MockReply>,
    index: AtomicUsize,
    usage: Option<TokenUsage>,
    prompts: Mutex<Vec<Prompt>>,
}

impl MockModel {
    pub fn new<R: Into<MockReply>>(replies: impl IntoIterator<Item = R>) -> Self {
        Self {
            replies: replies.into_iter().map(Into::into).collect(),
            index: AtomicUsize::new(0),
            usage: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Report `usage` on every completion.
    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = Some(usage);
        self
    }

    /// Prompts received so far, in order.
    pub fn prompts(&self) -> Vec<Prompt> {
        self.prompts.lock().unwrap().clone()
    }

    /// Number of completions requested so far.
    pub fn calls(&self) -> usize {
        self.index.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ModelClient for MockModel {
    fn model(&self, _stage: Stage) -> &str {
        "mock"
    }

    async fn complete(&self, prompt: &Prompt, _timeout: Duration) -> SolveResult<Completion> {
        self.prompts.lock().unwrap().push(prompt.clone());
        let i = self.index.fetch_add(1, Ordering::SeqCst);
        let reply = self.replies.get(i).cloned().ok_or_else(|| {
            SolveError::BackendUnavailable(format!(
                "MockModel: no more replies (called {} times)",
                i + 1
            ))
        })?;

        match reply {
            MockReply::Text(text) => Ok(Completion {
                text,
                usage: self.usage,
            }),
            MockReply::Unavailable => Err(SolveError::BackendUnavailable(
                "MockModel: scripted outage".to_string(),
            )),
            MockReply::Hang => std::future::pending().await,
        }
    }
}
