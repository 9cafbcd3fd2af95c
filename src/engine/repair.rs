use std::sync::Arc;

use async_trait::async_trait;
use tracing::{Instrument, info, info_span, warn};

use super::{Engine, HistoryEntry, SolveOutcome, SolveRequest};
use crate::client::{ModelClient, TokenUsage, complete_within};
use crate::config::Config;
use crate::error::SolveResult;
use crate::parser::{CandidateAnswer, parse};
use crate::prompts::{build_repair_prompt, build_solve_prompt};
use crate::verifier::{VerificationResult, Verifier};

/// Critique recorded when a response has no usable JSON.
pub const PARSE_FAILURE_CRITIQUE: &str = "could not parse structured output";

/// Critique handed to the fixer when the verifier rejected without saying why.
const MISSING_CRITIQUE: &str = "the verifier rejected this answer; re-check it";

/// Where the loop is. `Accepted` and `Exhausted` are terminal.
enum State {
    Solving {
        previous: Option<(CandidateAnswer, String)>,
    },
    Verifying(CandidateAnswer),
    Repairing {
        candidate: CandidateAnswer,
        critique: String,
    },
    Accepted(CandidateAnswer),
    Exhausted,
}

/// Solve → verify → repair, bounded by the attempt budget.
pub struct RepairEngine {
    client: Arc<dyn ModelClient>,
    verifier: Verifier,
    config: Config,
}

impl RepairEngine {
    pub fn new(client: Arc<dyn ModelClient>, config: Config) -> Self {
        let verifier = Verifier::new(Arc::clone(&client), config.timeout);
        Self {
            client,
            verifier,
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    async fn run(&self, request: &SolveRequest, max_attempts: usize) -> SolveResult<SolveOutcome> {
        let task_type = request.task_type;
        let question = request.question.trim();

        let mut attempts = 1;
        let mut history: Vec<HistoryEntry> = Vec::new();
        let mut usage = TokenUsage::default();
        let mut state = State::Solving { previous: None };

        loop {
            state = match state {
                State::Solving { previous } => {
                    let prompt = match &previous {
                        None => build_solve_prompt(task_type, question),
                        Some((candidate, critique)) => {
                            build_repair_prompt(task_type, question, candidate, critique)
                        }
                    };
                    info!(attempt = attempts, stage = %prompt.stage, "requesting candidate");

                    let completion =
                        complete_within(self.client.as_ref(), &prompt, self.config.timeout).await?;
                    if let Some(u) = completion.usage {
                        usage.add(u);
                    }

                    match parse(task_type, &completion.text) {
                        Ok(candidate) => State::Verifying(candidate),
                        Err(failure) => {
                            let critique = format!("{PARSE_FAILURE_CRITIQUE}: {failure}");
                            warn!(attempt = attempts, %failure, "candidate rejected before verification");
                            let candidate = CandidateAnswer::unparsed(completion.text);
                            history.push(HistoryEntry {
                                candidate: candidate.clone(),
                                verification: VerificationResult::fail(critique.clone()),
                            });
                            after_failure(attempts, max_attempts, candidate, critique)
                        }
                    }
                }

                State::Verifying(candidate) => {
                    let (verification, verify_usage) =
                        self.verifier.verify(task_type, question, &candidate).await?;
                    if let Some(u) = verify_usage {
                        usage.add(u);
                    }
                    history.push(HistoryEntry {
                        candidate: candidate.clone(),
                        verification: verification.clone(),
                    });

                    if verification.passed {
                        State::Accepted(candidate)
                    } else {
                        let critique = verification
                            .critique
                            .unwrap_or_else(|| MISSING_CRITIQUE.to_string());
                        after_failure(attempts, max_attempts, candidate, critique)
                    }
                }

                State::Repairing {
                    candidate,
                    critique,
                } => {
                    attempts += 1;
                    if !self.config.retry_delay.is_zero() {
                        tokio::time::sleep(self.config.retry_delay).await;
                    }
                    State::Solving {
                        previous: Some((candidate, critique)),
                    }
                }

                State::Accepted(candidate) => {
                    info!(attempts, "answer verified");
                    return Ok(SolveOutcome {
                        final_answer: candidate.structured_fields,
                        verified: true,
                        attempts,
                        history,
                        usage,
                    });
                }

                State::Exhausted => {
                    warn!(attempts, "attempt budget exhausted without a verified answer");
                    let final_answer = history
                        .last()
                        .and_then(|entry| entry.candidate.structured_fields.clone());
                    return Ok(SolveOutcome {
                        final_answer,
                        verified: false,
                        attempts,
                        history,
                        usage,
                    });
                }
            };
        }
    }
}

/// A failed attempt repairs while budget remains, otherwise the loop ends.
fn after_failure(
    attempts: usize,
    max_attempts: usize,
    candidate: CandidateAnswer,
    critique: String,
) -> State {
    if attempts < max_attempts {
        State::Repairing {
            candidate,
            critique,
        }
    } else {
        State::Exhausted
    }
}

#[async_trait]
impl Engine for RepairEngine {
    async fn solve(&self, request: &SolveRequest) -> SolveResult<SolveOutcome> {
        let max_attempts = request.validate(self.config.max_attempts)?;
        let span = info_span!("solve", task_type = %request.task_type, max_attempts);
        self.run(request, max_attempts).instrument(span).await
    }
}
