//! Ask the backend to judge a candidate answer.
//!
//! An unreadable verdict counts as a failure, never as a pass.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::client::{ModelClient, TokenUsage, complete_within};
use crate::error::SolveResult;
use crate::parser::{CandidateAnswer, first_object};
use crate::prompts::build_verify_prompt;
use crate::task::TaskType;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationResult {
    pub passed: bool,
    pub critique: Option<String>,
}

impl VerificationResult {
    pub fn pass() -> Self {
        Self {
            passed: true,
            critique: None,
        }
    }

    pub fn fail(critique: impl Into<String>) -> Self {
        Self {
            passed: false,
            critique: Some(critique.into()),
        }
    }
}

/// The verdict object the verifier prompt asks for.
#[derive(Deserialize)]
struct Verdict {
    passed: bool,
    #[serde(default)]
    critique: Option<String>,
}

/// Turn verifier output into a result. Anything unreadable is a failure.
///
/// The verdict is the first object shaped like one, so a verifier that
/// quotes the candidate before judging it is still read correctly.
pub fn parse_verdict(raw: &str) -> VerificationResult {
    let decode = |object: Map<String, Value>| serde_json::from_value::<Verdict>(Value::Object(object));
    match first_object(raw, decode) {
        Ok(verdict) => VerificationResult {
            passed: verdict.passed,
            critique: verdict
                .critique
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty()),
        },
        Err(Some(e)) => {
            VerificationResult::fail(format!("verifier output could not be parsed: {e}"))
        }
        Err(None) => {
            VerificationResult::fail("verifier output could not be parsed: no JSON object found")
        }
    }
}

pub struct Verifier {
    client: Arc<dyn ModelClient>,
    timeout: Duration,
}

impl Verifier {
    pub fn new(client: Arc<dyn ModelClient>, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// Judge `candidate` against `question`.
    ///
    /// Backend failures propagate; a garbled verdict does not.
    pub async fn verify(
        &self,
        task_type: TaskType,
        question: &str,
        candidate: &CandidateAnswer,
    ) -> SolveResult<(VerificationResult, Option<TokenUsage>)> {
        let prompt = build_verify_prompt(task_type, question, candidate);
        let completion = complete_within(self.client.as_ref(), &prompt, self.timeout).await?;
        debug!(raw = %completion.text, "verifier output");

        let result = parse_verdict(&completion.text);
        if !result.passed {
            warn!(
                critique = result.critique.as_deref().unwrap_or(""),
                "verification failed"
            );
        }
        Ok((result, completion.usage))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::mock::{MockModel, MockReply};
    use crate::error::SolveError;
    use crate::parser::parse;

    #[test]
    fn pass_verdict() {
        assert_eq!(
            parse_verdict(r#"{"passed": true, "critique": null}"#),
            VerificationResult::pass()
        );
    }

    #[test]
    fn pass_verdict_without_critique_key() {
        assert_eq!(parse_verdict(r#"{"passed": true}"#), VerificationResult::pass());
    }

    #[test]
    fn fail_verdict_keeps_critique() {
        let result = parse_verdict(r#"<think>hmm</think>{"passed": false, "critique": " 17*3 is 51 "}"#);
        assert_eq!(result, VerificationResult::fail("17*3 is 51"));
    }

    #[test]
    fn blank_critique_becomes_none() {
        let result = parse_verdict(r#"{"passed": false, "critique": "   "}"#);
        assert!(!result.passed);
        assert!(result.critique.is_none());
    }

    #[test]
    fn no_json_fails_conservatively() {
        let result = parse_verdict("Looks good to me!");
        assert!(!result.passed);
        assert!(result.critique.unwrap().contains("could not be parsed"));
    }

    #[test]
    fn string_passed_fails_conservatively() {
        let result = parse_verdict(r#"{"passed": "true"}"#);
        assert!(!result.passed);
        assert!(result.critique.unwrap().contains("could not be parsed"));
    }

    #[test]
    fn missing_passed_fails_conservatively() {
        let result = parse_verdict(r#"{"verdict": "pass"}"#);
        assert!(!result.passed);
    }

    #[test]
    fn verdict_after_echoed_candidate() {
        let raw = r#"Candidate: {"choice": "B", "rationale": "only B"}
Verdict: {"passed": true, "critique": null}"#;
        assert_eq!(parse_verdict(raw), VerificationResult::pass());
    }

    #[test]
    fn verdict_after_empty_set_mention() {
        let raw = r#"The set {} is empty, but 17*3 is not 50. {"passed": false, "critique": "should be 51"}"#;
        assert_eq!(parse_verdict(raw), VerificationResult::fail("should be 51"));
    }

    fn candidate() -> CandidateAnswer {
        parse(TaskType::Numeric, r#"{"value": 51, "rationale": "17*3=51"}"#).unwrap()
    }

    #[tokio::test]
    async fn verify_sends_verify_prompt() {
        let mock = Arc::new(MockModel::new([r#"{"passed": true}"#]));
        let verifier = Verifier::new(mock.clone(), Duration::from_secs(1));

        let (result, _) = verifier
            .verify(TaskType::Numeric, "What is 17 * 3?", &candidate())
            .await
            .unwrap();

        assert!(result.passed);
        let prompts = mock.prompts();
        assert_eq!(prompts.len(), 1);
        assert_eq!(prompts[0].stage, crate::prompts::Stage::Verify);
        assert!(prompts[0].user.contains("What is 17 * 3?"));
    }

    #[tokio::test]
    async fn verify_propagates_backend_errors() {
        let mock = Arc::new(MockModel::new([MockReply::Unavailable]));
        let verifier = Verifier::new(mock, Duration::from_secs(1));

        let err = verifier
            .verify(TaskType::Numeric, "q", &candidate())
            .await
            .unwrap_err();
        assert!(matches!(err, SolveError::BackendUnavailable(_)));
    }

    #[tokio::test]
    async fn verify_times_out() {
        let mock = Arc::new(MockModel::new([MockReply::Hang]));
        let verifier = Verifier::new(mock, Duration::from_millis(20));

        let err = verifier
            .verify(TaskType::Numeric, "q", &candidate())
            .await
            .unwrap_err();
        assert!(matches!(err, SolveError::BackendTimeout(_)));
    }
}
