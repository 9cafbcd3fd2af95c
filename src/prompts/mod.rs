//! Prompt templates for the three backend roles: solver, verifier, fixer.
//!
//! Every builder is pure. Each prompt asks for exactly one JSON object; the
//! parser still tolerates anything the model wraps around it.

mod repair;
mod solve;
mod verify;

use std::fmt;

pub use repair::build_repair_prompt;
pub use solve::build_solve_prompt;
pub use verify::build_verify_prompt;

use crate::consts::{MAX_ECHOED_RAW_CHARS, truncate_chars};
use crate::parser::CandidateAnswer;

/// Which step of the loop a prompt belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Solve,
    Verify,
    Repair,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Solve => "solve",
            Stage::Verify => "verify",
            Stage::Repair => "repair",
        })
    }
}

/// A system + user message pair, ready for a chat-style backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub stage: Stage,
    pub system: &'static str,
    pub user: String,
}

/// How a candidate is shown back to the model.
///
/// Parsed candidates are re-serialized as one-line JSON; unparsed ones are
/// echoed as (truncated) raw text so the fixer can see what went wrong.
fn render_candidate(candidate: &CandidateAnswer) -> String {
    match &candidate.structured_fields {
        Some(answer) => answer.to_json_line(),
        None => format!(
            "(not valid JSON for this task type)\n{}",
            truncate_chars(candidate.raw_text.trim(), MAX_ECHOED_RAW_CHARS)
        ),
    }
}

/// `- name: type` lines describing a task type's schema.
fn schema_lines(task_type: crate::task::TaskType) -> String {
    task_type
        .fields()
        .iter()
        .map(|(name, kind)| format!("- \"{name}\": {kind}"))
        .collect::<Vec<_>>()
        .join("\n")
}
