use super::{Prompt, Stage, render_candidate};
use crate::parser::CandidateAnswer;
use crate::task::TaskType;

const VERIFIER_SYSTEM: &str = "You are a strict solution verifier. Accept a problem and a candidate JSON answer. \
Check correctness, structure, and consistency; do NOT provide chain-of-thought. \
Output a ONE-LINE JSON verdict: {\"passed\": true|false, \"critique\": \"what is wrong, or null\"}.";

fn type_rule(task_type: TaskType) -> &'static str {
    match task_type {
        TaskType::Mcq => "choice must be a single letter, one of A, B, C, D.",
        TaskType::Numeric => "value must be a bare number, simplified, with no explanatory text.",
        TaskType::ProofOutline => {
            "steps must be ordered and gap-free; conclusion must state what was proven."
        }
        TaskType::ShortAnswer => "answer must be concise and must not hedge.",
    }
}

pub fn build_verify_prompt(
    task_type: TaskType,
    question: &str,
    candidate: &CandidateAnswer,
) -> Prompt {
    let user = format!(
        "Problem:\n{question}\n\nTask type: {task_type}\nCandidate JSON (one line):\n{candidate}\n\nValidation rules:\n- The answer must actually solve the problem.\n- {rule}\n- rationale (if present) must support the answer.\n\nReturn ONE-LINE JSON: {{\"passed\": true|false, \"critique\": \"...\"}}. Set critique to null when passed is true.",
        question = question.trim(),
        task_type = task_type,
        candidate = render_candidate(candidate),
        rule = type_rule(task_type),
    );

    Prompt {
        stage: Stage::Verify,
        system: VERIFIER_SYSTEM,
        user,
    }
}
