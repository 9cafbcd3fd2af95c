use super::{Prompt, Stage, render_candidate, schema_lines};
use crate::parser::CandidateAnswer;
use crate::task::TaskType;

const FIXER_SYSTEM: &str = "You are a fixer that revises the previous JSON answer using a bug report. \
Return ONLY ONE-LINE JSON with the same schema as the solver's type. No chain-of-thought.";

pub fn build_repair_prompt(
    task_type: TaskType,
    question: &str,
    candidate: &CandidateAnswer,
    critique: &str,
) -> Prompt {
    let user = format!(
        "Problem:\n{question}\n\nTask type: {task_type}\nRequired fields:\n{schema}\n\nPrevious answer:\n{candidate}\n\nBug report:\n{critique}\n\nRevise your answer to FIX the bugs. Keep format STRICT and concise.\nExample for {task_type}: {example}",
        question = question.trim(),
        task_type = task_type,
        schema = schema_lines(task_type),
        candidate = render_candidate(candidate),
        critique = critique.trim(),
        example = task_type.example(),
    );

    Prompt {
        stage: Stage::Repair,
        system: FIXER_SYSTEM,
        user,
    }
}
