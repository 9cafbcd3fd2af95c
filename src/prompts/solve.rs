use super::{Prompt, Stage, schema_lines};
use crate::task::TaskType;

const SOLVER_SYSTEM: &str = "You are a problem solver. Provide ONLY a single-line JSON object as output. \
Do not include chain-of-thought. Keep reasoning internal.";

const RULES: &[&str] = &[
    "Output exactly one JSON object on one line.",
    "Use only the fields listed above. No markdown, no extra text.",
    "Do NOT include any chain-of-thought.",
];

pub fn build_solve_prompt(task_type: TaskType, question: &str) -> Prompt {
    let rules = RULES
        .iter()
        .map(|rule| format!("- {}", rule))
        .collect::<Vec<_>>()
        .join("\n");

    let user = format!(
        "Task type: {task_type}\nProvide your final answer in STRICT JSON with these fields:\n{schema}\n\nRules:\n{rules}\n\nExample for {task_type}: {example}\n\nProblem:\n{question}\n",
        task_type = task_type,
        schema = schema_lines(task_type),
        rules = rules,
        example = task_type.example(),
        question = question.trim(),
    );

    Prompt {
        stage: Stage::Solve,
        system: SOLVER_SYSTEM,
        user,
    }
}
