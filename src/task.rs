//! The task-type registry and the answer schema each type expects.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::error::SolveError;

/// The fixed set of structured-answer formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    Mcq,
    Numeric,
    ProofOutline,
    ShortAnswer,
}

impl TaskType {
    pub const ALL: [TaskType; 4] = [
        TaskType::Mcq,
        TaskType::Numeric,
        TaskType::ProofOutline,
        TaskType::ShortAnswer,
    ];

    /// Wire name, as accepted by [`FromStr`].
    pub fn as_str(self) -> &'static str {
        match self {
            TaskType::Mcq => "mcq",
            TaskType::Numeric => "numeric",
            TaskType::ProofOutline => "proof_outline",
            TaskType::ShortAnswer => "short_answer",
        }
    }

    /// Human-readable name for the HTML form.
    pub fn label(self) -> &'static str {
        match self {
            TaskType::Mcq => "Multiple choice",
            TaskType::Numeric => "Numeric",
            TaskType::ProofOutline => "Proof outline",
            TaskType::ShortAnswer => "Short answer",
        }
    }

    /// Fields every candidate of this type must carry, with their JSON types.
    pub fn fields(self) -> &'static [(&'static str, &'static str)] {
        match self {
            TaskType::Mcq => &[("choice", "string"), ("rationale", "string")],
            TaskType::Numeric => &[("value", "number"), ("rationale", "string")],
            TaskType::ProofOutline => &[("steps", "array of strings"), ("conclusion", "string")],
            TaskType::ShortAnswer => &[("answer", "string"), ("rationale", "string")],
        }
    }

    /// A one-line object that satisfies the schema, shown to the model.
    pub fn example(self) -> &'static str {
        match self {
            TaskType::Mcq => r#"{"choice":"B","rationale":"only B satisfies both constraints"}"#,
            TaskType::Numeric => r#"{"value":42,"rationale":"6 * 7 = 42"}"#,
            TaskType::ProofOutline => {
                r#"{"steps":["write n = 3k + r","check r = 0, 1, 2 separately"],"conclusion":"g(n) is divisible by 3"}"#
            }
            TaskType::ShortAnswer => {
                r#"{"answer":"the graph is bipartite","rationale":"it has no odd cycle"}"#
            }
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskType {
    type Err = SolveError;

    /// Accepts the wire name case-insensitively, with `-` or space in place of `_`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        TaskType::ALL
            .into_iter()
            .find(|t| t.as_str() == normalized)
            .ok_or_else(|| SolveError::UnsupportedTaskType(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McqFields {
    pub choice: String,
    pub rationale: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericFields {
    /// Kept as a JSON number so `51` stays `51` and `0.5` stays `0.5`.
    pub value: Number,
    pub rationale: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProofOutlineFields {
    pub steps: Vec<String>,
    pub conclusion: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShortAnswerFields {
    pub answer: String,
    pub rationale: String,
}

/// Structured fields of a candidate, one variant per task type.
///
/// Serializes as the bare field object (no tag), which is exactly the shape
/// the model is asked to produce.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Answer {
    Mcq(McqFields),
    Numeric(NumericFields),
    ProofOutline(ProofOutlineFields),
    ShortAnswer(ShortAnswerFields),
}

impl Answer {
    /// Validate a decoded object against `task_type`'s schema.
    ///
    /// Missing fields and wrong field types are errors. Keys outside the
    /// schema are dropped.
    pub fn from_object(task_type: TaskType, object: Map<String, Value>) -> serde_json::Result<Self> {
        let value = Value::Object(object);
        Ok(match task_type {
            TaskType::Mcq => Answer::Mcq(serde_json::from_value(value)?),
            TaskType::Numeric => Answer::Numeric(serde_json::from_value(value)?),
            TaskType::ProofOutline => Answer::ProofOutline(serde_json::from_value(value)?),
            TaskType::ShortAnswer => Answer::ShortAnswer(serde_json::from_value(value)?),
        })
    }

    pub fn task_type(&self) -> TaskType {
        match self {
            Answer::Mcq(_) => TaskType::Mcq,
            Answer::Numeric(_) => TaskType::Numeric,
            Answer::ProofOutline(_) => TaskType::ProofOutline,
            Answer::ShortAnswer(_) => TaskType::ShortAnswer,
        }
    }

    /// The headline answer, without rationale.
    pub fn headline(&self) -> String {
        match self {
            Answer::Mcq(a) => a.choice.clone(),
            Answer::Numeric(a) => a.value.to_string(),
            Answer::ProofOutline(a) => a.conclusion.clone(),
            Answer::ShortAnswer(a) => a.answer.clone(),
        }
    }

    /// Compact one-line JSON, as echoed back to the model.
    pub fn to_json_line(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}
