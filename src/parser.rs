//! Pull a structured answer out of free-form model output.
//!
//! Models wrap their JSON in prose, markdown fences, or `<think>` blocks, and
//! the prose itself may contain braces (`{}` for the empty set, a restated
//! format hint). [`object_spans`] finds every balanced `{...}` span in one
//! pass; [`first_object`] returns the first one a caller-supplied decoder
//! accepts, so a stray object ahead of the answer is skipped.

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::task::{Answer, TaskType};

const THINK_OPEN: &str = "<think>";
const THINK_CLOSE: &str = "</think>";

/// Why a model response could not become a candidate.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseFailure {
    #[error("no JSON object found in model output")]
    Parse,

    #[error("{task_type} answer does not match schema: {reason}")]
    Schema { task_type: TaskType, reason: String },
}

/// One attempt's output: the raw text plus, when it parsed, its fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateAnswer {
    pub raw_text: String,
    pub structured_fields: Option<Answer>,
}

impl CandidateAnswer {
    /// A candidate whose text could not be parsed.
    pub fn unparsed(raw_text: impl Into<String>) -> Self {
        Self {
            raw_text: raw_text.into(),
            structured_fields: None,
        }
    }
}

/// Parse `raw_text` into a candidate for `task_type`.
///
/// The first object that satisfies the schema wins. When objects were found
/// but none fits, the first one's schema error is reported.
pub fn parse(task_type: TaskType, raw_text: &str) -> Result<CandidateAnswer, ParseFailure> {
    let answer = first_object(raw_text, |object| Answer::from_object(task_type, object))
        .map_err(|rejected| match rejected {
            Some(e) => ParseFailure::Schema {
                task_type,
                reason: e.to_string(),
            },
            None => ParseFailure::Parse,
        })?;
    Ok(CandidateAnswer {
        raw_text: raw_text.to_string(),
        structured_fields: Some(answer),
    })
}

/// Decode the first JSON object in `text`, looking past reasoning blocks first.
pub fn extract_object(text: &str) -> Option<Map<String, Value>> {
    first_object(text, Ok::<_, ()>).ok()
}

/// Return the first JSON object in `text` that `decode` accepts.
///
/// Text with `<think>` blocks removed is searched before the raw text. On
/// failure the error is the first rejection from `decode`, or `None` when no
/// span decoded as a JSON object at all.
pub fn first_object<T, E>(
    text: &str,
    mut decode: impl FnMut(Map<String, Value>) -> Result<T, E>,
) -> Result<T, Option<E>> {
    let stripped = strip_think_blocks(text);
    let raw = (stripped != text).then_some(text);

    let mut first_rejection = None;
    for source in std::iter::once(stripped.as_str()).chain(raw) {
        for span in object_spans(source) {
            let Ok(object) = serde_json::from_str::<Map<String, Value>>(span) else {
                continue;
            };
            match decode(object) {
                Ok(found) => return Ok(found),
                Err(e) => {
                    first_rejection.get_or_insert(e);
                }
            }
        }
    }
    Err(first_rejection)
}

/// Find the first substring of `text` that is a syntactically valid JSON object.
pub fn find_json_object(text: &str) -> Option<&str> {
    object_spans(text)
        .into_iter()
        .find(|span| serde_json::from_str::<Map<String, Value>>(span).is_ok())
}

/// Every balanced `{...}` span in `text`, ordered by opening brace.
///
/// A single pass with a stack of open positions, so each byte is visited
/// once. Quotes only open a string inside a span, and a raw newline ends a
/// string (JSON strings cannot contain one), which keeps a stray quote in
/// prose from swallowing the rest of the text.
pub fn object_spans(text: &str) -> Vec<&str> {
    let mut spans = Vec::new();
    let mut open: Vec<usize> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (i, b) in text.bytes().enumerate() {
        if in_string {
            match b {
                b'\n' => {
                    in_string = false;
                    escaped = false;
                }
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' if !open.is_empty() => in_string = true,
            b'{' => open.push(i),
            b'}' => {
                if let Some(start) = open.pop() {
                    spans.push((start, i));
                }
            }
            _ => {}
        }
    }

    spans.sort_unstable_by_key(|&(start, _)| start);
    // Braces are ASCII, so both ends sit on char boundaries.
    spans
        .into_iter()
        .map(|(start, end)| &text[start..=end])
        .collect()
}

/// Remove complete `<think>...</think>` blocks. An unclosed block is kept.
fn strip_think_blocks(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(open) = rest.find(THINK_OPEN) {
        let after_open = &rest[open + THINK_OPEN.len()..];
        match after_open.find(THINK_CLOSE) {
            Some(close) => {
                out.push_str(&rest[..open]);
                rest = &after_open[close + THINK_CLOSE.len()..];
            }
            None => break,
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn find_plain_object() {
        assert_eq!(find_json_object(r#"{"a": 1}"#), Some(r#"{"a": 1}"#));
    }

    #[test]
    fn find_object_surrounded_by_prose() {
        let text = "Sure! Here it is: {\"a\": 1} Hope that helps.";
        assert_eq!(find_json_object(text), Some(r#"{"a": 1}"#));
    }

    #[test]
    fn find_object_inside_markdown_fence() {
        let text = "```json\n{\"a\": 1}\n```";
        assert_eq!(find_json_object(text), Some(r#"{"a": 1}"#));
    }

    #[test]
    fn braces_inside_strings_do_not_count() {
        let text = r#"answer: {"rationale": "the set {1, 2} has a } in it", "a": 1}"#;
        assert_eq!(
            find_json_object(text),
            Some(r#"{"rationale": "the set {1, 2} has a } in it", "a": 1}"#)
        );
    }

    #[test]
    fn escaped_quotes_inside_strings() {
        let text = r#"x {"q": "she said \"{\" loudly"} y"#;
        assert_eq!(find_json_object(text), Some(r#"{"q": "she said \"{\" loudly"}"#));
    }

    #[test]
    fn skips_non_json_brace_spans() {
        let text = "Let S = {a, b}. Then {\"a\": 1}";
        assert_eq!(find_json_object(text), Some(r#"{"a": 1}"#));
    }

    #[test]
    fn unbalanced_prefix_brace_is_skipped() {
        let text = "oops { never closed ... {\"a\": 1}";
        assert_eq!(find_json_object(text), Some(r#"{"a": 1}"#));
    }

    #[test]
    fn nested_objects_returned_whole() {
        let text = r#"-> {"outer": {"inner": [1, {"x": 2}]}} <-"#;
        assert_eq!(
            find_json_object(text),
            Some(r#"{"outer": {"inner": [1, {"x": 2}]}}"#)
        );
    }

    #[test]
    fn first_valid_object_wins() {
        let text = r#"{"a": 1} and then {"b": 2}"#;
        assert_eq!(find_json_object(text), Some(r#"{"a": 1}"#));
    }

    #[test]
    fn no_object_found() {
        assert_eq!(find_json_object("no json here"), None);
        assert_eq!(find_json_object("[1, 2, 3]"), None);
        assert_eq!(find_json_object(""), None);
        assert_eq!(find_json_object("}{"), None);
    }

    #[test]
    fn multibyte_prose_around_object() {
        let text = "答案如下：{\"a\": \"好\"}。";
        assert_eq!(find_json_object(text), Some("{\"a\": \"好\"}"));
    }

    #[test]
    fn think_block_is_skipped_before_scanning() {
        let text = "<think>maybe {\"value\": 50}? no wait</think>{\"value\": 51}";
        let object = extract_object(text).unwrap();
        assert_eq!(object.get("value"), Some(&json!(51)));
    }

    #[test]
    fn object_inside_think_block_is_a_fallback() {
        let text = "<think>{\"value\": 51}</think> that's all";
        let object = extract_object(text).unwrap();
        assert_eq!(object.get("value"), Some(&json!(51)));
    }

    #[test]
    fn unclosed_think_block_is_left_alone() {
        let text = "<think>still going {\"value\": 7}";
        let object = extract_object(text).unwrap();
        assert_eq!(object.get("value"), Some(&json!(7)));
    }

    #[test]
    fn parse_numeric_scenario() {
        let raw = "<think>...</think>{\"value\": 51, \"rationale\": \"17*3=51\"}";
        let candidate = parse(TaskType::Numeric, raw).unwrap();
        assert_eq!(candidate.raw_text, raw);
        let fields = serde_json::to_value(candidate.structured_fields.unwrap()).unwrap();
        assert_eq!(fields, json!({"value": 51, "rationale": "17*3=51"}));
    }

    #[test]
    fn parse_extracts_embedded_object_exactly() {
        let embedded = json!({"steps": ["expand", "factor", "compare"], "conclusion": "holds"});
        for (before, after) in [("", ""), ("Proof sketch:\n", "\nDone."), ("}{ noise ", " {")] {
            let raw = format!("{before}{embedded}{after}");
            let candidate = parse(TaskType::ProofOutline, &raw).unwrap();
            let fields = serde_json::to_value(candidate.structured_fields.unwrap()).unwrap();
            assert_eq!(fields, embedded, "surrounding: {before:?} / {after:?}");
        }
    }

    #[test]
    fn parse_without_json_is_parse_error() {
        let err = parse(TaskType::Mcq, "I think the answer is B.").unwrap_err();
        assert_eq!(err, ParseFailure::Parse);
    }

    #[test]
    fn parse_missing_field_is_schema_error() {
        let err = parse(TaskType::Mcq, r#"{"rationale": "B is right"}"#).unwrap_err();
        match err {
            ParseFailure::Schema { task_type, reason } => {
                assert_eq!(task_type, TaskType::Mcq);
                assert!(reason.contains("choice"));
            }
            other => panic!("expected Schema, got {other:?}"),
        }
    }

    #[test]
    fn parse_wrong_type_is_schema_error() {
        let err = parse(TaskType::ShortAnswer, r#"{"answer": 3, "rationale": "r"}"#).unwrap_err();
        assert!(matches!(err, ParseFailure::Schema { .. }));
    }

    #[test]
    fn unparsed_candidate_has_no_fields() {
        let candidate = CandidateAnswer::unparsed("garbage");
        assert_eq!(candidate.raw_text, "garbage");
        assert!(candidate.structured_fields.is_none());
    }

    #[test]
    fn strip_multiple_think_blocks() {
        assert_eq!(
            strip_think_blocks("a<think>x</think>b<think>y</think>c"),
            "abc"
        );
    }

    #[test]
    fn empty_set_in_prose_before_answer() {
        let raw = r#"The empty set {} has no elements, so the answer is {"choice":"B","rationale":"only B"}"#;
        let candidate = parse(TaskType::Mcq, raw).unwrap();
        let fields = serde_json::to_value(candidate.structured_fields.unwrap()).unwrap();
        assert_eq!(fields, json!({"choice": "B", "rationale": "only B"}));
    }

    #[test]
    fn restated_format_hint_is_skipped() {
        let raw = r#"Format is {"answer": "..."}; my answer: {"answer":"yes","rationale":"r"}"#;
        let candidate = parse(TaskType::ShortAnswer, raw).unwrap();
        assert_eq!(candidate.structured_fields.unwrap().headline(), "yes");
    }

    #[test]
    fn first_rejection_is_reported_when_nothing_fits() {
        let raw = r#"{"rationale": "first"} then {"choice": 3, "rationale": "second"}"#;
        match parse(TaskType::Mcq, raw).unwrap_err() {
            ParseFailure::Schema { reason, .. } => assert!(reason.contains("choice")),
            other => panic!("expected Schema, got {other:?}"),
        }
    }

    #[test]
    fn answer_inside_think_block_used_when_outside_does_not_fit() {
        let raw = r#"<think>{"value": 51, "rationale": "r"}</think> Final: {"value": "fifty-one"}"#;
        let candidate = parse(TaskType::Numeric, raw).unwrap();
        assert_eq!(candidate.structured_fields.unwrap().headline(), "51");
    }

    #[test]
    fn spans_are_ordered_by_opening_brace() {
        let text = r#"a {"x": {"y": 1}} b {}"#;
        assert_eq!(
            object_spans(text),
            vec![r#"{"x": {"y": 1}}"#, r#"{"y": 1}"#, "{}"]
        );
    }

    #[test]
    fn stray_quote_in_prose_line_does_not_hide_later_object() {
        let text = "Let S = {a, \"b} be a set.\n{\"a\": 1}";
        assert_eq!(find_json_object(text), Some(r#"{"a": 1}"#));
    }

    #[test]
    fn long_brace_runs_scan_in_linear_time() {
        let started = std::time::Instant::now();
        assert_eq!(
            parse(TaskType::Mcq, &"{".repeat(200_000)).unwrap_err(),
            ParseFailure::Parse
        );
        assert_eq!(
            parse(TaskType::Mcq, &r#"{"a":"#.repeat(50_000)).unwrap_err(),
            ParseFailure::Parse
        );
        assert!(matches!(
            parse(TaskType::Mcq, &"{}".repeat(50_000)).unwrap_err(),
            ParseFailure::Schema { .. }
        ));
        assert!(
            started.elapsed() < std::time::Duration::from_secs(2),
            "scan took {:?}",
            started.elapsed()
        );
    }
}
