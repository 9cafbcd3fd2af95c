//! The single self-contained HTML page: form on top, result below.

use std::fmt::Write;

use crate::consts::truncate_chars;
use crate::engine::{HistoryEntry, SolveOutcome};
use crate::task::TaskType;

const MAX_RAW_CHARS: usize = 600;

const STYLE: &str = r#"
body { font-family: system-ui, sans-serif; max-width: 860px; margin: 2rem auto; padding: 0 1rem; color: #222; }
textarea { width: 100%; min-height: 8rem; font: inherit; }
select, button { font: inherit; padding: .3rem .6rem; }
.badge { display: inline-block; padding: .2rem .6rem; border-radius: .3rem; color: #fff; font-weight: 600; }
.verified { background: #2e7d32; }
.unverified { background: #c62828; }
.error { background: #fdecea; border: 1px solid #c62828; padding: .8rem; border-radius: .3rem; }
pre { background: #f5f5f5; padding: .6rem; overflow-x: auto; white-space: pre-wrap; }
table { border-collapse: collapse; width: 100%; }
td, th { border-bottom: 1px solid #ddd; padding: .4rem; vertical-align: top; text-align: left; }
.pass { color: #2e7d32; }
.fail { color: #c62828; }
"#;

/// What the page shows. The default is an empty form.
#[derive(Debug, Default)]
pub struct PageView {
    pub task_type: Option<TaskType>,
    pub question: String,
    pub outcome: Option<SolveOutcome>,
    pub error: Option<String>,
}

pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

pub fn render(view: &PageView) -> String {
    let mut html = String::with_capacity(4096);
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str("<title>verisolve</title>\n<style>");
    html.push_str(STYLE);
    html.push_str("</style>\n</head>\n<body>\n<h1>verisolve</h1>\n");
    html.push_str("<p>Solve, self-verify, and repair with a local model.</p>\n");

    render_form(&mut html, view);

    if let Some(error) = &view.error {
        let _ = writeln!(html, "<div class=\"error\"><strong>Error:</strong> {}</div>", escape_html(error));
    }
    if let Some(outcome) = &view.outcome {
        render_outcome(&mut html, outcome);
    }

    html.push_str("</body>\n</html>\n");
    html
}

fn render_form(html: &mut String, view: &PageView) {
    let selected = view.task_type.unwrap_or(TaskType::Mcq);
    html.push_str("<form method=\"post\" action=\"/solve\">\n<label>Task type \n<select name=\"task_type\">\n");
    for t in TaskType::ALL {
        let attr = if t == selected { " selected" } else { "" };
        let _ = writeln!(html, "<option value=\"{}\"{}>{}</option>", t.as_str(), attr, t.label());
    }
    html.push_str("</select></label>\n<p><textarea name=\"question\" placeholder=\"Enter the problem...\" required>");
    html.push_str(&escape_html(&view.question));
    html.push_str("</textarea></p>\n<button type=\"submit\">Solve</button>\n</form>\n");
}

fn render_outcome(html: &mut String, outcome: &SolveOutcome) {
    let (class, label) = if outcome.verified {
        ("verified", "verified")
    } else {
        ("unverified", "not verified")
    };
    let _ = writeln!(
        html,
        "<h2>Result <span class=\"badge {class}\">{label}</span></h2>\n<p>{} attempt(s)</p>",
        outcome.attempts
    );

    match &outcome.final_answer {
        Some(answer) => {
            let pretty = serde_json::to_string_pretty(answer).unwrap_or_default();
            let _ = writeln!(
                html,
                "<p><strong>Answer:</strong> {}</p>\n<pre>{}</pre>",
                escape_html(&answer.headline()),
                escape_html(&pretty)
            );
        }
        None => html.push_str("<p><strong>Answer:</strong> none (no structured answer was produced)</p>\n"),
    }

    if outcome.history.is_empty() {
        return;
    }
    html.push_str("<h3>Attempts</h3>\n<table>\n<tr><th>#</th><th>Candidate</th><th>Verification</th></tr>\n");
    for (i, entry) in outcome.history.iter().enumerate() {
        render_history_row(html, i + 1, entry);
    }
    html.push_str("</table>\n");
}

fn render_history_row(html: &mut String, number: usize, entry: &HistoryEntry) {
    let candidate = match &entry.candidate.structured_fields {
        Some(answer) => answer.to_json_line(),
        None => truncate_chars(entry.candidate.raw_text.trim(), MAX_RAW_CHARS),
    };
    let (class, mark) = if entry.verification.passed {
        ("pass", "&#x2713; pass")
    } else {
        ("fail", "&#x2717; fail")
    };
    let critique = entry
        .verification
        .critique
        .as_deref()
        .map(escape_html)
        .unwrap_or_default();
    let _ = writeln!(
        html,
        "<tr><td>{number}</td><td><pre>{}</pre></td><td><span class=\"{class}\">{mark}</span><br>{critique}</td></tr>",
        escape_html(&candidate)
    );
}
