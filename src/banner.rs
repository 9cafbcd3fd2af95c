//! Startup banner and run summaries for the terminal.

use crate::client::TokenUsage;
use crate::config::Config;
use crate::consts::format_number;
use crate::engine::SolveOutcome;

/// Print the startup banner for `serve`.
pub fn print_banner(config: &Config, url: &str) {
    println!(
        r#"
   ╔═══════════════════════════════════════╗
   ║          V E R I S O L V E            ║
   ║      solve · verify · repair          ║
   ╚═══════════════════════════════════════╝

   version   {}
   backend   {}
   model     {}
   verifier  {}
   attempts  {}
   timeout   {}s
   serving   {}
"#,
        env!("CARGO_PKG_VERSION"),
        config.endpoint,
        config.model,
        config.verifier_model,
        config.max_attempts,
        config.timeout.as_secs(),
        url,
    );
}

/// Human-readable report of one solve.
pub fn format_outcome(outcome: &SolveOutcome) -> String {
    let mut out = String::new();
    let status = if outcome.verified { "verified" } else { "NOT verified" };
    let answer = outcome
        .final_answer
        .as_ref()
        .map(|a| a.headline())
        .unwrap_or_else(|| "(no structured answer)".to_string());

    out.push_str(&format!(
        "=> {answer}\n   {status} after {} attempt(s)\n",
        outcome.attempts
    ));
    for (i, entry) in outcome.history.iter().enumerate() {
        let mark = if entry.verification.passed { "✓" } else { "✗" };
        let critique = entry.verification.critique.as_deref().unwrap_or("");
        out.push_str(&format!("   [{}] {mark} {critique}\n", i + 1));
    }
    out
}

/// Token usage line, empty when the backend reported nothing.
pub fn format_usage(usage: TokenUsage) -> Option<String> {
    if usage.total() == 0 {
        return None;
    }
    Some(format!(
        "tokens: {} input + {} output = {}",
        format_number(usage.input_tokens),
        format_number(usage.output_tokens),
        format_number(usage.total()),
    ))
}
