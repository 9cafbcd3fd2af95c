//! Project-wide constants.

use std::time::Duration;

/// Default local model when none is specified.
pub const DEFAULT_MODEL: &str = "deepseek-r1:1.5b";

/// Default Ollama endpoint.
pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:11434";

/// Solve attempts per request, counting the first solve and every repair.
pub const DEFAULT_MAX_ATTEMPTS: usize = 3;

/// Per-call backend timeout in seconds. Small local models can be slow.
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Sampling seed passed to the backend so runs are reproducible.
pub const DEFAULT_SEED: u64 = 42;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8000;

/// Timeout for the backend health probe.
pub const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

/// Longest slice of raw model text echoed back into a repair prompt.
pub const MAX_ECHOED_RAW_CHARS: usize = 2_000;

/// Format a number with comma separators (e.g. 1,234,567).
pub fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    for (i, c) in s.chars().enumerate() {
        if i > 0 && (s.len() - i).is_multiple_of(3) {
            result.push(',');
        }
        result.push(c);
    }
    result
}

/// Truncate `s` to at most `max` characters, appending an ellipsis when cut.
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}…", &s[..idx]),
        None => s.to_string(),
    }
}
