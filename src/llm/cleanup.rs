use std::sync::OnceLock;

use regex::Regex;

fn think_block() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<think>.*?</think>").expect("valid regex"))
}

/// Removes `<think>…</think>` spans from model output and trims the rest.
///
/// An unterminated `<think>` is kept as-is.
pub fn strip_reasoning(text: &str) -> String {
    think_block().replace_all(text, "").trim().to_string()
}
