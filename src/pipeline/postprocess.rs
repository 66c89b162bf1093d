//! Post-processing: deterministic cleanup of LLM responses before parsing.
//!
//! ## Why is post-processing necessary?
//!
//! The prompt asks for a bare JSON array, but chat models routinely:
//!
//! - wrap the array in a ```` ```json ... ``` ```` fence
//! - add a sentence before or after the array ("Here are the questions:")
//! - emit Windows-style `\r\n` line endings
//! - lead with a BOM or leak zero-width spaces copied from the source text
//!
//! Each of these makes `serde_json` reject an otherwise perfect answer.
//! The rules below fix them without touching the JSON content itself.
//!
//! ## Rule Order
//!
//! Fences are stripped before the array is isolated so a fenced response
//! with trailing chatter still resolves to the fence body.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all cleanup rules to a raw chat-completion message.
///
/// Rules (applied in order):
/// 1. Normalise line endings (CRLF → LF)
/// 2. Strip BOMs and zero-width spaces
/// 3. Strip an outer markdown fence, with or without a `json` tag
/// 4. Isolate the outermost `[...]` when prose surrounds it
pub fn clean_llm_response(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = remove_invisible_chars(&s);
    let s = strip_code_fences(&s);
    isolate_json_array(&s)
}

// ── Rule 1: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 2: Strip invisible Unicode ─────────────────────────────────────────

// ZWNJ and ZWJ are left alone: they shape text in several scripts.
fn remove_invisible_chars(input: &str) -> String {
    input.replace(['\u{200B}', '\u{FEFF}'], "")
}

// ── Rule 3: Strip outer code fences ─────────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```(?:json|JSON)?[ \t]*\n(.*?)\n?```").unwrap());

fn strip_code_fences(input: &str) -> String {
    let trimmed = input.trim();
    match RE_OUTER_FENCES.captures(trimmed) {
        Some(caps) => caps[1].trim().to_string(),
        None => trimmed.to_string(),
    }
}

// ── Rule 4: Isolate the JSON array ──────────────────────────────────────────

fn isolate_json_array(input: &str) -> String {
    if input.starts_with('[') {
        return input.to_string();
    }
    match (input.find('['), input.rfind(']')) {
        (Some(start), Some(end)) if start < end => input[start..=end].to_string(),
        _ => input.to_string(),
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
