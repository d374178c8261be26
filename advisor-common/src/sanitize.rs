//! Free-text input sanitization
//!
//! Every piece of caller-supplied text passes through [`sanitize`] before
//! it reaches the store, the retriever, or the prompt assembler. The
//! function is total: it never fails, and empty input yields an empty
//! string.
//!
//! Note: this is general input hygiene, not a defense against prompt
//! injection on its own. The prompt contract and handler-level checks
//! carry the rest.

use crate::config::MAX_INPUT_LINES;

/// Normalize and bound free-text input.
///
/// Steps, in order:
/// 1. Truncate to `max_length` characters (before anything else, so
///    pathological inputs cannot drive the later passes)
/// 2. Normalize CRLF / lone CR line endings to `\n`
/// 3. Strip C0/C1 control characters and DEL, preserving `\n` so
///    multi-line content keeps its structure
/// 4. Keep at most [`MAX_INPUT_LINES`] lines; excess lines are dropped
/// 5. Collapse runs of 3+ newlines to exactly 2
/// 6. Trim leading/trailing whitespace
pub fn sanitize(text: &str, max_length: usize) -> String {
    if text.is_empty() || max_length == 0 {
        return String::new();
    }

    let truncated: String = text.chars().take(max_length).collect();
    let normalized = truncated.replace("\r\n", "\n").replace('\r', "\n");

    let cleaned: String = normalized
        .chars()
        .filter(|&c| c == '\n' || !is_unsafe_control(c))
        .collect();

    let mut bounded = String::with_capacity(cleaned.len());
    for (i, line) in cleaned.split('\n').enumerate() {
        if i >= MAX_INPUT_LINES {
            break;
        }
        if i > 0 {
            bounded.push('\n');
        }
        bounded.push_str(line);
    }

    collapse_newlines(&bounded).trim().to_string()
}

/// Validate a required field, returning the cleaned value or a
/// human-readable message naming the field.
pub fn require_field(
    value: &str,
    field_name: &str,
    max_length: usize,
) -> std::result::Result<String, String> {
    if value.is_empty() {
        return Err(format!("{field_name} must not be empty"));
    }

    let cleaned = sanitize(value, max_length);
    if cleaned.is_empty() {
        return Err(format!("{field_name} contains no valid characters"));
    }

    Ok(cleaned)
}

/// Control characters unsafe to embed in structured output: C0, DEL, C1.
fn is_unsafe_control(c: char) -> bool {
    matches!(c, '\u{0000}'..='\u{001f}' | '\u{007f}'..='\u{009f}')
}

/// Collapse every run of 3 or more newlines down to exactly 2.
fn collapse_newlines(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut run = 0usize;
    for c in text.chars() {
        if c == '\n' {
            run += 1;
            if run <= 2 {
                out.push(c);
            }
        } else {
            run = 0;
            out.push(c);
        }
    }
    out
}
