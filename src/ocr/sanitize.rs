//! Best-effort extraction of a single JSON object from noisy model output.
//!
//! Vision models are prompted to answer with bare JSON, but in practice the
//! object often arrives wrapped in prose, markdown fences, or a trailing
//! comment. Two deterministic passes run unconditionally in sequence:
//!
//! 1. slice to the span from the first `{` to the last `}` (inclusive);
//! 2. if a backtick survives inside that span, truncate right after it.
//!
//! No JSON validation happens here — a malformed or partial object passes
//! through unchanged and fails later at the caller's `serde_json` parse,
//! which is the error that should surface.

/// Sanitise a raw model response down to a best-effort JSON object.
pub fn sanitize_response(raw: &str) -> String {
    let trimmed = trim_before_and_after_json(raw);
    trim_trailing_fence(trimmed).to_string()
}

/// Slice to the first-`{`..last-`}` span. Text with no `{` or no `}` (or a
/// last `}` before the first `{`) has nothing to trim and is returned
/// unchanged.
fn trim_before_and_after_json(s: &str) -> &str {
    match (s.find('{'), s.rfind('}')) {
        (Some(start), Some(end)) if end > start => &s[start..=end],
        _ => s,
    }
}

/// Truncate the text to end right after the first backtick, removing
/// trailing markdown-fence commentary the first pass left behind.
fn trim_trailing_fence(s: &str) -> &str {
    match s.find('`') {
        Some(idx) => &s[..=idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_prefix_and_suffix_noise() {
        let raw = "Sure, here is the JSON you asked for:\n{\"transactions\": []}\nLet me know!";
        assert_eq!(sanitize_response(raw), "{\"transactions\": []}");
    }

    #[test]
    fn no_braces_is_identity() {
        assert_eq!(sanitize_response("no json here"), "no json here");
        assert_eq!(sanitize_response(""), "");
    }

    #[test]
    fn missing_closing_brace_is_identity() {
        assert_eq!(sanitize_response("{\"a\": 1"), "{\"a\": 1");
    }

    #[test]
    fn closing_before_opening_is_identity() {
        assert_eq!(sanitize_response("} junk {"), "} junk {");
    }

    #[test]
    fn keeps_outermost_span_across_multiple_objects() {
        let raw = "x {\"a\": 1} y {\"b\": 2} z";
        assert_eq!(sanitize_response(raw), "{\"a\": 1} y {\"b\": 2}");
    }

    #[test]
    fn nested_objects_survive() {
        let raw = "note: {\"account_data\": {\"name\": \"X\"}} done";
        assert_eq!(
            sanitize_response(raw),
            "{\"account_data\": {\"name\": \"X\"}}"
        );
    }

    #[test]
    fn truncates_after_trailing_backtick() {
        let raw = "{\"a\": 1}`jsonified output above";
        assert_eq!(sanitize_response(raw), "{\"a\": 1}`");
    }

    #[test]
    fn both_passes_run_in_sequence() {
        let raw = "prefix {\"a\": \"b`c\"} suffix";
        // The brace pass keeps the object, then the fence pass truncates at
        // the backtick inside it. Garbage in, shorter garbage out - the
        // caller's JSON parse reports the failure.
        assert_eq!(sanitize_response(raw), "{\"a\": \"b`");
    }
}
