//! Response cleaning for strict-JSON prompts
//!
//! Models asked for "strict JSON only" still tend to wrap the object in
//! markdown fences or lead with a sentence. Cleaning strips any
//! surrounding fence, then keeps the substring between the first `{`
//! and the last `}`. Input with no braces comes back trimmed and
//! otherwise untouched, so the caller's JSON parse fails with the
//! original text in hand.

/// Reduce a raw model response to its JSON object candidate.
pub fn clean_json_block(raw: &str) -> String {
    let stripped = strip_fences(raw.trim());

    match (stripped.find('{'), stripped.rfind('}')) {
        (Some(start), Some(end)) if start < end => stripped[start..=end].to_string(),
        _ => raw.trim().to_string(),
    }
}

/// Drop a surrounding markdown code fence, tolerating a language tag on
/// the opening line (```json and friends).
fn strip_fences(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Skip the language tag up to the end of the opening line
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_object_passes_through() {
        assert_eq!(clean_json_block(r#"{"a":1}"#), r#"{"a":1}"#);
    }

    #[test]
    fn fenced_json_is_unwrapped() {
        let raw = "```json\n{\"subject\":\"Python\",\"chapters\":[]}\n```";
        let cleaned = clean_json_block(raw);
        assert_eq!(cleaned, r#"{"subject":"Python","chapters":[]}"#);
        let parsed: serde_json::Value = serde_json::from_str(&cleaned).unwrap();
        assert_eq!(parsed["subject"], "Python");
    }

    #[test]
    fn fence_without_language_tag() {
        let raw = "```\n{\"a\":1}\n```";
        assert_eq!(clean_json_block(raw), r#"{"a":1}"#);
    }

    #[test]
    fn chatter_around_object_is_dropped() {
        let raw = "Here is your roadmap:\n{\"a\":1}\nHope that helps!";
        assert_eq!(clean_json_block(raw), r#"{"a":1}"#);
    }

    #[test]
    fn nested_braces_keep_the_outermost_span() {
        let raw = "prefix {\"a\":{\"b\":2}} suffix";
        assert_eq!(clean_json_block(raw), r#"{"a":{"b":2}}"#);
    }

    #[test]
    fn no_braces_yields_trimmed_original_and_fails_to_parse() {
        let raw = "  I could not generate a roadmap.  ";
        let cleaned = clean_json_block(raw);
        assert_eq!(cleaned, "I could not generate a roadmap.");
        assert!(serde_json::from_str::<serde_json::Value>(&cleaned).is_err());
    }

    #[test]
    fn lone_open_brace_yields_trimmed_original() {
        assert_eq!(clean_json_block(" { "), "{");
    }

    #[test]
    fn whitespace_padded_fence() {
        let raw = "\n\n```json\n  {\"ok\":true}  \n```\n";
        assert_eq!(clean_json_block(raw), r#"{"ok":true}"#);
    }
}
