//! Best-effort repair of model output into strict JSON.
//!
//! The chain runs in a fixed order:
//!
//! 1. [`strip_invisible`] drops leading BOM / zero-width marks and all NUL bytes
//! 2. [`extract_fenced`] keeps only the body of a ```` ``` ```` / ```` ```json ```` fence
//! 3. [`straighten_quotes`] turns typographic quotes into ASCII ones
//! 4. [`strip_trailing_commas`] removes `,` right before `}` or `]`
//! 5. strict parse, re-serialized compactly with key order preserved
//! 6. on failure, slice first `{` to last `}`, redo 3 and 4, parse again
//! 7. on failure, hand back the raw input untouched
//!
//! Step 7 means callers must treat the result as possibly non-JSON.

use serde_json::Value;

type Step = fn(&str) -> String;

/// Cleaning steps applied to the whole reply before the first parse attempt.
const CLEANING_STEPS: [(&str, Step); 4] = [
    ("strip_invisible", strip_invisible),
    ("extract_fenced", extract_fenced),
    ("straighten_quotes", straighten_quotes),
    ("strip_trailing_commas", strip_trailing_commas),
];

/// Steps re-applied to the `{...}` slice on the second attempt.
const SLICE_STEPS: [(&str, Step); 2] = [
    ("straighten_quotes", straighten_quotes),
    ("strip_trailing_commas", strip_trailing_commas),
];

const LEADING_MARKS: [char; 5] = [
    '\u{FEFF}', // byte-order mark
    '\u{200B}', // zero width space
    '\u{200C}', // zero width non-joiner
    '\u{200D}', // zero width joiner
    '\u{2060}', // word joiner
];

pub fn normalize_summary(raw: &str) -> String {
    let cleaned = run_steps(raw, &CLEANING_STEPS);
    if let Some(json) = parse_canonical(&cleaned) {
        return json;
    }

    if let Some(slice) = slice_braces(&cleaned) {
        let repaired = run_steps(slice, &SLICE_STEPS);
        if let Some(json) = parse_canonical(&repaired) {
            tracing::debug!("summary recovered from embedded object");
            return json;
        }
    }

    tracing::warn!(len = raw.len(), "summary is not valid JSON; keeping raw model text");
    raw.to_string()
}

fn run_steps(input: &str, steps: &[(&str, Step)]) -> String {
    steps.iter().fold(input.to_string(), |text, (name, step)| {
        let next = step(&text);
        if next != text {
            tracing::trace!(step = name, "normalize step changed text");
        }
        next
    })
}

/// Marks are only dropped ahead of the content; a joiner inside a string
/// value is part of an emoji sequence.
pub fn strip_invisible(text: &str) -> String {
    let without_nul: String = text.chars().filter(|c| *c != '\0').collect();
    without_nul
        .trim_start_matches(|c: char| c.is_whitespace() || LEADING_MARKS.contains(&c))
        .trim_end()
        .to_string()
}

/// Returns the content of the first fenced block, or the input unchanged
/// when there is no complete fence.
pub fn extract_fenced(text: &str) -> String {
    let Some(open) = text.find("```") else {
        return text.to_string();
    };
    let mut body = &text[open + 3..];
    if body
        .get(..4)
        .is_some_and(|tag| tag.eq_ignore_ascii_case("json"))
    {
        body = &body[4..];
    }
    match body.find("```") {
        Some(close) => body[..close].trim().to_string(),
        None => text.to_string(),
    }
}

pub fn straighten_quotes(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{201C}' | '\u{201D}' => '"',
            '\u{2018}' | '\u{2019}' => '\'',
            other => other,
        })
        .collect()
}

/// Drops a comma (and the whitespace after it) when the next non-space
/// character closes an object or array. Not string-aware.
pub fn strip_trailing_commas(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == ',' {
            let mut j = i + 1;
            while j < chars.len() && chars[j].is_whitespace() {
                j += 1;
            }
            if j < chars.len() && matches!(chars[j], '}' | ']') {
                i = j;
                continue;
            }
        }
        out.push(chars[i]);
        i += 1;
    }
    out
}

/// First `{` through last `}`, inclusive.
pub fn slice_braces(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}

fn parse_canonical(text: &str) -> Option<String> {
    serde_json::from_str::<Value>(text).ok().map(|v| v.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fenced_with_trailing_comma_becomes_canonical() {
        let raw = "```json\n{\"headline\":\"ok\",}\n```";
        assert_eq!(normalize_summary(raw), r#"{"headline":"ok"}"#);
    }

    #[test]
    fn non_json_is_returned_unchanged() {
        assert_eq!(normalize_summary("the model refused"), "the model refused");
    }

    #[test]
    fn fallback_returns_original_not_cleaned_text() {
        let raw = "\u{FEFF}  ```\nnot json at all\n```  ";
        assert_eq!(normalize_summary(raw), raw);
    }

    #[test]
    fn whitespace_is_normalized_and_key_order_kept() {
        let raw = "{\n  \"headline\": \"Q4 push\",\n  \"risks\": [ \"budget\" ],\n  \"snapshot\": []\n}";
        assert_eq!(
            normalize_summary(raw),
            r#"{"headline":"Q4 push","risks":["budget"],"snapshot":[]}"#
        );
    }

    #[test]
    fn smart_quotes_are_repaired() {
        let raw = "{\u{201C}headline\u{201D}: \u{201C}ok\u{201D}}";
        assert_eq!(normalize_summary(raw), r#"{"headline":"ok"}"#);
    }

    #[test]
    fn embedded_object_is_sliced_out() {
        let raw = "Sure! Here is the summary: {\"headline\": \"ok\", \"risks\": [\"a\",],} Hope that helps.";
        assert_eq!(normalize_summary(raw), r#"{"headline":"ok","risks":["a"]}"#);
    }

    #[test]
    fn bom_and_nulls_before_json_are_ignored() {
        let raw = "\u{FEFF}\u{200B}{\"a\":1}\0";
        assert_eq!(normalize_summary(raw), r#"{"a":1}"#);
    }

    #[test]
    fn joiner_inside_string_value_survives() {
        let family = "\u{1F468}\u{200D}\u{1F469}\u{200D}\u{1F467}";
        let raw = format!("\u{FEFF}{{\"headline\":\"{family}\"}}");
        let out = normalize_summary(&raw);
        let parsed: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed["headline"], family);
    }

    #[test]
    fn strip_invisible_removes_marks_and_trims() {
        assert_eq!(strip_invisible("\u{FEFF} \u{200B}ab\0 "), "ab");
        assert_eq!(strip_invisible("a\0b"), "ab");
        assert_eq!(strip_invisible("plain"), "plain");
    }

    #[test]
    fn extract_fenced_variants() {
        assert_eq!(extract_fenced("```json\n{}\n```"), "{}");
        assert_eq!(extract_fenced("```JSON\n[1]\n```"), "[1]");
        assert_eq!(extract_fenced("```\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(extract_fenced("intro\n```json {\"a\":1} ``` outro"), "{\"a\":1}");
        // unterminated fence leaves the text alone
        assert_eq!(extract_fenced("```json\n{\"a\":1}"), "```json\n{\"a\":1}");
        assert_eq!(extract_fenced("no fence"), "no fence");
    }

    #[test]
    fn straighten_quotes_maps_both_kinds() {
        assert_eq!(
            straighten_quotes("\u{201C}it\u{2019}s\u{201D} \u{2018}x\u{2019}"),
            "\"it's\" 'x'"
        );
    }

    #[test]
    fn strip_trailing_commas_cases() {
        assert_eq!(strip_trailing_commas("{\"a\":1,}"), "{\"a\":1}");
        assert_eq!(strip_trailing_commas("[1,2,\n  ]"), "[1,2]");
        assert_eq!(strip_trailing_commas("{\"a\":[1,],}"), "{\"a\":[1]}");
        assert_eq!(strip_trailing_commas("{\"a\":1,\"b\":2}"), "{\"a\":1,\"b\":2}");
        assert_eq!(strip_trailing_commas(",,}"), ",}");
    }

    #[test]
    fn slice_braces_bounds() {
        assert_eq!(slice_braces("x {\"a\":{}} y"), Some("{\"a\":{}}"));
        assert_eq!(slice_braces("} backwards {"), None);
        assert_eq!(slice_braces("nothing"), None);
    }
}
