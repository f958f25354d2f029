//! Ways of pulling reply text out of one upstream JSON document.
//!
//! Strategies are tried in order and the first one that finds anything wins.

use serde_json::Value;

/// Pulls zero or more non-empty text pieces out of a JSON document.
pub type Strategy = fn(&Value) -> Vec<String>;

/// `(name, strategy)` in priority order.
pub const STRATEGIES: &[(&str, Strategy)] = &[
    ("candidates", candidate_parts),
    ("text", top_level_text),
    ("message", top_level_message),
    ("content", top_level_content),
];

/// Run [`STRATEGIES`] and return the first non-empty result.
pub fn extract_texts(doc: &Value) -> Vec<String> {
    for (name, strategy) in STRATEGIES {
        let found = strategy(doc);
        if !found.is_empty() {
            tracing::trace!(strategy = name, pieces = found.len(), "extracted text");
            return found;
        }
    }
    Vec::new()
}

/// `candidates[*].content.parts[*].text`
pub fn candidate_parts(doc: &Value) -> Vec<String> {
    let Some(candidates) = doc.get("candidates").and_then(Value::as_array) else {
        return Vec::new();
    };
    candidates
        .iter()
        .filter_map(|c| c.pointer("/content/parts").and_then(Value::as_array))
        .flatten()
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .filter(|text| !text.is_empty())
        .map(str::to_owned)
        .collect()
}

fn top_level_text(doc: &Value) -> Vec<String> {
    top_level_string(doc, "text")
}

fn top_level_message(doc: &Value) -> Vec<String> {
    top_level_string(doc, "message")
}

fn top_level_content(doc: &Value) -> Vec<String> {
    top_level_string(doc, "content")
}

fn top_level_string(doc: &Value, key: &str) -> Vec<String> {
    match doc.get(key).and_then(Value::as_str) {
        Some(s) if !s.is_empty() => vec![s.to_owned()],
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn candidates_take_priority() {
        let doc = json!({
            "text": "ignored",
            "candidates": [
                {"content": {"parts": [{"text": "He"}, {"inlineData": {}}, {"text": ""}]}},
                {"content": {"parts": [{"text": "llo"}]}}
            ]
        });
        assert_eq!(extract_texts(&doc), vec!["He", "llo"]);
    }

    #[test]
    fn falls_back_through_top_level_fields() {
        assert_eq!(extract_texts(&json!({"text": "t"})), vec!["t"]);
        assert_eq!(extract_texts(&json!({"text": "", "message": "m"})), vec!["m"]);
        assert_eq!(extract_texts(&json!({"content": "c"})), vec!["c"]);
        assert_eq!(extract_texts(&json!({"content": {"parts": []}})), Vec::<String>::new());
    }

    #[test]
    fn non_objects_yield_nothing() {
        assert!(extract_texts(&json!([1, 2])).is_empty());
        assert!(extract_texts(&json!("text")).is_empty());
        assert!(extract_texts(&json!({"candidates": []})).is_empty());
    }
}
