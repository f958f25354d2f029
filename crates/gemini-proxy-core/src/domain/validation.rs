//! Input guards for message content, conversation names and model names.
//!
//! Sanitization strips the common script vectors but keeps markdown, code
//! fences, URLs and emoji readable. It is not a full HTML sanitizer.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::CoreError;

static SCRIPT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<\s*script[^>]*>.*?<\s*/\s*script\s*>").expect("valid script regex")
});
static ON_ATTR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)on\w+\s*=").expect("valid attribute regex"));
static JS_URI_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)javascript:\s*").expect("valid uri regex"));
static CONTROL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\x00-\x08\x0b\x0c\x0e-\x1f\x7f]").expect("valid control-char regex")
});
static WORD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\S+").expect("valid word regex"));
static MODEL_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]{0,127}$").expect("valid model-name regex")
});

const SQL_KEYWORDS: [&str; 7] = [
    "DROP ", "DELETE ", "INSERT ", "UPDATE ", "SELECT ", "ALTER ", "TRUNCATE ",
];

pub const MAX_CONVERSATION_NAME_CHARS: usize = 200;

/// Bounds applied by [`validate_message_content`].
#[derive(Debug, Clone, Copy)]
pub struct ContentLimits {
    pub max_chars: usize,
    pub max_tokens: usize,
    pub allow_sql_snippets: bool,
}

impl Default for ContentLimits {
    fn default() -> Self {
        Self {
            max_chars: 20_000,
            max_tokens: 20_000,
            allow_sql_snippets: false,
        }
    }
}

/// Trim, sanitize and bound a user-supplied message.
///
/// Returns the sanitized text that should be stored and sent upstream.
pub fn validate_message_content(raw: &str, limits: ContentLimits) -> Result<String, CoreError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation(
            "message must be a non-empty string".into(),
        ));
    }

    let clean = sanitize(trimmed);
    let chars = clean.chars().count();
    if chars > limits.max_chars {
        return Err(CoreError::Validation(format!(
            "message must be at most {} characters long",
            limits.max_chars
        )));
    }

    let tokens = estimate_tokens(&clean);
    if tokens > limits.max_tokens {
        return Err(CoreError::Validation(format!(
            "message is too large: ~{tokens} tokens (max {})",
            limits.max_tokens
        )));
    }

    if !limits.allow_sql_snippets && looks_like_sql(raw) {
        return Err(CoreError::Validation(
            "message looks like SQL and is not allowed".into(),
        ));
    }

    Ok(clean)
}

/// 1-200 characters after trimming, then sanitized.
pub fn validate_conversation_name(raw: &str) -> Result<String, CoreError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation(
            "conversation name must be a non-empty string".into(),
        ));
    }
    if trimmed.chars().count() > MAX_CONVERSATION_NAME_CHARS {
        return Err(CoreError::Validation(format!(
            "conversation name must be at most {MAX_CONVERSATION_NAME_CHARS} characters long"
        )));
    }
    Ok(sanitize(trimmed))
}

/// Pick the model for a request.
///
/// A well-formed name is used as given, whether or not the upstream knows it.
/// Blank or malformed names fall back to `default` without an error.
pub fn resolve_model(requested: Option<&str>, default: &str) -> String {
    match requested.map(str::trim) {
        Some(name) if MODEL_NAME_RE.is_match(name) => name.to_owned(),
        Some(name) if !name.is_empty() => {
            tracing::debug!(requested = %name, fallback = %default, "malformed model name; using default");
            default.to_owned()
        }
        _ => default.to_owned(),
    }
}

/// Rough token count: the larger of the word count and `chars / 4`.
pub fn estimate_tokens(text: &str) -> usize {
    if text.is_empty() {
        return 0;
    }
    let words = WORD_RE.find_iter(text).count();
    let by_chars = ((text.chars().count() as f64) / 4.0).round().max(1.0) as usize;
    words.max(by_chars)
}

/// Remove executable HTML/JS vectors and escape what is left.
pub fn sanitize(s: &str) -> String {
    let s = SCRIPT_RE.replace_all(s, "");
    let s = ON_ATTR_RE.replace_all(&s, "");
    let s = JS_URI_RE.replace_all(&s, "");
    let s = CONTROL_RE.replace_all(&s, "");
    html_escape(&s).replace("&lt;`", "<`").replace("`&gt;", "`>")
}

fn html_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            c => out.push(c),
        }
    }
    out
}

fn looks_like_sql(s: &str) -> bool {
    if !s.contains(';') {
        return false;
    }
    let upper = s.to_uppercase();
    SQL_KEYWORDS.iter().any(|k| upper.contains(k))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn rejects_blank_content() {
        let err = validate_message_content("   \n\t ", ContentLimits::default()).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn trims_and_keeps_plain_text() {
        let out = validate_message_content("  hello world  ", ContentLimits::default()).unwrap();
        assert_eq!(out, "hello world");
    }

    #[test]
    fn strips_script_blocks_and_handlers() {
        let out = sanitize("hi <script>alert(1)</script><b onclick=x()>there</b>");
        assert!(!out.contains("script"));
        assert!(!out.contains("onclick"));
        assert_eq!(out, "hi &lt;b x()&gt;there&lt;/b&gt;");
    }

    #[test]
    fn strips_javascript_uri_and_control_chars() {
        let out = sanitize("go javascript: alert\u{0}\u{7} now\n\tok");
        assert_eq!(out, "go alert now\n\tok");
    }

    #[test]
    fn keeps_code_fence_brackets_readable() {
        assert_eq!(sanitize("<`code`>"), "<`code`>");
        assert_eq!(sanitize("it's \"quoted\""), "it&#x27;s &quot;quoted&quot;");
    }

    #[test]
    fn rejects_oversized_content() {
        let limits = ContentLimits {
            max_chars: 10,
            ..ContentLimits::default()
        };
        let err = validate_message_content("abcdefghijk", limits).unwrap_err();
        assert!(err.to_string().contains("at most 10"));
    }

    #[test]
    fn rejects_too_many_tokens() {
        let limits = ContentLimits {
            max_tokens: 3,
            ..ContentLimits::default()
        };
        assert!(validate_message_content("one two three four", limits).is_err());
    }

    #[test]
    fn sql_check_honours_opt_in() {
        let raw = "DROP TABLE users;";
        assert!(validate_message_content(raw, ContentLimits::default()).is_err());
        let limits = ContentLimits {
            allow_sql_snippets: true,
            ..ContentLimits::default()
        };
        assert_eq!(validate_message_content(raw, limits).unwrap(), raw);
        // keyword without a semicolon is fine
        assert!(validate_message_content("please select one", ContentLimits::default()).is_ok());
    }

    #[test]
    fn estimates_tokens() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("a"), 1);
        assert_eq!(estimate_tokens("one two three"), 3);
        assert_eq!(estimate_tokens(&"x".repeat(40)), 10);
    }

    #[test]
    fn model_names_fall_back_silently() {
        assert_eq!(resolve_model(None, "gemini-1.5-flash"), "gemini-1.5-flash");
        assert_eq!(resolve_model(Some("  "), "d"), "d");
        assert_eq!(resolve_model(Some("gemini-2.0-pro"), "d"), "gemini-2.0-pro");
        assert_eq!(resolve_model(Some("not-a-known-model"), "d"), "not-a-known-model");
        assert_eq!(resolve_model(Some("../../etc"), "d"), "d");
        assert_eq!(resolve_model(Some("bad name"), "d"), "d");
    }

    #[test]
    fn conversation_name_bounds() {
        assert_eq!(validate_conversation_name("  Trip  ").unwrap(), "Trip");
        assert!(validate_conversation_name("").is_err());
        assert!(validate_conversation_name(&"n".repeat(201)).is_err());
        assert!(validate_conversation_name(&"n".repeat(200)).is_ok());
    }
}
