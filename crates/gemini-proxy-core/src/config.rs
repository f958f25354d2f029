//! Upstream and pipeline configuration, loaded from environment variables at startup.
//!
//! Both structs are built once in `main` and are read-only afterwards.

use std::time::Duration;

use crate::gemini::client::RetryPolicy;

/// Default model used when a request names none (or names a malformed one).
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Settings for the upstream generative-language endpoint.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// Full `generateContent` URL, e.g.
    /// `https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent`.
    /// `None` leaves the proxy running but every generation fails fast.
    pub url: Option<String>,

    /// Sent as `x-goog-api-key` when present.
    pub api_key: Option<String>,

    /// Budget for the non-streaming call, retries included, also used as the
    /// orchestrator's deadline (default: 30 s). Bounds how long a rejected
    /// stream's error body is read.
    pub timeout: Duration,

    /// Model used when the request does not name a well-formed one.
    pub default_model: String,

    /// Backoff for transient network errors on the non-streaming call.
    pub retry: RetryPolicy,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            url: None,
            api_key: None,
            timeout: Duration::from_secs(30),
            default_model: DEFAULT_MODEL.to_owned(),
            retry: RetryPolicy::default(),
        }
    }
}

impl GeminiConfig {
    /// Build [`GeminiConfig`] from `GEMINI_*` environment variables.
    pub fn from_env() -> Self {
        Self {
            url: non_blank_env("GEMINI_URL"),
            api_key: non_blank_env("GEMINI_API_KEY"),
            timeout: Duration::from_secs(parse_env("GEMINI_TIMEOUT_SECONDS", 30)),
            default_model: env_or("GEMINI_DEFAULT_MODEL", DEFAULT_MODEL),
            retry: RetryPolicy::default(),
        }
    }
}

/// Knobs for the conversation orchestrator.
#[derive(Debug, Clone)]
pub struct ChatSettings {
    /// How many of the most recent messages are sent as context (default: 100).
    pub history_limit: u32,

    /// Accept message content that looks like a destructive SQL statement.
    pub allow_sql_snippets: bool,

    /// Deadline for the non-streaming `query` path.
    pub upstream_timeout: Duration,

    /// Fallback model name.
    pub default_model: String,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            history_limit: 100,
            allow_sql_snippets: false,
            upstream_timeout: Duration::from_secs(30),
            default_model: DEFAULT_MODEL.to_owned(),
        }
    }
}

impl ChatSettings {
    /// Build [`ChatSettings`] from the environment, sharing the timeout and
    /// default model of the upstream configuration.
    pub fn from_env(gemini: &GeminiConfig) -> Self {
        Self {
            history_limit: parse_env("GEMINI_PROXY_HISTORY_LIMIT", 100),
            allow_sql_snippets: bool_env("GEMINI_PROXY_ALLOW_SQL_SNIPPETS"),
            upstream_timeout: gemini.timeout,
            default_model: gemini.default_model.clone(),
        }
    }
}

// ── env helpers ──────────────────────────────────────────────────────────────

pub fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}

pub fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

pub fn bool_env(key: &str) -> bool {
    std::env::var(key)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

fn non_blank_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}
