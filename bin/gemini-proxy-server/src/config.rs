//! Server configuration, loaded from environment variables at startup.

use gemini_proxy_core::config::{bool_env, env_or, parse_env, ChatSettings};
use gemini_proxy_core::GeminiConfig;

/// Runtime configuration for gemini-proxy-server.
///
/// Every field has a default so the server starts without any environment
/// variables set; generation requests fail until `GEMINI_URL` is provided.
#[derive(Debug, Clone)]
pub struct Config {
    /// TCP address to bind (default: `"0.0.0.0:6789"`).
    pub bind_address: String,

    /// sqlx SQLite URL (default: `"sqlite://gemini-proxy.db?mode=rwc"`).
    pub database_url: String,

    /// `tracing` filter string, e.g. `"info"` or `"debug,tower_http=warn"`.
    pub log_level: String,

    /// When `true`, emit log records as newline-delimited JSON.
    pub log_json: bool,

    /// Comma-separated list of allowed CORS origins. `None` allows any origin.
    pub cors_allowed_origins: Option<String>,

    /// Serve `/api-docs/openapi.json` (default: `true`).
    pub enable_openapi: bool,

    pub gemini: GeminiConfig,
    pub chat: ChatSettings,
}

impl Config {
    /// Build [`Config`] from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let gemini = GeminiConfig::from_env();
        let chat = ChatSettings::from_env(&gemini);
        Self {
            bind_address: env_or("GEMINI_PROXY_BIND", "0.0.0.0:6789"),
            database_url: env_or("GEMINI_PROXY_DATABASE_URL", "sqlite://gemini-proxy.db?mode=rwc"),
            log_level: env_or("GEMINI_PROXY_LOG", "info"),
            log_json: bool_env("GEMINI_PROXY_LOG_JSON"),
            cors_allowed_origins: std::env::var("GEMINI_PROXY_CORS_ORIGINS").ok(),
            enable_openapi: parse_env("GEMINI_PROXY_ENABLE_OPENAPI", true),
            gemini,
            chat,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:0".to_owned(),
            database_url: "sqlite::memory:".to_owned(),
            log_level: "info".to_owned(),
            log_json: false,
            cors_allowed_origins: None,
            enable_openapi: true,
            gemini: GeminiConfig::default(),
            chat: ChatSettings::default(),
        }
    }
}
