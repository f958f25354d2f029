//! Axum router construction.
//!
//! [`build`] assembles the complete application router:
//! - Middleware layers (CORS, per-request trace-ID injection)
//! - Health and readiness probes
//! - Generation routes under `/gemini`
//! - Conversation and message CRUD
//! - Optional OpenAPI document (disable with `GEMINI_PROXY_ENABLE_OPENAPI=false`)

mod conversations;
pub mod doc;
mod gemini;
mod health;
mod messages;

use std::sync::Arc;

use axum::routing::get;
use axum::{middleware, Json, Router};

use crate::middleware::{cors, trace};
use crate::state::AppState;

/// Build the complete Axum [`Router`] for the application.
pub fn build(state: Arc<AppState>) -> Router {
    let mut app = Router::new()
        .merge(health::router())
        .merge(gemini::router())
        .merge(conversations::router())
        .merge(messages::router());

    if state.config.enable_openapi {
        let api_doc = doc::get_docs();
        app = app.route(
            "/api-docs/openapi.json",
            get(move || std::future::ready(Json(api_doc.clone()))),
        );
    }

    app
        .layer(cors::cors_layer(state.config.cors_allowed_origins.as_deref()))
        .layer(middleware::from_fn(trace::trace_middleware))
        .with_state(state)
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;
    use std::time::Duration;

    use gemini_proxy_core::entities::SqlStore;
    use gemini_proxy_core::gemini::{GeminiClient, RetryPolicy};

    use crate::config::Config;
    use crate::state::AppState;

    /// State over an in-memory database, pointed at `url` with no retry delay.
    pub async fn test_state(url: Option<String>) -> Arc<AppState> {
        let mut config = Config::default();
        config.gemini.url = url;
        config.gemini.api_key = Some("test-key".into());
        config.gemini.retry = RetryPolicy {
            max_attempts: 1,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        };
        let store = SqlStore::connect(&config.database_url).await.unwrap();
        let client = GeminiClient::new(config.gemini.clone());
        Arc::new(AppState::new(config, store, client))
    }
}
