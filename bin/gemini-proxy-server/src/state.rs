//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use gemini_proxy_core::entities::SqlStore;
use gemini_proxy_core::gemini::GeminiClient;
use gemini_proxy_core::services::{ChatService, ConversationService};

use crate::config::Config;

/// Built once in `main`; handlers receive it as `State<Arc<AppState>>`.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<SqlStore>,
    pub chat: ChatService<SqlStore, GeminiClient>,
    pub conversations: ConversationService<SqlStore>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

impl AppState {
    pub fn new(config: Config, store: SqlStore, client: GeminiClient) -> Self {
        let store = Arc::new(store);
        let chat = ChatService::new(Arc::clone(&store), Arc::new(client), config.chat.clone());
        let conversations =
            ConversationService::new(Arc::clone(&store), config.chat.allow_sql_snippets);
        Self {
            config: Arc::new(config),
            store,
            chat,
            conversations,
        }
    }
}
