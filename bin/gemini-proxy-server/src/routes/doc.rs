use utoipa::OpenApi;

use crate::routes::{conversations, gemini, health, messages};

#[derive(OpenApi)]
#[openapi(info(
    title = "gemini-proxy",
    description = "Conversation-persisting proxy for Gemini-style generative language APIs",
    contact(name = "gemini-proxy", url = "https://github.com/tranphuc8a/gemini-proxy")
))]
pub struct ApiDoc;

pub fn get_docs() -> utoipa::openapi::OpenApi {
    let mut root = ApiDoc::openapi();
    root.merge(health::HealthApi::openapi());
    root.merge(gemini::GeminiApi::openapi());
    root.merge(conversations::ConversationsApi::openapi());
    root.merge(messages::MessagesApi::openapi());
    root
}
