use gemini_proxy_core::services::{ChatReply, ChatRequest};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct QueryRequest {
    #[validate(length(min = 1, max = 128, message = "conversation_id must be 1-128 characters"))]
    pub conversation_id: String,

    /// Prompt text. Trimmed and sanitized before use.
    #[validate(length(min = 1, message = "content must not be empty"))]
    pub content: String,

    /// Upstream model name; malformed names fall back to the server default.
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct QueryResponse {
    pub conversation_id: String,
    pub model: String,
    pub content: String,
}

impl From<QueryRequest> for ChatRequest {
    fn from(req: QueryRequest) -> Self {
        ChatRequest {
            conversation_id: req.conversation_id,
            content: req.content,
            model: req.model,
        }
    }
}

impl From<ChatReply> for QueryResponse {
    fn from(reply: ChatReply) -> Self {
        QueryResponse {
            conversation_id: reply.conversation_id,
            model: reply.model,
            content: reply.content,
        }
    }
}
