//! Use-case layer: the conversation orchestrator and conversation CRUD.

pub mod chat;
pub mod conversation;

pub use chat::{ChatReply, ChatRequest, ChatService, ChatStream};
pub use conversation::ConversationService;
