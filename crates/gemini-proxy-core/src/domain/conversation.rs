use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{now_ts, Message};

/// Name given to conversations created without one.
pub const DEFAULT_CONVERSATION_NAME: &str = "New Conversation";

/// A conversation: the aggregation key for history lookups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub name: String,
    pub created_at: i64,
    pub updated_at: Option<i64>,
    /// Populated only by detail lookups; oldest first.
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl Conversation {
    pub fn new(name: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.unwrap_or_else(|| DEFAULT_CONVERSATION_NAME.to_owned()),
            created_at: now_ts(),
            updated_at: None,
            messages: Vec::new(),
        }
    }
}
