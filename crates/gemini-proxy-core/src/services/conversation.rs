//! Conversation and message CRUD on top of the stores.

use std::sync::Arc;

use tracing::info;

use crate::domain::validation::{validate_conversation_name, validate_message_content, ContentLimits};
use crate::domain::{Conversation, Message, Role, SortOrder};
use crate::entities::{ConversationStore, MessageStore};
use crate::error::CoreError;

/// Messages embedded in a conversation detail response.
pub const DETAIL_MESSAGE_COUNT: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

pub struct ConversationService<S> {
    store: Arc<S>,
    limits: ContentLimits,
}

impl<S> Clone for ConversationService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            limits: self.limits,
        }
    }
}

fn check_limit(limit: u32) -> Result<u32, CoreError> {
    if (1..=MAX_PAGE_SIZE).contains(&limit) {
        Ok(limit)
    } else {
        Err(CoreError::Validation(format!(
            "limit must be between 1 and {MAX_PAGE_SIZE}"
        )))
    }
}

impl<S: ConversationStore + MessageStore> ConversationService<S> {
    pub fn new(store: Arc<S>, allow_sql_snippets: bool) -> Self {
        Self {
            store,
            limits: ContentLimits {
                allow_sql_snippets,
                ..ContentLimits::default()
            },
        }
    }

    pub async fn list(&self, limit: u32, order: SortOrder) -> Result<Vec<Conversation>, CoreError> {
        Ok(self.store.list(check_limit(limit)?, order).await?)
    }

    pub async fn create(&self, name: Option<&str>) -> Result<Conversation, CoreError> {
        let name = name.map(validate_conversation_name).transpose()?;
        let created = self.store.create(Conversation::new(name)).await?;
        info!(conversation_id = %created.id, "conversation created");
        Ok(created)
    }

    /// Conversation with its latest messages, oldest first.
    pub async fn get(&self, id: &str) -> Result<Conversation, CoreError> {
        let mut conversation = self.require(id).await?;
        conversation.messages = self
            .store
            .get_latest_by_conversation(id, DETAIL_MESSAGE_COUNT)
            .await?;
        Ok(conversation)
    }

    pub async fn rename(&self, id: &str, name: &str) -> Result<Conversation, CoreError> {
        let name = validate_conversation_name(name)?;
        self.store
            .rename(id, &name)
            .await?
            .ok_or_else(|| not_found("conversation", id))
    }

    pub async fn delete(&self, id: &str) -> Result<(), CoreError> {
        if ConversationStore::delete(self.store.as_ref(), id).await? {
            info!(conversation_id = %id, "conversation deleted");
            Ok(())
        } else {
            Err(not_found("conversation", id))
        }
    }

    pub async fn messages(
        &self,
        conversation_id: &str,
        limit: u32,
        order: SortOrder,
    ) -> Result<Vec<Message>, CoreError> {
        let limit = check_limit(limit)?;
        self.require(conversation_id).await?;
        Ok(self
            .store
            .list_by_conversation(conversation_id, limit, order)
            .await?)
    }

    pub async fn get_message(&self, id: &str) -> Result<Message, CoreError> {
        self.store
            .get_by_id(id)
            .await?
            .ok_or_else(|| not_found("message", id))
    }

    pub async fn update_message(&self, id: &str, role: Role, content: &str) -> Result<Message, CoreError> {
        let content = validate_message_content(content, self.limits)?;
        self.store
            .update(id, role, &content)
            .await?
            .ok_or_else(|| not_found("message", id))
    }

    pub async fn delete_message(&self, id: &str) -> Result<(), CoreError> {
        if MessageStore::delete(self.store.as_ref(), id).await? {
            Ok(())
        } else {
            Err(not_found("message", id))
        }
    }

    async fn require(&self, id: &str) -> Result<Conversation, CoreError> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| not_found("conversation", id))
    }
}

fn not_found(kind: &str, id: &str) -> CoreError {
    CoreError::NotFound(format!("{kind} {id} not found"))
}
