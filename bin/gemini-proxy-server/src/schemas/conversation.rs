use gemini_proxy_core::domain::{Conversation, Message, SortOrder};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::error::ServerError;

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, Validate)]
pub struct CreateConversationRequest {
    #[validate(length(max = 200, message = "name must be at most 200 characters"))]
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct RenameConversationRequest {
    #[validate(length(min = 1, max = 200, message = "name must be 1-200 characters"))]
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct UpdateMessageRequest {
    #[validate(length(min = 1, message = "content must not be empty"))]
    pub content: String,
    /// `user` or `model` (`bot` and `assistant` are accepted for `model`).
    pub role: String,
}

/// `?limit=&order=` for list endpoints.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListQuery {
    /// 1-100, default 10.
    pub limit: Option<u32>,
    /// `asc` or `desc` by creation time, default `desc`.
    pub order: Option<String>,
}

impl ListQuery {
    pub const DEFAULT_LIMIT: u32 = 10;

    pub fn limit(&self) -> u32 {
        self.limit.unwrap_or(Self::DEFAULT_LIMIT)
    }

    pub fn order(&self) -> Result<SortOrder, ServerError> {
        match self.order.as_deref() {
            None => Ok(SortOrder::default()),
            Some(raw) => raw
                .parse()
                .map_err(|_| ServerError::BadRequest(format!("order must be 'asc' or 'desc', got '{raw}'"))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub id: String,
    pub conversation_id: String,
    pub role: String,
    pub content: String,
    /// Unix seconds.
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ConversationResponse {
    pub id: String,
    pub name: String,
    pub created_at: i64,
    pub updated_at: Option<i64>,
    /// Only populated on the detail endpoint.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub messages: Vec<MessageResponse>,
}

impl From<Message> for MessageResponse {
    fn from(m: Message) -> Self {
        MessageResponse {
            id: m.id,
            conversation_id: m.conversation_id,
            role: m.role.to_string(),
            content: m.content,
            created_at: m.created_at,
        }
    }
}

impl From<Conversation> for ConversationResponse {
    fn from(c: Conversation) -> Self {
        ConversationResponse {
            id: c.id,
            name: c.name,
            created_at: c.created_at,
            updated_at: c.updated_at,
            messages: c.messages.into_iter().map(Into::into).collect(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use gemini_proxy_core::domain::Role;

    #[test]
    fn list_query_defaults() {
        let q = ListQuery::default();
        assert_eq!(q.limit(), 10);
        assert_eq!(q.order().unwrap(), SortOrder::Desc);
    }

    #[test]
    fn list_query_rejects_unknown_order() {
        let q = ListQuery {
            limit: None,
            order: Some("sideways".into()),
        };
        assert!(matches!(q.order(), Err(ServerError::BadRequest(_))));
        let q = ListQuery {
            limit: Some(5),
            order: Some("ASC".into()),
        };
        assert_eq!(q.order().unwrap(), SortOrder::Asc);
    }

    #[test]
    fn message_response_uses_wire_role() {
        let r = MessageResponse::from(Message::new("c", Role::Model, "hi"));
        assert_eq!(r.role, "model");
    }

    #[test]
    fn rename_requires_a_name() {
        let req = RenameConversationRequest { name: String::new() };
        assert!(req.validate().is_err());
    }
}
