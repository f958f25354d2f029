use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use super::now_ts;

/// Author of a message, in the upstream's vocabulary.
///
/// Parsing is case-insensitive; `bot` and `assistant` are accepted as
/// older spellings of [`Role::Model`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive)]
pub enum Role {
    #[strum(serialize = "user")]
    User,
    #[strum(to_string = "model", serialize = "bot", serialize = "assistant")]
    #[serde(alias = "bot", alias = "assistant")]
    Model,
}

/// A persisted chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub role: Role,
    pub content: String,
    /// Unix seconds.
    pub created_at: i64,
}

impl Message {
    /// A fresh message stamped with a new `msg-` id and the current time.
    pub fn new(conversation_id: impl Into<String>, role: Role, content: impl Into<String>) -> Self {
        Self {
            id: format!("msg-{}", Uuid::new_v4()),
            conversation_id: conversation_id.into(),
            role,
            content: content.into(),
            created_at: now_ts(),
        }
    }
}

/// Ordering by `created_at` for list endpoints.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_sql(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn role_parses_legacy_spellings() {
        assert_eq!(Role::from_str("USER").unwrap(), Role::User);
        assert_eq!(Role::from_str("model").unwrap(), Role::Model);
        assert_eq!(Role::from_str("bot").unwrap(), Role::Model);
        assert_eq!(Role::from_str("Assistant").unwrap(), Role::Model);
        assert!(Role::from_str("system").is_err());
    }

    #[test]
    fn role_displays_wire_name() {
        assert_eq!(Role::User.to_string(), "user");
        assert_eq!(Role::Model.to_string(), "model");
        assert_eq!(Role::Model.as_ref(), "model");
    }

    #[test]
    fn new_message_has_prefixed_id() {
        let m = Message::new("c1", Role::User, "hi");
        assert!(m.id.starts_with("msg-"));
        assert_eq!(m.conversation_id, "c1");
        assert!(m.created_at > 0);
    }

    #[test]
    fn sort_order_parses_case_insensitively() {
        assert_eq!(SortOrder::from_str("ASC").unwrap(), SortOrder::Asc);
        assert_eq!(SortOrder::from_str("desc").unwrap(), SortOrder::Desc);
        assert_eq!(SortOrder::default(), SortOrder::Desc);
    }
}
