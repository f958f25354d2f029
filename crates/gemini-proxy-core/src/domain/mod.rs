//! Domain types shared by the stores, the generation client and the services.

pub mod conversation;
pub mod message;
pub mod validation;

pub use conversation::Conversation;
pub use message::{Message, Role, SortOrder};

/// An ephemeral piece of assistant text, in arrival order. Never empty.
pub type Fragment = String;

/// Current time as unix seconds.
pub fn now_ts() -> i64 {
    chrono::Utc::now().timestamp()
}
