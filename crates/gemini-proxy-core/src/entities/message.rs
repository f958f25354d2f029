use std::future::Future;
use std::str::FromStr;

use crate::domain::{now_ts, Message, Role, SortOrder};
use crate::entities::SqlStore;

type MessageRow = (String, String, String, String, i64);

const COLUMNS: &str = "id, conversation_id, role, content, created_at";

pub trait MessageStore: Send + Sync + 'static {
    /// Persist `msg`, creating its conversation if it does not exist yet.
    fn save(&self, msg: Message) -> impl Future<Output = Result<Message, sqlx::Error>> + Send;

    /// The `count` most recent messages of a conversation, oldest first.
    fn get_latest_by_conversation(
        &self,
        conversation_id: &str,
        count: u32,
    ) -> impl Future<Output = Result<Vec<Message>, sqlx::Error>> + Send;

    fn get_by_id(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<Option<Message>, sqlx::Error>> + Send;

    /// Replace role and content. `None` when no such message exists.
    fn update(
        &self,
        id: &str,
        role: Role,
        content: &str,
    ) -> impl Future<Output = Result<Option<Message>, sqlx::Error>> + Send;

    /// `true` if a row was removed.
    fn delete(&self, id: &str) -> impl Future<Output = Result<bool, sqlx::Error>> + Send;

    fn list_by_conversation(
        &self,
        conversation_id: &str,
        limit: u32,
        order: SortOrder,
    ) -> impl Future<Output = Result<Vec<Message>, sqlx::Error>> + Send;
}

fn into_message((id, conversation_id, role, content, created_at): MessageRow) -> Message {
    let role = Role::from_str(&role).unwrap_or_else(|_| {
        tracing::warn!(%id, raw = %role, "unknown message role in database; treating as user");
        Role::User
    });
    Message {
        id,
        conversation_id,
        role,
        content,
        created_at,
    }
}

impl MessageStore for SqlStore {
    async fn save(&self, msg: Message) -> Result<Message, sqlx::Error> {
        let mut tx = self.pool().begin().await?;
        sqlx::query(
            "INSERT OR IGNORE INTO conversations (id, name, created_at) VALUES (?1, ?2, ?3)",
        )
        .bind(&msg.conversation_id)
        .bind(crate::domain::conversation::DEFAULT_CONVERSATION_NAME)
        .bind(msg.created_at)
        .execute(&mut *tx)
        .await?;
        sqlx::query(
            "INSERT INTO messages (id, conversation_id, role, content, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&msg.id)
        .bind(&msg.conversation_id)
        .bind(msg.role.as_ref())
        .bind(&msg.content)
        .bind(msg.created_at)
        .execute(&mut *tx)
        .await?;
        sqlx::query("UPDATE conversations SET updated_at = ?1 WHERE id = ?2")
            .bind(now_ts())
            .bind(&msg.conversation_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(msg)
    }

    async fn get_latest_by_conversation(
        &self,
        conversation_id: &str,
        count: u32,
    ) -> Result<Vec<Message>, sqlx::Error> {
        // Newest `count` rows, then flipped back to chronological order.
        // rowid breaks ties between messages saved within the same second.
        let sql = format!(
            "SELECT {COLUMNS} FROM ( \
                 SELECT {COLUMNS}, rowid AS seq FROM messages \
                 WHERE conversation_id = ?1 \
                 ORDER BY created_at DESC, seq DESC LIMIT ?2 \
             ) ORDER BY created_at ASC, seq ASC"
        );
        let rows: Vec<MessageRow> = sqlx::query_as(&sql)
            .bind(conversation_id)
            .bind(i64::from(count))
            .fetch_all(self.pool())
            .await?;
        Ok(rows.into_iter().map(into_message).collect())
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Message>, sqlx::Error> {
        let row: Option<MessageRow> =
            sqlx::query_as(&format!("SELECT {COLUMNS} FROM messages WHERE id = ?1"))
                .bind(id)
                .fetch_optional(self.pool())
                .await?;
        Ok(row.map(into_message))
    }

    async fn update(&self, id: &str, role: Role, content: &str) -> Result<Option<Message>, sqlx::Error> {
        let done = sqlx::query("UPDATE messages SET role = ?1, content = ?2 WHERE id = ?3")
            .bind(role.as_ref())
            .bind(content)
            .bind(id)
            .execute(self.pool())
            .await?;
        if done.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_by_id(id).await
    }

    async fn delete(&self, id: &str) -> Result<bool, sqlx::Error> {
        let done = sqlx::query("DELETE FROM messages WHERE id = ?1")
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(done.rows_affected() > 0)
    }

    async fn list_by_conversation(
        &self,
        conversation_id: &str,
        limit: u32,
        order: SortOrder,
    ) -> Result<Vec<Message>, sqlx::Error> {
        let dir = order.as_sql();
        let sql = format!(
            "SELECT {COLUMNS} FROM messages WHERE conversation_id = ?1 \
             ORDER BY created_at {dir}, rowid {dir} LIMIT ?2"
        );
        let rows: Vec<MessageRow> = sqlx::query_as(&sql)
            .bind(conversation_id)
            .bind(i64::from(limit))
            .fetch_all(self.pool())
            .await?;
        Ok(rows.into_iter().map(into_message).collect())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::entities::memory_store;

    fn at(conversation: &str, role: Role, content: &str, ts: i64) -> Message {
        Message {
            created_at: ts,
            ..Message::new(conversation, role, content)
        }
    }

    #[tokio::test]
    async fn save_creates_conversation_and_round_trips() {
        let store = memory_store().await;
        let saved = store.save(Message::new("c1", Role::User, "hi")).await.unwrap();
        let fetched = store.get_by_id(&saved.id).await.unwrap().unwrap();
        assert_eq!(fetched, saved);
    }

    #[tokio::test]
    async fn latest_returns_newest_in_chronological_order() {
        let store = memory_store().await;
        for (i, text) in ["a", "b", "c", "d"].iter().enumerate() {
            store.save(at("c1", Role::User, text, 100 + i as i64)).await.unwrap();
        }
        store.save(at("other", Role::User, "x", 200)).await.unwrap();

        let latest = store.get_latest_by_conversation("c1", 3).await.unwrap();
        let texts: Vec<_> = latest.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(texts, vec!["b", "c", "d"]);
    }

    #[tokio::test]
    async fn same_second_messages_keep_insertion_order() {
        let store = memory_store().await;
        store.save(at("c1", Role::User, "question", 50)).await.unwrap();
        store.save(at("c1", Role::Model, "answer", 50)).await.unwrap();
        let latest = store.get_latest_by_conversation("c1", 10).await.unwrap();
        assert_eq!(latest[0].content, "question");
        assert_eq!(latest[1].role, Role::Model);
    }

    #[tokio::test]
    async fn update_and_delete() {
        let store = memory_store().await;
        let saved = store.save(Message::new("c1", Role::User, "typo")).await.unwrap();

        let updated = store.update(&saved.id, Role::Model, "fixed").await.unwrap().unwrap();
        assert_eq!(updated.content, "fixed");
        assert_eq!(updated.role, Role::Model);
        assert!(store.update("msg-missing", Role::User, "x").await.unwrap().is_none());

        assert!(store.delete(&saved.id).await.unwrap());
        assert!(!store.delete(&saved.id).await.unwrap());
        assert!(store.get_by_id(&saved.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_honours_order_and_limit() {
        let store = memory_store().await;
        for ts in [1, 3, 2] {
            store.save(at("c1", Role::User, &ts.to_string(), ts)).await.unwrap();
        }
        let desc = store.list_by_conversation("c1", 2, SortOrder::Desc).await.unwrap();
        assert_eq!(desc.iter().map(|m| m.created_at).collect::<Vec<_>>(), vec![3, 2]);
        let asc = store.list_by_conversation("c1", 10, SortOrder::Asc).await.unwrap();
        assert_eq!(asc.iter().map(|m| m.created_at).collect::<Vec<_>>(), vec![1, 2, 3]);
    }
}
