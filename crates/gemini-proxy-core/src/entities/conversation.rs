use std::future::Future;

use crate::domain::{now_ts, Conversation, SortOrder};
use crate::entities::SqlStore;

type ConversationRow = (String, String, i64, Option<i64>);

pub trait ConversationStore: Send + Sync + 'static {
    fn create(
        &self,
        conversation: Conversation,
    ) -> impl Future<Output = Result<Conversation, sqlx::Error>> + Send;

    /// Conversation metadata only; `messages` is left empty.
    fn get(&self, id: &str) -> impl Future<Output = Result<Option<Conversation>, sqlx::Error>> + Send;

    fn list(
        &self,
        limit: u32,
        order: SortOrder,
    ) -> impl Future<Output = Result<Vec<Conversation>, sqlx::Error>> + Send;

    fn rename(
        &self,
        id: &str,
        name: &str,
    ) -> impl Future<Output = Result<Option<Conversation>, sqlx::Error>> + Send;

    /// Bump `updated_at` to now.
    fn touch(&self, id: &str) -> impl Future<Output = Result<(), sqlx::Error>> + Send;

    /// Remove the conversation and its messages. `true` if it existed.
    fn delete(&self, id: &str) -> impl Future<Output = Result<bool, sqlx::Error>> + Send;
}

fn into_conversation((id, name, created_at, updated_at): ConversationRow) -> Conversation {
    Conversation {
        id,
        name,
        created_at,
        updated_at,
        messages: Vec::new(),
    }
}

impl ConversationStore for SqlStore {
    async fn create(&self, conversation: Conversation) -> Result<Conversation, sqlx::Error> {
        sqlx::query(
            "INSERT INTO conversations (id, name, created_at, updated_at) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(&conversation.id)
        .bind(&conversation.name)
        .bind(conversation.created_at)
        .bind(conversation.updated_at)
        .execute(self.pool())
        .await?;
        Ok(conversation)
    }

    async fn get(&self, id: &str) -> Result<Option<Conversation>, sqlx::Error> {
        let row: Option<ConversationRow> = sqlx::query_as(
            "SELECT id, name, created_at, updated_at FROM conversations WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await?;
        Ok(row.map(into_conversation))
    }

    async fn list(&self, limit: u32, order: SortOrder) -> Result<Vec<Conversation>, sqlx::Error> {
        let dir = order.as_sql();
        let sql = format!(
            "SELECT id, name, created_at, updated_at FROM conversations \
             ORDER BY created_at {dir}, rowid {dir} LIMIT ?1"
        );
        let rows: Vec<ConversationRow> = sqlx::query_as(&sql)
            .bind(i64::from(limit))
            .fetch_all(self.pool())
            .await?;
        Ok(rows.into_iter().map(into_conversation).collect())
    }

    async fn rename(&self, id: &str, name: &str) -> Result<Option<Conversation>, sqlx::Error> {
        let done = sqlx::query("UPDATE conversations SET name = ?1, updated_at = ?2 WHERE id = ?3")
            .bind(name)
            .bind(now_ts())
            .bind(id)
            .execute(self.pool())
            .await?;
        if done.rows_affected() == 0 {
            return Ok(None);
        }
        self.get(id).await
    }

    async fn touch(&self, id: &str) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE conversations SET updated_at = ?1 WHERE id = ?2")
            .bind(now_ts())
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool, sqlx::Error> {
        let mut tx = self.pool().begin().await?;
        sqlx::query("DELETE FROM messages WHERE conversation_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let done = sqlx::query("DELETE FROM conversations WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(done.rows_affected() > 0)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::domain::{Message, Role};
    use crate::entities::{memory_store, MessageStore};

    #[tokio::test]
    async fn create_get_rename() {
        let store = memory_store().await;
        let created = store.create(Conversation::new(None)).await.unwrap();
        assert_eq!(created.name, "New Conversation");

        let fetched = store.get(&created.id).await.unwrap().unwrap();
        assert_eq!(fetched.id, created.id);
        assert!(fetched.updated_at.is_none());

        let renamed = store.rename(&created.id, "Trip plans").await.unwrap().unwrap();
        assert_eq!(renamed.name, "Trip plans");
        assert!(renamed.updated_at.is_some());
        assert!(store.rename("missing", "x").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_orders_by_creation() {
        let store = memory_store().await;
        for (i, name) in ["first", "second", "third"].iter().enumerate() {
            let mut c = Conversation::new(Some(name.to_string()));
            c.created_at = 10 + i as i64;
            store.create(c).await.unwrap();
        }
        let desc = store.list(2, SortOrder::Desc).await.unwrap();
        assert_eq!(
            desc.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
            vec!["third", "second"]
        );
        let asc = store.list(10, SortOrder::Asc).await.unwrap();
        assert_eq!(asc[0].name, "first");
    }

    #[tokio::test]
    async fn delete_removes_messages() {
        let store = memory_store().await;
        let c = store.create(Conversation::new(None)).await.unwrap();
        let m = store.save(Message::new(&c.id, Role::User, "hello")).await.unwrap();

        assert!(ConversationStore::delete(&store, &c.id).await.unwrap());
        assert!(store.get(&c.id).await.unwrap().is_none());
        assert!(store.get_by_id(&m.id).await.unwrap().is_none());
        assert!(!ConversationStore::delete(&store, &c.id).await.unwrap());
    }

    #[tokio::test]
    async fn saving_a_message_touches_its_conversation() {
        let store = memory_store().await;
        let c = store.create(Conversation::new(None)).await.unwrap();
        store.save(Message::new(&c.id, Role::User, "hello")).await.unwrap();
        assert!(store.get(&c.id).await.unwrap().unwrap().updated_at.is_some());
    }
}
