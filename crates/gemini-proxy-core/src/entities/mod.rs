//! Persistence layer.
//!
//! [`MessageStore`] and [`ConversationStore`] are the interfaces the services
//! are written against; [`SqlStore`] implements both over SQLite. To use another
//! database, implement the traits for a new type and change the concrete type
//! in the server's `AppState`.
//!
//! Queries use the runtime-checked `sqlx::query` form so no `DATABASE_URL` is
//! needed at compile time. Migrations are embedded from `./migrations`.

pub mod conversation;
pub mod message;

pub use conversation::ConversationStore;
pub use message::MessageStore;

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

#[derive(Clone, Debug)]
pub struct SqlStore {
    pool: SqlitePool,
}

impl SqlStore {
    /// Open (or create) the SQLite database at `url` and run pending migrations.
    ///
    /// `url` is a sqlx SQLite URL, e.g. `"sqlite://gemini-proxy.db?mode=rwc"` or
    /// `"sqlite::memory:"` for tests. An in-memory database is pinned to a
    /// single connection so every query sees the same data.
    pub async fn connect(url: &str) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let in_memory = url.contains(":memory:") || url.contains("mode=memory");
        let pool = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(8)
        }
        .connect_with(options)
        .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::debug!(url, "database ready");
        Ok(Self { pool })
    }

    /// Cheap round trip used by the readiness probe.
    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[cfg(test)]
pub(crate) async fn memory_store() -> SqlStore {
    SqlStore::connect("sqlite::memory:")
        .await
        .expect("in-memory database")
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn connects_and_pings() {
        let store = memory_store().await;
        store.ping().await.unwrap();
    }
}
