//! Durable record of already-delivered article URLs.
//!
//! Backed by a single SQLite table with a uniqueness constraint on the URL.
//! The store answers "seen before?" and records "now seen"; marking a URL
//! twice is a silent no-op, so delivery bookkeeping is idempotent. Rows are
//! never updated or deleted.
//!
//! All access is serialized through one async mutex so two check-then-mark
//! sequences never interleave inside this process. The guard is held for
//! exactly one backing-store round trip and released on every exit path.
//! Cross-process writers are out of scope.

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use crate::error::Result;

/// Persistent set of processed article URLs.
pub struct ProcessedItemStore {
    pool: SqlitePool,
    gate: Mutex<()>,
}

impl ProcessedItemStore {
    /// Open (creating if absent) the store at `path`.
    ///
    /// Initialization is idempotent and completes before any query is
    /// possible on the returned store.
    #[instrument(level = "info", skip_all, fields(path = %path))]
    pub async fn open(path: &str) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS ProcessedItems (
                Id INTEGER PRIMARY KEY AUTOINCREMENT,
                Url TEXT NOT NULL UNIQUE,
                FeedId TEXT
            );
            "#,
        )
        .execute(&pool)
        .await?;

        info!("Processed-item store ready");
        Ok(Self {
            pool,
            gate: Mutex::new(()),
        })
    }

    /// Whether `url` has already been delivered.
    pub async fn is_processed(&self, url: &str) -> Result<bool> {
        let _guard = self.gate.lock().await;
        let row = sqlx::query("SELECT COUNT(*) AS cnt FROM ProcessedItems WHERE Url = ?")
            .bind(url)
            .fetch_one(&self.pool)
            .await?;
        let count: i64 = row.try_get("cnt")?;
        Ok(count > 0)
    }

    /// Record `url` as delivered. Idempotent: marking an already-processed
    /// URL leaves the existing row untouched.
    pub async fn mark_processed(&self, url: &str, feed_id: Option<&str>) -> Result<()> {
        let _guard = self.gate.lock().await;
        sqlx::query("INSERT OR IGNORE INTO ProcessedItems (Url, FeedId) VALUES (?, ?)")
            .bind(url)
            .bind(feed_id)
            .execute(&self.pool)
            .await?;
        debug!(url, ?feed_id, "Marked processed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn memory_store() -> ProcessedItemStore {
        ProcessedItemStore::open(":memory:").await.unwrap()
    }

    async fn row_count(store: &ProcessedItemStore, url: &str) -> i64 {
        let row = sqlx::query("SELECT COUNT(*) AS cnt FROM ProcessedItems WHERE Url = ?")
            .bind(url)
            .fetch_one(&store.pool)
            .await
            .unwrap();
        row.try_get("cnt").unwrap()
    }

    #[tokio::test]
    async fn test_unseen_url_is_not_processed() {
        let store = memory_store().await;
        assert!(!store.is_processed("https://example.com/a").await.unwrap());
    }

    #[tokio::test]
    async fn test_mark_then_check() {
        let store = memory_store().await;
        store
            .mark_processed("https://example.com/a", Some("TechCrunch"))
            .await
            .unwrap();
        assert!(store.is_processed("https://example.com/a").await.unwrap());
        assert!(!store.is_processed("https://example.com/b").await.unwrap());
    }

    #[tokio::test]
    async fn test_mark_is_idempotent() {
        let store = memory_store().await;
        let url = "https://example.com/dup";
        store.mark_processed(url, None).await.unwrap();
        store.mark_processed(url, Some("BmwNews")).await.unwrap();
        assert_eq!(row_count(&store, url).await, 1);
    }

    #[tokio::test]
    async fn test_feed_id_is_optional() {
        let store = memory_store().await;
        store.mark_processed("https://example.com/x", None).await.unwrap();
        assert!(store.is_processed("https://example.com/x").await.unwrap());
    }

    #[tokio::test]
    async fn test_sql_special_characters_are_data() {
        let store = memory_store().await;
        let url = "https://example.com/a'b\";DROP TABLE ProcessedItems;--";
        store.mark_processed(url, Some("it's")).await.unwrap();
        assert!(store.is_processed(url).await.unwrap());
        // The quoted sibling is a different URL entirely.
        assert!(!store.is_processed("https://example.com/a").await.unwrap());
    }

    #[tokio::test]
    async fn test_open_is_idempotent_on_existing_file() {
        let dir = std::env::temp_dir().join("autoposter-store-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("seen.db");
        let path = path.to_str().unwrap();
        let _ = std::fs::remove_file(path);

        {
            let store = ProcessedItemStore::open(path).await.unwrap();
            store.mark_processed("https://example.com/keep", None).await.unwrap();
        }
        let reopened = ProcessedItemStore::open(path).await.unwrap();
        assert!(reopened.is_processed("https://example.com/keep").await.unwrap());

        let _ = std::fs::remove_file(path);
    }
}
