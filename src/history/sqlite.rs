use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};

use super::{record_id, ChatId, Message, MessageLog};
use crate::core::config::AppPaths;
use crate::core::errors::StoreError;

/// Message log in a local SQLite file.
#[derive(Clone)]
pub struct SqliteMessageLog {
    pool: SqlitePool,
}

impl SqliteMessageLog {
    pub async fn new(paths: &AppPaths) -> Result<Self, StoreError> {
        Self::with_path(paths.history_db_path.clone()).await
    }

    pub async fn with_path(db_path: PathBuf) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(5)
            .connect_with(options)
            .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS messages (
                id TEXT PRIMARY KEY,
                chat_id TEXT NOT NULL,
                text TEXT NOT NULL,
                created_at TEXT NOT NULL
            )",
        )
        .execute(&pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_messages_chat_created ON messages(chat_id, created_at)",
        )
        .execute(&pool)
        .await?;

        Ok(Self { pool })
    }

    async fn get(&self, id: &str) -> Result<Option<Message>, StoreError> {
        let row = sqlx::query("SELECT id, chat_id, text, created_at FROM messages WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_message).transpose()
    }
}

fn format_timestamp(at: DateTime<Utc>) -> String {
    // Fixed precision keeps lexicographic order equal to time order.
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn row_to_message(row: &sqlx::sqlite::SqliteRow) -> Result<Message, StoreError> {
    let chat_id: String = row.try_get("chat_id")?;
    let created_at: String = row.try_get("created_at")?;

    let chat_id = ChatId::new(chat_id)
        .ok_or_else(|| StoreError::Decode("message row with empty chat_id".to_string()))?;
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map_err(|e| StoreError::Decode(format!("bad created_at '{}': {}", created_at, e)))?
        .with_timezone(&Utc);

    Ok(Message {
        id: row.try_get("id")?,
        chat_id,
        text: row.try_get("text")?,
        created_at,
    })
}

#[async_trait]
impl MessageLog for SqliteMessageLog {
    async fn append(&self, chat_id: &ChatId, text: &str) -> Result<Message, StoreError> {
        let id = record_id(chat_id, text);

        sqlx::query(
            "INSERT OR IGNORE INTO messages (id, chat_id, text, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(chat_id.as_str())
        .bind(text)
        .bind(format_timestamp(Utc::now()))
        .execute(&self.pool)
        .await?;

        self.get(&id)
            .await?
            .ok_or_else(|| StoreError::Decode(format!("message {} vanished after insert", id)))
    }

    async fn list(&self, chat_id: &ChatId) -> Result<Vec<Message>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, chat_id, text, created_at
             FROM messages
             WHERE chat_id = ?
             ORDER BY created_at ASC, rowid ASC",
        )
        .bind(chat_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_message).collect()
    }

    async fn count(&self, chat_id: &ChatId) -> Result<usize, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM messages WHERE chat_id = ?")
            .bind(chat_id.as_str())
            .fetch_one(&self.pool)
            .await?;

        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_log(dir: &tempfile::TempDir) -> SqliteMessageLog {
        SqliteMessageLog::with_path(dir.path().join("history.db"))
            .await
            .unwrap()
    }

    fn chat(id: &str) -> ChatId {
        ChatId::new(id).unwrap()
    }

    #[tokio::test]
    async fn append_and_list_in_creation_order() {
        let dir = tempfile::tempdir().unwrap();
        let log = test_log(&dir).await;

        log.append(&chat("1"), "first").await.unwrap();
        log.append(&chat("1"), "second").await.unwrap();
        log.append(&chat("1"), "third").await.unwrap();

        let texts: Vec<String> = log
            .list(&chat("1"))
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.text)
            .collect();
        assert_eq!(texts, vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn append_is_idempotent_by_content() {
        let dir = tempfile::tempdir().unwrap();
        let log = test_log(&dir).await;

        let first = log.append(&chat("1"), "hello").await.unwrap();
        let again = log.append(&chat("1"), "hello").await.unwrap();

        assert_eq!(first, again);
        assert_eq!(log.count(&chat("1")).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn list_is_scoped_to_chat() {
        let dir = tempfile::tempdir().unwrap();
        let log = test_log(&dir).await;

        log.append(&chat("a"), "for a").await.unwrap();
        log.append(&chat("b"), "for b").await.unwrap();

        let listed = log.list(&chat("a")).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].text, "for a");
        assert_eq!(listed[0].chat_id, chat("a"));
        assert!(log.list(&chat("c")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn reopening_keeps_messages() {
        let dir = tempfile::tempdir().unwrap();
        {
            let log = test_log(&dir).await;
            log.append(&chat("1"), "persisted").await.unwrap();
        }

        let reopened = test_log(&dir).await;
        assert_eq!(reopened.count(&chat("1")).await.unwrap(), 1);
    }
}
