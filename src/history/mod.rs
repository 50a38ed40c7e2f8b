//! Chat message log.
//!
//! Every message that reaches the service is appended here, keyed by a
//! content-derived record id. The RAG flows read a chat's history back from
//! the log and make sure each message has a matching embedding record.

pub mod sqlite;

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use sha2::{Digest, Sha256};

use crate::core::errors::StoreError;

pub use sqlite::SqliteMessageLog;

/// Identifier of a chat. Accepted as a JSON string or integer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ChatId(String);

impl ChatId {
    /// Returns `None` for blank identifiers.
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(ChatId(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ChatId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Signed(i64),
            Unsigned(u64),
        }

        let text = match Raw::deserialize(deserializer)? {
            Raw::Text(text) => text,
            Raw::Signed(value) => value.to_string(),
            Raw::Unsigned(value) => value.to_string(),
        };
        ChatId::new(text).ok_or_else(|| D::Error::custom("chat_id cannot be empty"))
    }
}

/// A stored chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub chat_id: ChatId,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// Stable identity of a message and of its embedding record.
///
/// Derived from the chat and the text only, so re-delivering a message maps
/// onto the same record and ids never depend on message order.
pub fn record_id(chat_id: &ChatId, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(chat_id.as_str().as_bytes());
    hasher.update([0x1f]);
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

#[async_trait]
pub trait MessageLog: Send + Sync {
    /// Appends a message. Appending a message whose record id already exists
    /// returns the stored message unchanged.
    async fn append(&self, chat_id: &ChatId, text: &str) -> Result<Message, StoreError>;

    /// All messages of a chat, oldest first.
    async fn list(&self, chat_id: &ChatId) -> Result<Vec<Message>, StoreError>;

    async fn count(&self, chat_id: &ChatId) -> Result<usize, StoreError>;
}
