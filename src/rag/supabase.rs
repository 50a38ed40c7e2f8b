//! Supabase (PostgREST) backend.
//!
//! A single `messages` table holds both the message log and the embeddings:
//! a row is appended without embedding and gains one once it is embedded.
//! Similarity search runs server-side through the `match_messages` RPC.
//! The expected schema lives in `sql/supabase.sql`.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::store::{EmbeddingRecord, ScoredRecord, VectorStore};
use crate::core::errors::StoreError;
use crate::history::{record_id, ChatId, Message, MessageLog};

const MESSAGES_TABLE: &str = "messages";
const MATCH_FUNCTION: &str = "match_messages";
const ID_FILTER_CHUNK: usize = 100;
const LIST_PAGE_SIZE: usize = 1000;

#[derive(Clone)]
pub struct SupabaseStore {
    client: Client,
    rest_url: String,
    key: String,
    dimension: usize,
}

#[derive(Debug, Deserialize)]
struct MessageRow {
    id: String,
    chat_id: ChatId,
    text: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct IdRow {
    id: String,
}

#[derive(Debug, Deserialize)]
struct MatchRow {
    id: String,
    #[serde(default)]
    chat_id: Option<ChatId>,
    text: String,
    similarity: f32,
}

#[derive(Serialize)]
struct NewMessageRow<'a> {
    id: &'a str,
    chat_id: &'a str,
    text: &'a str,
}

#[derive(Serialize)]
struct EmbeddedRow<'a> {
    id: &'a str,
    chat_id: &'a str,
    text: &'a str,
    embedding: &'a [f32],
}

impl From<MessageRow> for Message {
    fn from(row: MessageRow) -> Self {
        Message {
            id: row.id,
            chat_id: row.chat_id,
            text: row.text,
            created_at: row.created_at,
        }
    }
}

impl SupabaseStore {
    /// `dimension` is the size of the `messages.embedding` vector column.
    pub fn new(
        url: &str,
        key: &str,
        dimension: usize,
        timeout: Duration,
    ) -> Result<Self, StoreError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            rest_url: format!("{}/rest/v1", url.trim_end_matches('/')),
            key: key.to_string(),
            dimension,
        })
    }

    fn check_dimension(&self, vector: &[f32]) -> Result<(), StoreError> {
        if vector.len() != self.dimension {
            return Err(StoreError::Dimension {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        Ok(())
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}/{}", self.rest_url, path))
            .header("apikey", &self.key)
            .bearer_auth(&self.key)
    }

    async fn send(builder: RequestBuilder) -> Result<Response, StoreError> {
        let response = builder.send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Status { status, body });
        }
        Ok(response)
    }

    async fn fetch_message(&self, id: &str) -> Result<Option<Message>, StoreError> {
        let id_filter = format!("eq.{}", id);
        let rows: Vec<MessageRow> = Self::send(
            self.request(Method::GET, MESSAGES_TABLE).query(&[
                ("select", "id,chat_id,text,created_at"),
                ("id", id_filter.as_str()),
                ("limit", "1"),
            ]),
        )
        .await?
        .json()
        .await?;

        Ok(rows.into_iter().next().map(Message::from))
    }

    async fn count_rows(&self, filters: &[(&str, String)]) -> Result<usize, StoreError> {
        let mut query: Vec<(&str, String)> =
            vec![("select", "id".to_string()), ("limit", "1".to_string())];
        query.extend(filters.iter().cloned());

        let response = Self::send(
            self.request(Method::GET, MESSAGES_TABLE)
                .header("Prefer", "count=exact")
                .query(&query),
        )
        .await?;

        let range = response
            .headers()
            .get("content-range")
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| StoreError::Decode("missing Content-Range header".to_string()))?;
        parse_content_range_total(range)
    }
}

/// Total from a PostgREST `Content-Range` header such as `0-0/42` or `*/0`.
fn parse_content_range_total(range: &str) -> Result<usize, StoreError> {
    range
        .rsplit_once('/')
        .and_then(|(_, total)| total.trim().parse::<usize>().ok())
        .ok_or_else(|| StoreError::Decode(format!("unexpected Content-Range '{}'", range)))
}

#[async_trait]
impl MessageLog for SupabaseStore {
    async fn append(&self, chat_id: &ChatId, text: &str) -> Result<Message, StoreError> {
        let id = record_id(chat_id, text);
        let row = NewMessageRow {
            id: &id,
            chat_id: chat_id.as_str(),
            text,
        };

        Self::send(
            self.request(Method::POST, MESSAGES_TABLE)
                .query(&[("on_conflict", "id")])
                .header("Prefer", "resolution=ignore-duplicates,return=minimal")
                .json(&[row]),
        )
        .await?;

        self.fetch_message(&id)
            .await?
            .ok_or_else(|| StoreError::Decode(format!("message {} missing after insert", id)))
    }

    async fn list(&self, chat_id: &ChatId) -> Result<Vec<Message>, StoreError> {
        let chat_filter = format!("eq.{}", chat_id);
        let limit = LIST_PAGE_SIZE.to_string();
        let mut messages = Vec::new();

        // Responses are capped at the server's `max-rows`; page until the
        // reported total is reached.
        loop {
            let offset = messages.len().to_string();
            let response = Self::send(
                self.request(Method::GET, MESSAGES_TABLE)
                    .header("Prefer", "count=exact")
                    .query(&[
                        ("select", "id,chat_id,text,created_at"),
                        ("chat_id", chat_filter.as_str()),
                        ("order", "created_at.asc,id.asc"),
                        ("limit", limit.as_str()),
                        ("offset", offset.as_str()),
                    ]),
            )
            .await?;

            let total = response
                .headers()
                .get("content-range")
                .and_then(|value| value.to_str().ok())
                .map(parse_content_range_total)
                .transpose()?;
            let rows: Vec<MessageRow> = response.json().await?;
            let fetched = rows.len();
            messages.extend(rows.into_iter().map(Message::from));

            let done = match total {
                Some(total) => messages.len() >= total,
                None => fetched < LIST_PAGE_SIZE,
            };
            if done || fetched == 0 {
                break;
            }
        }

        Ok(messages)
    }

    async fn count(&self, chat_id: &ChatId) -> Result<usize, StoreError> {
        self.count_rows(&[("chat_id", format!("eq.{}", chat_id))])
            .await
    }
}

#[async_trait]
impl VectorStore for SupabaseStore {
    async fn existing_ids(
        &self,
        chat_id: &ChatId,
        ids: &[String],
    ) -> Result<HashSet<String>, StoreError> {
        let mut existing = HashSet::new();

        for chunk in ids.chunks(ID_FILTER_CHUNK) {
            let rows: Vec<IdRow> = Self::send(
                self.request(Method::GET, MESSAGES_TABLE).query(&[
                    ("select", "id".to_string()),
                    ("chat_id", format!("eq.{}", chat_id)),
                    ("embedding", "not.is.null".to_string()),
                    ("id", format!("in.({})", chunk.join(","))),
                ]),
            )
            .await?
            .json()
            .await?;

            existing.extend(rows.into_iter().map(|row| row.id));
        }

        Ok(existing)
    }

    async fn upsert(&self, records: Vec<EmbeddingRecord>) -> Result<(), StoreError> {
        if records.is_empty() {
            return Ok(());
        }
        for record in &records {
            self.check_dimension(&record.vector)?;
        }

        // Rows usually exist already, appended without an embedding. Ids are
        // content hashes, so merging only fills in the embedding.
        let rows: Vec<EmbeddedRow<'_>> = records
            .iter()
            .map(|record| EmbeddedRow {
                id: &record.id,
                chat_id: record.chat_id.as_str(),
                text: &record.document,
                embedding: &record.vector,
            })
            .collect();

        Self::send(
            self.request(Method::POST, MESSAGES_TABLE)
                .query(&[("on_conflict", "id")])
                .header("Prefer", "resolution=merge-duplicates,return=minimal")
                .json(&rows),
        )
        .await?;

        Ok(())
    }

    async fn query(
        &self,
        chat_id: &ChatId,
        embedding: &[f32],
        limit: usize,
        min_score: Option<f32>,
    ) -> Result<Vec<ScoredRecord>, StoreError> {
        self.check_dimension(embedding)?;

        let body = json!({
            "query_embedding": embedding,
            "match_threshold": min_score.unwrap_or(-1.0),
            "match_count": limit.max(1),
            "p_chat_id": chat_id.as_str(),
        });

        let rows: Vec<MatchRow> = Self::send(
            self.request(Method::POST, &format!("rpc/{}", MATCH_FUNCTION))
                .json(&body),
        )
        .await?
        .json()
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| ScoredRecord {
                id: row.id,
                chat_id: row.chat_id.unwrap_or_else(|| chat_id.clone()),
                document: row.text,
                score: row.similarity,
            })
            .collect())
    }

    async fn count(&self, chat_id: Option<&ChatId>) -> Result<usize, StoreError> {
        let mut filters = vec![("embedding", "not.is.null".to_string())];
        if let Some(chat_id) = chat_id {
            filters.push(("chat_id", format!("eq.{}", chat_id)));
        }
        self.count_rows(&filters).await
    }
}
