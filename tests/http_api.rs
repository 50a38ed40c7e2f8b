use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::net::TcpListener;

use ragchat_backend::core::config::{Settings, StorageBackend};
use ragchat_backend::core::errors::{EmbeddingError, GenerationError, StoreError};
use ragchat_backend::embedding::EmbeddingProvider;
use ragchat_backend::history::{ChatId, Message, MessageLog, SqliteMessageLog};
use ragchat_backend::llm::{ChatRequest, GenerationProvider};
use ragchat_backend::rag::{
    EmbeddingRecord, ScoredRecord, SqliteVectorStore, VectorStore, DEGRADED_ANSWER,
    NO_HISTORY_ANSWER,
};
use ragchat_backend::sentiment::VaderScorer;
use ragchat_backend::server::router::router;
use ragchat_backend::state::{AppState, Services};

const DIM: usize = 64;

/// Hashed bag-of-words vectors. Calls numbered from `fail_from` on fail.
#[derive(Default)]
struct WordHashEmbedder {
    calls: AtomicUsize,
    fail_from: Option<usize>,
}

#[async_trait]
impl EmbeddingProvider for WordHashEmbedder {
    fn model(&self) -> &str {
        "word-hash"
    }

    async fn embed_batch(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_from.is_some_and(|from| call >= from) {
            return Err(EmbeddingError::Status {
                status: 503,
                body: "embedding model loading".to_string(),
            });
        }
        Ok(inputs
            .iter()
            .map(|text| {
                let mut v = vec![0.0f32; DIM];
                for word in text
                    .to_lowercase()
                    .split(|c: char| !c.is_alphanumeric())
                    .filter(|w| !w.is_empty())
                {
                    let bucket = word
                        .bytes()
                        .fold(7usize, |acc, b| acc.wrapping_mul(31).wrapping_add(b as usize));
                    v[bucket % DIM] += 1.0;
                }
                v
            })
            .collect())
    }
}

/// Echoes the user prompt behind a reasoning block.
#[derive(Default)]
struct EchoGenerator {
    calls: AtomicUsize,
    fail: bool,
}

#[async_trait]
impl GenerationProvider for EchoGenerator {
    fn name(&self) -> &str {
        "echo"
    }

    async fn complete(&self, request: ChatRequest) -> Result<String, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(GenerationError::Status {
                status: 503,
                body: "model overloaded".to_string(),
            });
        }
        let prompt = request
            .messages
            .last()
            .map(|m| m.content.clone())
            .unwrap_or_default();
        Ok(format!("<think>\nlooking at the context\n</think>\n{}", prompt))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum StoreFault {
    #[default]
    None,
    List,
    Query,
}

/// SQLite stores with one operation forced to fail.
struct FaultyStore {
    messages: SqliteMessageLog,
    vectors: SqliteVectorStore,
    fault: StoreFault,
}

fn unavailable() -> StoreError {
    StoreError::Status {
        status: 503,
        body: "store unavailable".to_string(),
    }
}

#[async_trait]
impl MessageLog for FaultyStore {
    async fn append(&self, chat_id: &ChatId, text: &str) -> Result<Message, StoreError> {
        self.messages.append(chat_id, text).await
    }

    async fn list(&self, chat_id: &ChatId) -> Result<Vec<Message>, StoreError> {
        if self.fault == StoreFault::List {
            return Err(unavailable());
        }
        self.messages.list(chat_id).await
    }

    async fn count(&self, chat_id: &ChatId) -> Result<usize, StoreError> {
        MessageLog::count(&self.messages, chat_id).await
    }
}

#[async_trait]
impl VectorStore for FaultyStore {
    async fn existing_ids(
        &self,
        chat_id: &ChatId,
        ids: &[String],
    ) -> Result<HashSet<String>, StoreError> {
        self.vectors.existing_ids(chat_id, ids).await
    }

    async fn upsert(&self, records: Vec<EmbeddingRecord>) -> Result<(), StoreError> {
        self.vectors.upsert(records).await
    }

    async fn query(
        &self,
        chat_id: &ChatId,
        embedding: &[f32],
        limit: usize,
        min_score: Option<f32>,
    ) -> Result<Vec<ScoredRecord>, StoreError> {
        if self.fault == StoreFault::Query {
            return Err(unavailable());
        }
        self.vectors.query(chat_id, embedding, limit, min_score).await
    }

    async fn count(&self, chat_id: Option<&ChatId>) -> Result<usize, StoreError> {
        VectorStore::count(&self.vectors, chat_id).await
    }
}

#[derive(Default)]
struct Setup {
    generator: EchoGenerator,
    embedder: WordHashEmbedder,
    fault: StoreFault,
}

struct TestServer {
    _dir: tempfile::TempDir,
    base_url: String,
    client: reqwest::Client,
    generator: Arc<EchoGenerator>,
}

impl TestServer {
    async fn start() -> Self {
        Self::start_with(Setup::default()).await
    }

    async fn start_with(setup: Setup) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FaultyStore {
            messages: SqliteMessageLog::with_path(dir.path().join("history.db"))
                .await
                .unwrap(),
            vectors: SqliteVectorStore::with_path(dir.path().join("rag.db"))
                .await
                .unwrap(),
            fault: setup.fault,
        });
        let generator = Arc::new(setup.generator);

        let mut settings = Settings::default();
        settings.backend = StorageBackend::Local;
        settings.huggingface.chat_model = Some("test/model".to_string());

        let state = AppState::new(
            settings,
            Services {
                messages: store.clone(),
                vectors: store,
                embedder: Arc::new(setup.embedder),
                generator: generator.clone(),
                sentiment: Arc::new(VaderScorer),
            },
        );

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = router(state);
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        TestServer {
            _dir: dir,
            base_url: format!("http://{}", addr),
            client: reqwest::Client::new(),
            generator,
        }
    }

    async fn status(&self) -> Value {
        reqwest::get(format!("{}/status", self.base_url))
            .await
            .unwrap()
            .json()
            .await
            .unwrap()
    }

    async fn post(&self, path: &str, body: Value) -> (u16, Value) {
        let res = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = res.status().as_u16();
        (status, res.json().await.unwrap())
    }

    async fn ask(&self, chat_id: Value, question: &str) -> String {
        let (status, body) = self
            .post("/ask", json!({"chat_id": chat_id, "question": question}))
            .await;
        assert_eq!(status, 200);
        body["answer"].as_str().unwrap().to_string()
    }
}

#[tokio::test]
async fn root_reports_ok() {
    let server = TestServer::start().await;
    let res = reqwest::get(format!("{}/", server.base_url)).await.unwrap();
    assert_eq!(res.status().as_u16(), 200);
    assert_eq!(res.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn ingested_message_answers_question() {
    let server = TestServer::start().await;

    let (status, body) = server
        .post("/ingest", json!({"chat_id": 1, "text": "The meeting is at 3pm"}))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body, json!({"status": "success"}));

    let answer = server.ask(json!(1), "When is the meeting?").await;
    assert!(answer.contains("3pm"), "{answer}");
    assert!(!answer.contains("<think>"));
    assert!(!answer.contains("</think>"));
}

#[tokio::test]
async fn ingest_without_text_is_rejected() {
    let server = TestServer::start().await;

    let (status, body) = server.post("/ingest", json!({"chat_id": 1})).await;
    assert_eq!(status, 400);
    assert!(body.get("error").is_some());

    let (status, body) = server
        .post("/ingest", json!({"chat_id": 1, "text": "   "}))
        .await;
    assert_eq!(status, 400);
    assert!(body.get("error").is_some());
}

#[tokio::test]
async fn ask_without_question_is_rejected() {
    let server = TestServer::start().await;

    let (status, body) = server.post("/ask", json!({"chat_id": 1})).await;
    assert_eq!(status, 400);
    assert!(body.get("error").is_some());

    let (status, _) = server.post("/ask", json!({"question": "hi?"})).await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn malformed_json_is_rejected() {
    let server = TestServer::start().await;
    let res = server
        .client
        .post(format!("{}/ingest", server.base_url))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 400);
    let body: Value = res.json().await.unwrap();
    assert!(body.get("error").is_some());
}

#[tokio::test]
async fn unknown_chat_gets_no_history_answer() {
    let server = TestServer::start().await;

    let answer = server.ask(json!("empty-chat"), "Anything?").await;

    assert_eq!(answer, NO_HISTORY_ANSWER);
    assert_eq!(server.generator.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn answers_only_use_the_asking_chat() {
    let server = TestServer::start().await;
    server
        .post("/ingest", json!({"chat_id": "a", "text": "The meeting is at 3pm"}))
        .await;
    server
        .post("/ingest", json!({"chat_id": "b", "text": "The meeting is at 9am"}))
        .await;

    let answer = server.ask(json!("b"), "When is the meeting?").await;
    assert!(answer.contains("9am"));
    assert!(!answer.contains("3pm"));
}

#[tokio::test]
async fn recorded_messages_are_embedded_at_question_time() {
    let server = TestServer::start().await;

    let (status, body) = server
        .post("/messages", json!({"chat_id": 5, "text": "Lunch is pizza on Friday"}))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body, json!({"status": "success"}));

    let answer = server.ask(json!(5), "What is lunch on Friday?").await;
    assert!(answer.contains("pizza"));
}

#[tokio::test]
async fn generation_failure_degrades_to_fixed_answer() {
    let server = TestServer::start_with(Setup {
        generator: EchoGenerator {
            fail: true,
            ..Default::default()
        },
        ..Default::default()
    })
    .await;
    server
        .post("/ingest", json!({"chat_id": 1, "text": "The meeting is at 3pm"}))
        .await;

    let answer = server.ask(json!(1), "When is the meeting?").await;
    assert_eq!(answer, DEGRADED_ANSWER);

    let status = server.status().await;
    assert_eq!(status["status"], "ok");
    assert_eq!(status["backend"], "local");
    assert_eq!(status["metrics"]["degraded_answers"], 1);
    assert_eq!(status["metrics"]["ingested"], 1);
}

#[tokio::test]
async fn backfill_embedding_failure_degrades() {
    let server = TestServer::start_with(Setup {
        embedder: WordHashEmbedder {
            fail_from: Some(0),
            ..Default::default()
        },
        ..Default::default()
    })
    .await;
    let (status, _) = server
        .post("/messages", json!({"chat_id": 1, "text": "The meeting is at 3pm"}))
        .await;
    assert_eq!(status, 200);

    let answer = server.ask(json!(1), "When is the meeting?").await;

    assert_eq!(answer, DEGRADED_ANSWER);
    assert_eq!(server.generator.calls.load(Ordering::SeqCst), 0);
    assert_eq!(server.status().await["metrics"]["degraded_answers"], 1);
}

#[tokio::test]
async fn question_embedding_failure_degrades() {
    // The ingest embeds with call 0; the question is call 1.
    let server = TestServer::start_with(Setup {
        embedder: WordHashEmbedder {
            fail_from: Some(1),
            ..Default::default()
        },
        ..Default::default()
    })
    .await;
    let (status, _) = server
        .post("/ingest", json!({"chat_id": 1, "text": "The meeting is at 3pm"}))
        .await;
    assert_eq!(status, 200);

    let answer = server.ask(json!(1), "When is the meeting?").await;

    assert_eq!(answer, DEGRADED_ANSWER);
    assert_eq!(server.generator.calls.load(Ordering::SeqCst), 0);
    assert_eq!(server.status().await["metrics"]["degraded_answers"], 1);
}

#[tokio::test]
async fn history_listing_failure_degrades() {
    let server = TestServer::start_with(Setup {
        fault: StoreFault::List,
        ..Default::default()
    })
    .await;
    server
        .post("/ingest", json!({"chat_id": 1, "text": "The meeting is at 3pm"}))
        .await;

    let answer = server.ask(json!(1), "When is the meeting?").await;

    assert_eq!(answer, DEGRADED_ANSWER);
    let status = server.status().await;
    assert_eq!(status["metrics"]["degraded_answers"], 1);
    assert_eq!(status["metrics"]["no_history_answers"], 0);
}

#[tokio::test]
async fn vector_query_failure_degrades() {
    let server = TestServer::start_with(Setup {
        fault: StoreFault::Query,
        ..Default::default()
    })
    .await;
    server
        .post("/ingest", json!({"chat_id": 1, "text": "The meeting is at 3pm"}))
        .await;

    let answer = server.ask(json!(1), "When is the meeting?").await;

    assert_eq!(answer, DEGRADED_ANSWER);
    assert_eq!(server.generator.calls.load(Ordering::SeqCst), 0);
    assert_eq!(server.status().await["metrics"]["degraded_answers"], 1);
}

#[tokio::test]
async fn sentiment_labels_text() {
    let server = TestServer::start().await;

    let (status, body) = server
        .post("/sentiment", json!({"text": "I love this, it is wonderful!"}))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["sentiment"], "positive");

    let (_, body) = server
        .post("/sentiment", json!({"text": "This is terrible and I hate it."}))
        .await;
    assert_eq!(body["sentiment"], "negative");

    let (_, body) = server.post("/sentiment", json!({"text": ""})).await;
    assert_eq!(body["sentiment"], "neutral");

    let (status, body) = server.post("/sentiment", json!({})).await;
    assert_eq!(status, 400);
    assert!(body.get("error").is_some());
}
