use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::core::config::{AppPaths, Settings, StorageBackend};
use crate::embedding::{EmbeddingProvider, HfEmbeddingProvider};
use crate::history::{MessageLog, SqliteMessageLog};
use crate::llm::{GenerationProvider, HfChatProvider};
use crate::rag::{
    IngestionFlow, QaOptions, QuestionAnswering, SqliteVectorStore, SupabaseStore, VectorStore,
};
use crate::sentiment::{SentimentScorer, VaderScorer};

pub mod error;
pub mod metrics;

use error::InitializationError;
pub use metrics::{FlowMetrics, MetricsSnapshot};

/// Collaborators the flows are built from.
#[derive(Clone)]
pub struct Services {
    pub messages: Arc<dyn MessageLog>,
    pub vectors: Arc<dyn VectorStore>,
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub generator: Arc<dyn GenerationProvider>,
    pub sentiment: Arc<dyn SentimentScorer>,
}

/// Application state shared across all routes.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub ingestion: IngestionFlow,
    pub qa: QuestionAnswering,
    pub sentiment: Arc<dyn SentimentScorer>,
    pub metrics: Arc<FlowMetrics>,
    pub started_at: Instant,
}

impl AppState {
    /// Wires the flows from already-built collaborators.
    pub fn new(settings: Settings, services: Services) -> Arc<Self> {
        let options = QaOptions::new(
            &settings.retrieval,
            &settings.generation,
            settings.match_threshold(),
        );

        let ingestion = IngestionFlow::new(
            services.messages.clone(),
            services.vectors.clone(),
            services.embedder.clone(),
        );
        let qa = QuestionAnswering::new(
            services.messages,
            services.vectors,
            services.embedder,
            services.generator,
            options,
        );

        Arc::new(AppState {
            settings: Arc::new(settings),
            ingestion,
            qa,
            sentiment: services.sentiment,
            metrics: Arc::new(FlowMetrics::default()),
            started_at: Instant::now(),
        })
    }

    /// Builds the configured backend and provider clients.
    ///
    /// The storage backend is either local SQLite files under the data
    /// directory or a Supabase project holding both messages and embeddings.
    pub async fn initialize(
        settings: Settings,
        paths: &AppPaths,
    ) -> Result<Arc<Self>, InitializationError> {
        let hf = &settings.huggingface;
        let timeout = Duration::from_secs(hf.http_timeout_secs);

        let chat_model = hf
            .chat_model
            .clone()
            .ok_or_else(|| InitializationError::Config("HF_MODEL is not set".to_string()))?;

        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(
            HfEmbeddingProvider::new(
                &hf.base_url,
                hf.embedding_model.clone(),
                hf.api_token.clone(),
                timeout,
            )
            .map_err(|e| InitializationError::Embedding(e.into()))?,
        );

        let generator: Arc<dyn GenerationProvider> = Arc::new(
            HfChatProvider::new(&hf.base_url, chat_model, hf.api_token.clone(), timeout)
                .map_err(|e| InitializationError::Generation(e.into()))?,
        );

        let (messages, vectors): (Arc<dyn MessageLog>, Arc<dyn VectorStore>) =
            match settings.backend {
                StorageBackend::Local => {
                    let messages = SqliteMessageLog::new(paths)
                        .await
                        .map_err(|e| InitializationError::MessageLog(e.into()))?;
                    let vectors = SqliteVectorStore::new(paths)
                        .await
                        .map_err(|e| InitializationError::VectorStore(e.into()))?;
                    let messages: Arc<dyn MessageLog> = Arc::new(messages);
                    let vectors: Arc<dyn VectorStore> = Arc::new(vectors);
                    (messages, vectors)
                }
                StorageBackend::Supabase => {
                    let (Some(url), Some(key)) =
                        (settings.supabase.url.as_deref(), settings.supabase.key.as_deref())
                    else {
                        return Err(InitializationError::Config(
                            "SUPABASE_URL and SUPABASE_KEY are required".to_string(),
                        ));
                    };
                    let store = Arc::new(
                        SupabaseStore::new(
                            url,
                            key,
                            settings.supabase.embedding_dimension,
                            timeout,
                        )
                            .map_err(|e| InitializationError::VectorStore(e.into()))?,
                    );
                    let messages: Arc<dyn MessageLog> = store.clone();
                    let vectors: Arc<dyn VectorStore> = store;
                    (messages, vectors)
                }
            };

        tracing::info!(
            backend = settings.backend.as_str(),
            embedding_model = embedder.model(),
            generator = generator.name(),
            "services initialized"
        );

        Ok(Self::new(
            settings,
            Services {
                messages,
                vectors,
                embedder,
                generator,
                sentiment: Arc::new(VaderScorer),
            },
        ))
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local_settings() -> Settings {
        let mut settings = Settings::default();
        settings.backend = StorageBackend::Local;
        settings.huggingface.chat_model = Some("test/model".to_string());
        settings
    }

    #[tokio::test]
    async fn initialize_local_backend_creates_databases() {
        let dir = tempfile::tempdir().unwrap();
        let paths = AppPaths::from_data_dir(dir.path());

        let state = AppState::initialize(local_settings(), &paths).await.unwrap();

        assert!(paths.history_db_path.exists());
        assert!(paths.rag_db_path.exists());
        assert_eq!(state.settings.backend, StorageBackend::Local);
        assert_eq!(state.qa.options().min_score, None);
    }

    #[tokio::test]
    async fn initialize_requires_chat_model() {
        let dir = tempfile::tempdir().unwrap();
        let paths = AppPaths::from_data_dir(dir.path());
        let mut settings = local_settings();
        settings.huggingface.chat_model = None;

        let err = AppState::initialize(settings, &paths).await.err().unwrap();
        assert!(matches!(err, InitializationError::Config(_)));
    }

    #[tokio::test]
    async fn supabase_backend_uses_remote_threshold() {
        let dir = tempfile::tempdir().unwrap();
        let paths = AppPaths::from_data_dir(dir.path());
        let mut settings = local_settings();
        settings.backend = StorageBackend::Supabase;
        settings.supabase.url = Some("http://127.0.0.1:1".to_string());
        settings.supabase.key = Some("key".to_string());

        let state = AppState::initialize(settings, &paths).await.unwrap();
        assert_eq!(state.qa.options().min_score, Some(0.5));
        assert!(!paths.history_db_path.exists());
    }
}
