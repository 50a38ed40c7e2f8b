use serde::{Deserialize, Serialize};

pub const DEFAULT_PORT: u16 = 10000;
pub const DEFAULT_EMBEDDING_MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";
/// Output size of [`DEFAULT_EMBEDDING_MODEL`]. The Supabase `messages.embedding`
/// column (`sql/supabase.sql`) is declared with this size; changing the
/// embedding model means changing both.
pub const DEFAULT_EMBEDDING_DIMENSION: usize = 384;
pub const DEFAULT_HF_BASE_URL: &str = "https://router.huggingface.co";

/// Where messages and embeddings live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Embedded SQLite files under the data directory.
    Local,
    /// Hosted Postgres with pgvector, reached through PostgREST.
    Supabase,
}

impl StorageBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageBackend::Local => "local",
            StorageBackend::Supabase => "supabase",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub backend: StorageBackend,
    pub huggingface: HuggingFaceSettings,
    pub supabase: SupabaseSettings,
    pub retrieval: RetrievalSettings,
    pub generation: GenerationSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings::default(),
            backend: StorageBackend::Supabase,
            huggingface: HuggingFaceSettings::default(),
            supabase: SupabaseSettings::default(),
            retrieval: RetrievalSettings::default(),
            generation: GenerationSettings::default(),
        }
    }
}

impl Settings {
    /// Minimum similarity applied to vector queries for the active backend.
    pub fn match_threshold(&self) -> Option<f32> {
        match self.backend {
            StorageBackend::Local => self.retrieval.local_match_threshold,
            StorageBackend::Supabase => Some(self.retrieval.supabase_match_threshold),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            cors_allowed_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HuggingFaceSettings {
    pub api_token: Option<String>,
    /// Chat-completion model id. No default: the deployment must choose one.
    pub chat_model: Option<String>,
    pub embedding_model: String,
    pub base_url: String,
    pub http_timeout_secs: u64,
}

impl Default for HuggingFaceSettings {
    fn default() -> Self {
        Self {
            api_token: None,
            chat_model: None,
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            base_url: DEFAULT_HF_BASE_URL.to_string(),
            http_timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SupabaseSettings {
    pub url: Option<String>,
    pub key: Option<String>,
    /// Must match the `vector(N)` column of the `messages` table.
    pub embedding_dimension: usize,
}

impl Default for SupabaseSettings {
    fn default() -> Self {
        Self {
            url: None,
            key: None,
            embedding_dimension: DEFAULT_EMBEDDING_DIMENSION,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub top_k: usize,
    pub supabase_match_threshold: f32,
    pub local_match_threshold: Option<f32>,
    pub embed_batch_size: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            top_k: 5,
            supabase_match_threshold: 0.5,
            local_match_threshold: None,
            embed_batch_size: 32,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            max_tokens: 300,
            temperature: 0.3,
        }
    }
}
