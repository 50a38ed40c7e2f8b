//! Retrieval-augmented answering over chat history.
//!
//! - `IngestionFlow`: stores and embeds incoming messages
//! - `QuestionAnswering`: retrieves a chat's relevant history and asks the model
//! - `VectorStore`: embedding storage, local (`SqliteVectorStore`) or hosted (`SupabaseStore`)

mod context_builder;
mod ingestion;
mod qa;
pub mod sqlite;
pub mod store;
pub mod supabase;

pub use context_builder::{build_context, build_request, SYSTEM_PROMPT};
pub use ingestion::IngestionFlow;
pub use qa::{Answer, QaOptions, QuestionAnswering, DEGRADED_ANSWER, NO_HISTORY_ANSWER};
pub use sqlite::SqliteVectorStore;
pub use store::{EmbeddingRecord, ScoredRecord, VectorStore};
pub use supabase::SupabaseStore;
