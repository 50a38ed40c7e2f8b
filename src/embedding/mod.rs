//! Text embeddings.

pub mod huggingface;
pub mod provider;

pub use huggingface::HfEmbeddingProvider;
pub use provider::EmbeddingProvider;
