use thiserror::Error;

#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Failed to initialize message log: {0}")]
    MessageLog(#[source] anyhow::Error),

    #[error("Failed to initialize vector store: {0}")]
    VectorStore(#[source] anyhow::Error),

    #[error("Failed to initialize embedding provider: {0}")]
    Embedding(#[source] anyhow::Error),

    #[error("Failed to initialize generation provider: {0}")]
    Generation(#[source] anyhow::Error),
}
