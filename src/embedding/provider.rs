use async_trait::async_trait;

use crate::core::errors::EmbeddingError;

#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// embedding model identifier
    fn model(&self) -> &str;

    /// one vector per input, in input order, all of the same dimension
    async fn embed_batch(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    async fn embed(&self, input: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.embed_batch(&[input.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or(EmbeddingError::Empty)
    }
}
