use async_trait::async_trait;

use super::types::ChatRequest;
use crate::core::errors::GenerationError;

#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// provider name, used in logs and `/status`
    fn name(&self) -> &str;

    /// chat completion (non-streaming); returns the raw assistant content
    async fn complete(&self, request: ChatRequest) -> Result<String, GenerationError>;
}
