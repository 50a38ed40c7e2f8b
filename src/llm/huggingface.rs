//! Hugging Face router chat completions (OpenAI-compatible).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::provider::GenerationProvider;
use super::types::{ChatMessage, ChatRequest};
use crate::core::errors::GenerationError;

#[derive(Clone)]
pub struct HfChatProvider {
    base_url: String,
    model: String,
    api_token: Option<String>,
    client: Client,
}

#[derive(Serialize)]
struct CompletionBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    stream: bool,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl HfChatProvider {
    pub fn new(
        base_url: &str,
        model: impl Into<String>,
        api_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, GenerationError> {
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.into(),
            api_token: api_token.filter(|token| !token.trim().is_empty()),
            client: Client::builder().timeout(timeout).build()?,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl GenerationProvider for HfChatProvider {
    fn name(&self) -> &str {
        "huggingface"
    }

    async fn complete(&self, request: ChatRequest) -> Result<String, GenerationError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = CompletionBody {
            model: &self.model,
            messages: &request.messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            stream: false,
        };

        let mut builder = self.client.post(&url).json(&body);
        if let Some(token) = &self.api_token {
            builder = builder.bearer_auth(token);
        }

        let res = builder.send().await?;
        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            return Err(GenerationError::Status { status, body });
        }

        let payload: CompletionResponse = res.json().await?;
        let choice = payload
            .choices
            .into_iter()
            .next()
            .ok_or(GenerationError::NoChoices)?;

        Ok(choice.message.content.unwrap_or_default())
    }
}
