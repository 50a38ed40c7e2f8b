//! Hugging Face Inference feature-extraction client.
//!
//! Sentence-transformer models answer with one pooled vector per input.
//! Plain encoder models answer with one vector per token; those are
//! mean-pooled here.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use super::provider::EmbeddingProvider;
use crate::core::errors::EmbeddingError;

#[derive(Clone)]
pub struct HfEmbeddingProvider {
    endpoint: String,
    model: String,
    api_token: Option<String>,
    client: Client,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FeatureExtraction {
    Pooled(Vec<Vec<f32>>),
    TokenLevel(Vec<Vec<Vec<f32>>>),
}

impl HfEmbeddingProvider {
    pub fn new(
        base_url: &str,
        model: impl Into<String>,
        api_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, EmbeddingError> {
        let model = model.into();
        Ok(Self {
            endpoint: format!(
                "{}/hf-inference/models/{}/pipeline/feature-extraction",
                base_url.trim_end_matches('/'),
                model
            ),
            model,
            api_token: api_token.filter(|token| !token.trim().is_empty()),
            client: Client::builder().timeout(timeout).build()?,
        })
    }
}

fn mean_pool(tokens: Vec<Vec<f32>>) -> Result<Vec<f32>, EmbeddingError> {
    let Some(dim) = tokens.first().map(Vec::len) else {
        return Err(EmbeddingError::Empty);
    };
    if let Some(bad) = tokens.iter().find(|token| token.len() != dim) {
        return Err(EmbeddingError::DimensionMismatch {
            expected: dim,
            actual: bad.len(),
        });
    }

    let mut pooled = vec![0.0f32; dim];
    for token in &tokens {
        for (acc, value) in pooled.iter_mut().zip(token) {
            *acc += value;
        }
    }
    let n = tokens.len() as f32;
    pooled.iter_mut().for_each(|value| *value /= n);
    Ok(pooled)
}

fn check_shape(vectors: &[Vec<f32>], expected: usize) -> Result<(), EmbeddingError> {
    if vectors.len() != expected {
        return Err(EmbeddingError::CountMismatch {
            expected,
            actual: vectors.len(),
        });
    }

    let dim = vectors.first().map(Vec::len).unwrap_or_default();
    if dim == 0 {
        return Err(EmbeddingError::Empty);
    }
    if let Some(bad) = vectors.iter().find(|v| v.len() != dim) {
        return Err(EmbeddingError::DimensionMismatch {
            expected: dim,
            actual: bad.len(),
        });
    }
    Ok(())
}

#[async_trait]
impl EmbeddingProvider for HfEmbeddingProvider {
    fn model(&self) -> &str {
        &self.model
    }

    async fn embed_batch(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder = self
            .client
            .post(&self.endpoint)
            .json(&json!({ "inputs": inputs }));
        if let Some(token) = &self.api_token {
            builder = builder.bearer_auth(token);
        }

        let res = builder.send().await?;
        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            return Err(EmbeddingError::Status { status, body });
        }

        let vectors = match res.json::<FeatureExtraction>().await? {
            FeatureExtraction::Pooled(vectors) => vectors,
            FeatureExtraction::TokenLevel(per_input) => per_input
                .into_iter()
                .map(mean_pool)
                .collect::<Result<Vec<_>, _>>()?,
        };

        check_shape(&vectors, inputs.len())?;
        Ok(vectors)
    }
}
