//! OpenAI query embedder for Replay
//!
//! Calls the `/embeddings` endpoint with the credential supplied on each
//! search, so the server never holds an OpenAI key of its own.

#![warn(missing_docs)]
#![warn(clippy::all)]

use async_trait::async_trait;
use replay_core::utils::redact_secrets;
use replay_core::{Credential, Embedding, QueryEmbedder, ReplayError, Result};
use reqwest::{header, Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Default OpenAI API base
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Model the possessions table was embedded with
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// OpenAI embedder configuration
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// API base, e.g. `https://api.openai.com/v1`
    pub base_url: String,
    /// Embedding model identifier
    pub model: String,
    /// Request timeout
    pub timeout: Duration,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl OpenAiConfig {
    /// Configuration pointing at a different API base
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Configuration using a different model
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

/// Query embedder backed by the OpenAI embeddings API
pub struct OpenAiEmbedder {
    client: Client,
    endpoint: String,
    model: String,
}

impl OpenAiEmbedder {
    /// Create a new embedder
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        if config.model.trim().is_empty() {
            return Err(ReplayError::config("missing OpenAI embedding model name"));
        }

        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        let client = Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| ReplayError::config(format!("Failed to create HTTP client: {}", e)))?;

        let endpoint = format!("{}/embeddings", config.base_url.trim_end_matches('/'));

        Ok(Self {
            client,
            endpoint,
            model: config.model,
        })
    }

    /// Full URL of the embeddings endpoint
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Model identifier sent with each request
    pub fn model(&self) -> &str {
        &self.model
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[async_trait]
impl QueryEmbedder for OpenAiEmbedder {
    async fn embed(&self, text: &str, credential: &Credential) -> Result<Embedding> {
        let auth = header::HeaderValue::from_str(&format!("Bearer {}", credential.expose()))
            .map_err(|_| ReplayError::auth("API key contains invalid characters"))?;

        let response = self
            .client
            .post(&self.endpoint)
            .header(header::AUTHORIZATION, auth)
            .json(&EmbeddingRequest {
                model: &self.model,
                input: text,
            })
            .send()
            .await
            .map_err(|e| ReplayError::upstream(format!("Embedding request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body = redact_secrets(&body);
            warn!("OpenAI embeddings returned {}: {}", status, body);

            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    ReplayError::auth(format!("Credential rejected ({})", status))
                }
                _ => ReplayError::upstream_status(
                    status.as_u16(),
                    format!("Embedding request failed ({}): {}", status, body),
                ),
            });
        }

        let parsed: EmbeddingResponse = response.json().await.map_err(|e| {
            ReplayError::upstream(format!("Failed to parse embedding response: {}", e))
        })?;

        let embedding = parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .filter(|e| !e.is_empty())
            .ok_or_else(|| ReplayError::upstream("No embedding returned"))?;

        debug!("Received {}-dimension embedding from {}", embedding.len(), self.model);
        Ok(embedding)
    }
}
