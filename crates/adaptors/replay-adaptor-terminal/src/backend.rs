//! Transport from the client to the search endpoint

use async_trait::async_trait;
use replay_core::{ReplayError, Result, SearchRequest, SearchResponse};
use std::time::Duration;
use tracing::debug;

/// Anything that can answer a search request
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Submit a search; non-success statuses surface as `Upstream` errors
    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse>;
}

/// `POST`s requests to a running search endpoint
pub struct HttpSearchBackend {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpSearchBackend {
    /// Create a backend for `endpoint`, e.g. `http://127.0.0.1:3000/api/search`
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    /// Endpoint URL
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl SearchBackend for HttpSearchBackend {
    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse> {
        debug!("POST {}", self.endpoint);
        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ReplayError::upstream_status(
                status.as_u16(),
                format!(
                    "Error: {} {}",
                    status.as_u16(),
                    status.canonical_reason().unwrap_or("")
                )
                .trim_end()
                .to_string(),
            ));
        }

        Ok(response.json::<SearchResponse>().await?)
    }
}
