//! Vector search over possession segments using Supabase with pgvector
//!
//! The ranking itself happens inside Postgres; this module only invokes the
//! RPC function through PostgREST and decodes the rows.

use async_trait::async_trait;
use replay_core::utils::redact_secrets;
use replay_core::{ReplayError, Result, Segment, SimilaritySearch};
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

/// RPC function created by [`crate::migrations::create_search_function`]
pub const DEFAULT_SEARCH_FUNCTION: &str = "worldcup_possessions_search";

/// Supabase configuration
#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    /// Supabase project URL (e.g., https://xxx.supabase.co)
    pub url: String,
    /// Service role key
    pub api_key: String,
    /// RPC function used for similarity search
    pub search_function: String,
    /// Expected embedding length
    pub embedding_dimension: usize,
    /// Request timeout for the RPC call
    pub timeout: Duration,
}

impl SupabaseConfig {
    /// Create a configuration with the default search function and dimension
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_key: api_key.into(),
            search_function: DEFAULT_SEARCH_FUNCTION.to_string(),
            embedding_dimension: replay_core::DEFAULT_EMBEDDING_DIMENSION,
            timeout: Duration::from_secs(30),
        }
    }

    /// Use a different embedding dimension
    pub fn with_embedding_dimension(mut self, dimension: usize) -> Self {
        self.embedding_dimension = dimension;
        self
    }

    /// Use a different request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Similarity search against the possessions table through PostgREST RPC
pub struct SupabaseVectorSearch {
    client: Client,
    rpc_url: String,
    embedding_dimension: usize,
}

impl SupabaseVectorSearch {
    /// Create a new Supabase vector search instance
    pub fn new(config: SupabaseConfig) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            "apikey",
            header::HeaderValue::from_str(&config.api_key)
                .map_err(|e| ReplayError::config(format!("Invalid Supabase key: {}", e)))?,
        );
        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&format!("Bearer {}", config.api_key))
                .map_err(|e| ReplayError::config(format!("Invalid Supabase key: {}", e)))?,
        );
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        let client = Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| ReplayError::config(format!("Failed to create HTTP client: {}", e)))?;

        let rpc_url = format!(
            "{}/rest/v1/rpc/{}",
            config.url.trim_end_matches('/'),
            config.search_function
        );
        info!("Supabase vector search via {}", rpc_url);

        Ok(Self {
            client,
            rpc_url,
            embedding_dimension: config.embedding_dimension,
        })
    }

    /// Get the configured embedding dimension
    pub fn embedding_dimension(&self) -> usize {
        self.embedding_dimension
    }

    /// RPC endpoint being called
    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }
}

#[derive(Serialize)]
struct SearchParams<'a> {
    query_embedding: &'a [f32],
    similarity_threshold: f64,
    match_count: i32,
}

#[derive(Deserialize)]
struct PossessionRow {
    timestamp_start_of_possession_seconds: f64,
    #[serde(default)]
    possession_details: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    similarity: Option<f64>,
}

impl From<PossessionRow> for Segment {
    fn from(row: PossessionRow) -> Self {
        Segment {
            timestamp_start_of_possession_seconds: row.timestamp_start_of_possession_seconds,
            possession_details: row.possession_details.unwrap_or_default(),
            description: row.description.unwrap_or_default(),
            similarity: row.similarity,
        }
    }
}

#[async_trait]
impl SimilaritySearch for SupabaseVectorSearch {
    async fn search(
        &self,
        embedding: &[f32],
        threshold: f64,
        match_count: usize,
    ) -> Result<Vec<Segment>> {
        if embedding.len() != self.embedding_dimension {
            return Err(ReplayError::search(format!(
                "Embedding dimension mismatch: got {}, expected {}",
                embedding.len(),
                self.embedding_dimension
            )));
        }

        let params = SearchParams {
            query_embedding: embedding,
            similarity_threshold: threshold,
            match_count: i32::try_from(match_count).unwrap_or(i32::MAX),
        };

        let response = self
            .client
            .post(&self.rpc_url)
            .json(&params)
            .send()
            .await
            .map_err(|e| ReplayError::search(format!("Vector search request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!("Vector search failed ({}): {}", status, redact_secrets(&body));
            return Err(ReplayError::search(format!(
                "Vector search failed ({}): {}",
                status,
                redact_secrets(&body)
            )));
        }

        let rows: Vec<PossessionRow> = response
            .json()
            .await
            .map_err(|e| ReplayError::search(format!("Failed to parse search results: {}", e)))?;

        let segments: Vec<Segment> = rows
            .into_iter()
            .filter(|r| r.timestamp_start_of_possession_seconds >= 0.0)
            .map(Segment::from)
            .collect();

        debug!(
            "Found {} possessions via Supabase vector search",
            segments.len()
        );

        Ok(segments)
    }
}
