//! Replay Core
//!
//! Shared types and the query pipeline for searching World Cup possession
//! segments by meaning:
//!
//! - [`types`]: segments, credentials and the search wire format
//! - [`pipeline`]: the embed-then-search pipeline and its stage traits
//! - [`resilience`]: retry policy for external calls
//! - [`config`]: environment loading and pipeline tunables
//!
//! # Example
//!
//! ```no_run
//! use replay_core::*;
//! use std::sync::Arc;
//!
//! async fn first_timestamp(
//!     embedder: Arc<dyn QueryEmbedder>,
//!     search: Arc<dyn SimilaritySearch>,
//! ) -> Result<Option<f64>> {
//!     let pipeline = SearchPipeline::new(embedder, search, SearchConfig::default());
//!     let query = pipeline.validate(SearchRequest {
//!         query: Some("kick off".into()),
//!         api_key: Some(std::env::var("OPENAI_API_KEY").unwrap_or_default()),
//!         matches: Some(3),
//!     })?;
//!     let segments = pipeline.run(&query).await?;
//!     Ok(segments.first().map(|s| s.timestamp_start_of_possession_seconds))
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod pipeline;
pub mod resilience;
pub mod types;
pub mod utils;

pub use config::{
    get_env_int, load_env, SearchConfig,
    DEFAULT_EMBEDDING_DIMENSION, DEFAULT_MATCH_COUNT, DEFAULT_MAX_MATCH_COUNT,
    DEFAULT_SIMILARITY_THRESHOLD,
};
pub use error::{ReplayError, Result};
pub use pipeline::{rank_segments, QueryEmbedder, RetryingEmbedder, SearchPipeline, SimilaritySearch};
pub use resilience::{retry, RetryPolicy};
pub use types::{
    normalize_query, Credential, Embedding, Query, SearchRequest, SearchResponse, Segment,
};
