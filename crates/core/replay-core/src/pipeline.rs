//! Two-stage query pipeline: text -> embedding -> ranked segments
//!
//! Each stage sits behind a trait so the web layer can run against the real
//! OpenAI and Supabase clients while tests substitute either stage.

use crate::config::SearchConfig;
use crate::resilience::{retry, RetryPolicy};
use crate::types::{normalize_query, Credential, Embedding, Query, SearchRequest, Segment};
use crate::{ReplayError, Result};
use async_trait::async_trait;
use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Converts query text into an embedding vector
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QueryEmbedder: Send + Sync {
    /// Embed already-normalized text using the caller's credential
    async fn embed(&self, text: &str, credential: &Credential) -> Result<Embedding>;
}

/// Nearest-neighbour lookup against the embedding store
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SimilaritySearch: Send + Sync {
    /// Segments above `threshold`, most similar first, at most `match_count`
    async fn search(
        &self,
        embedding: &[f32],
        threshold: f64,
        match_count: usize,
    ) -> Result<Vec<Segment>>;
}

/// Wraps any embedder with a retry policy
pub struct RetryingEmbedder {
    inner: Arc<dyn QueryEmbedder>,
    policy: RetryPolicy,
}

impl RetryingEmbedder {
    /// Create a retrying wrapper
    pub fn new(inner: Arc<dyn QueryEmbedder>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl QueryEmbedder for RetryingEmbedder {
    async fn embed(&self, text: &str, credential: &Credential) -> Result<Embedding> {
        retry(&self.policy, || self.inner.embed(text, credential)).await
    }
}

/// Embed-then-search pipeline behind the search endpoint
#[derive(Clone)]
pub struct SearchPipeline {
    embedder: Arc<dyn QueryEmbedder>,
    search: Arc<dyn SimilaritySearch>,
    config: SearchConfig,
}

impl SearchPipeline {
    /// Create a pipeline from its two stages
    pub fn new(
        embedder: Arc<dyn QueryEmbedder>,
        search: Arc<dyn SimilaritySearch>,
        config: SearchConfig,
    ) -> Self {
        Self {
            embedder,
            search,
            config,
        }
    }

    /// Pipeline configuration
    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Turn a wire request into a query, rejecting missing text or credential
    pub fn validate(&self, request: SearchRequest) -> Result<Query> {
        let text = request
            .query
            .filter(|q| !q.trim().is_empty())
            .ok_or_else(|| ReplayError::validation("Please enter a query."))?;

        let credential = request
            .api_key
            .map(Credential::new)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| ReplayError::validation("Please enter an API key."))?;

        let match_count = self.config.resolve_match_count(request.matches)?;

        Ok(Query {
            text,
            credential,
            match_count,
        })
    }

    /// Stage one: normalize and embed the query text
    pub async fn embed_stage(&self, query: &Query) -> Result<Embedding> {
        let input = normalize_query(&query.text);
        let embedding = self.embedder.embed(&input, &query.credential).await?;

        let expected = self.config.embedding_dimension;
        if expected > 0 && embedding.len() != expected {
            return Err(ReplayError::upstream(format!(
                "Embedding has {} dimensions, expected {}",
                embedding.len(),
                expected
            )));
        }

        Ok(embedding)
    }

    /// Stage two: similarity search, re-ranked and capped
    pub async fn search_stage(
        &self,
        embedding: &[f32],
        match_count: usize,
    ) -> Result<Vec<Segment>> {
        let segments = self
            .search
            .search(embedding, self.config.similarity_threshold, match_count)
            .await?;
        Ok(rank_segments(segments, match_count))
    }

    /// Run both stages in sequence
    pub async fn run(&self, query: &Query) -> Result<Vec<Segment>> {
        let started = Instant::now();

        let embedding = self.embed_stage(query).await?;
        debug!(
            "Embedded query into {} dimensions in {:?}",
            embedding.len(),
            started.elapsed()
        );

        let segments = self.search_stage(&embedding, query.match_count).await?;
        info!(
            "Matched {} possessions (requested {}) in {:?}",
            segments.len(),
            query.match_count,
            started.elapsed()
        );

        Ok(segments)
    }
}

/// Sort by similarity descending and cap at `match_count`
///
/// Rows without a similarity score keep the store's order.
pub fn rank_segments(mut segments: Vec<Segment>, match_count: usize) -> Vec<Segment> {
    if segments.iter().all(|s| s.similarity.is_some()) {
        segments.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(Ordering::Equal)
        });
    }
    segments.truncate(match_count);
    segments
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn segment(ts: f64, similarity: f64) -> Segment {
        Segment {
            timestamp_start_of_possession_seconds: ts,
            possession_details: format!("possession at {}", ts),
            description: "Kick off.".to_string(),
            similarity: Some(similarity),
        }
    }

    fn small_config() -> SearchConfig {
        SearchConfig {
            embedding_dimension: 3,
            ..SearchConfig::default()
        }
    }

    fn request(query: Option<&str>, key: Option<&str>, matches: Option<usize>) -> SearchRequest {
        SearchRequest {
            query: query.map(String::from),
            api_key: key.map(String::from),
            matches,
        }
    }

    #[tokio::test]
    async fn test_pipeline_runs_both_stages_in_order() {
        let mut embedder = MockQueryEmbedder::new();
        embedder
            .expect_embed()
            .withf(|text, cred| text == "kick off" && cred.expose() == "sk-test")
            .times(1)
            .returning(|_, _| Ok(vec![0.1, 0.2, 0.3]));

        let mut search = MockSimilaritySearch::new();
        search
            .expect_search()
            .withf(|emb, threshold, count| {
                emb == &[0.1f32, 0.2, 0.3][..] && *threshold == 0.01 && *count == 3
            })
            .times(1)
            .returning(|_, _, _| Ok(vec![segment(10.0, 0.9), segment(20.0, 0.5)]));

        let pipeline = SearchPipeline::new(Arc::new(embedder), Arc::new(search), small_config());
        let query = pipeline
            .validate(request(Some("kick\noff"), Some("sk-test"), Some(3)))
            .unwrap();
        let results = pipeline.run(&query).await.unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].timestamp_start_of_possession_seconds, 10.0);
    }

    #[tokio::test]
    async fn test_embed_failure_skips_search() {
        let mut embedder = MockQueryEmbedder::new();
        embedder
            .expect_embed()
            .returning(|_, _| Err(ReplayError::upstream_status(500, "provider down")));

        let mut search = MockSimilaritySearch::new();
        search.expect_search().times(0);

        let pipeline = SearchPipeline::new(Arc::new(embedder), Arc::new(search), small_config());
        let query = pipeline
            .validate(request(Some("kick off"), Some("sk-test"), None))
            .unwrap();
        let err = pipeline.run(&query).await.unwrap_err();

        assert_eq!(err.upstream_http_status(), Some(500));
    }

    #[tokio::test]
    async fn test_dimension_mismatch_is_upstream_error() {
        let mut embedder = MockQueryEmbedder::new();
        embedder.expect_embed().returning(|_, _| Ok(vec![0.1; 8]));
        let search = MockSimilaritySearch::new();

        let pipeline = SearchPipeline::new(Arc::new(embedder), Arc::new(search), small_config());
        let query = pipeline
            .validate(request(Some("goal"), Some("sk-test"), None))
            .unwrap();

        assert!(matches!(
            pipeline.embed_stage(&query).await,
            Err(ReplayError::Upstream { .. })
        ));
    }

    #[tokio::test]
    async fn test_search_stage_enforces_order_and_cap() {
        let embedder = MockQueryEmbedder::new();
        let mut search = MockSimilaritySearch::new();
        search.expect_search().returning(|_, _, _| {
            Ok(vec![
                segment(1.0, 0.2),
                segment(2.0, 0.8),
                segment(3.0, 0.5),
                segment(4.0, 0.9),
            ])
        });

        let pipeline = SearchPipeline::new(Arc::new(embedder), Arc::new(search), small_config());
        let results = pipeline.search_stage(&[0.0, 0.0, 0.0], 3).await.unwrap();

        let order: Vec<f64> = results
            .iter()
            .map(|s| s.timestamp_start_of_possession_seconds)
            .collect();
        assert_eq!(order, vec![4.0, 2.0, 3.0]);
    }

    #[test]
    fn test_validate_rejects_missing_fields() {
        let pipeline = SearchPipeline::new(
            Arc::new(MockQueryEmbedder::new()),
            Arc::new(MockSimilaritySearch::new()),
            small_config(),
        );

        let err = pipeline
            .validate(request(None, Some("sk-test"), None))
            .unwrap_err();
        assert_eq!(err.to_string(), "Please enter a query.");

        let err = pipeline
            .validate(request(Some("   "), Some("sk-test"), None))
            .unwrap_err();
        assert_eq!(err.to_string(), "Please enter a query.");

        let err = pipeline
            .validate(request(Some("goal"), Some(""), None))
            .unwrap_err();
        assert_eq!(err.to_string(), "Please enter an API key.");

        assert!(pipeline
            .validate(request(Some("goal"), Some("sk-test"), Some(0)))
            .is_err());
    }

    #[test]
    fn test_rank_segments_without_scores_keeps_order() {
        let mut a = segment(1.0, 0.1);
        let mut b = segment(2.0, 0.9);
        a.similarity = None;
        b.similarity = None;
        let ranked = rank_segments(vec![a, b], 5);
        assert_eq!(ranked[0].timestamp_start_of_possession_seconds, 1.0);
    }

    #[tokio::test]
    async fn test_retrying_embedder_retries_503() {
        let mut inner = MockQueryEmbedder::new();
        let mut seq = mockall::Sequence::new();
        inner
            .expect_embed()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Err(ReplayError::upstream_status(503, "busy")));
        inner
            .expect_embed()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(vec![1.0, 2.0, 3.0]));

        let policy = RetryPolicy::new(
            3,
            |_| Duration::from_millis(1),
            |e| e.upstream_http_status() == Some(503),
        );
        let embedder = RetryingEmbedder::new(Arc::new(inner), policy);

        let vector = embedder
            .embed("kick off", &Credential::new("sk-test"))
            .await
            .unwrap();
        assert_eq!(vector, vec![1.0, 2.0, 3.0]);
    }
}
