//! Shared fixtures for search endpoint tests

#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use replay_adaptor_web::{build_router, ServerState};
use replay_core::{
    Credential, Embedding, QueryEmbedder, ReplayError, Result, SearchConfig, SearchPipeline,
    Segment, SimilaritySearch,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const DIMENSION: usize = 4;

/// Embedder returning a fixed vector, or a configured failure
#[derive(Default)]
pub struct StubEmbedder {
    pub fail_with: Option<fn() -> ReplayError>,
    pub seen: Mutex<Vec<String>>,
}

#[async_trait]
impl QueryEmbedder for StubEmbedder {
    async fn embed(&self, text: &str, _credential: &Credential) -> Result<Embedding> {
        self.seen.lock().unwrap().push(text.to_string());
        match self.fail_with {
            Some(make) => Err(make()),
            None => Ok(vec![0.25; DIMENSION]),
        }
    }
}

/// Search returning canned rows in store order
#[derive(Default)]
pub struct StubSearch {
    pub rows: Vec<Segment>,
    pub fail: bool,
    pub calls: AtomicUsize,
}

#[async_trait]
impl SimilaritySearch for StubSearch {
    async fn search(
        &self,
        _embedding: &[f32],
        _threshold: f64,
        match_count: usize,
    ) -> Result<Vec<Segment>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(ReplayError::search("relation does not exist"));
        }
        Ok(self.rows.iter().take(match_count).cloned().collect())
    }
}

pub fn segment(ts: f64, similarity: f64) -> Segment {
    Segment {
        timestamp_start_of_possession_seconds: ts,
        possession_details: format!("1st half, minute {}", (ts / 60.0) as u32),
        description: "Messi dribbles past two defenders".to_string(),
        similarity: Some(similarity),
    }
}

pub fn sample_rows() -> Vec<Segment> {
    vec![
        segment(120.0, 0.62),
        segment(2400.0, 0.88),
        segment(45.0, 0.31),
        segment(6000.0, 0.74),
    ]
}

pub fn router_with(embedder: Arc<StubEmbedder>, search: Arc<StubSearch>) -> Router {
    let config = SearchConfig {
        embedding_dimension: DIMENSION,
        ..SearchConfig::default()
    };
    let pipeline = SearchPipeline::new(embedder, search, config);
    build_router(ServerState::new(pipeline), true)
}
