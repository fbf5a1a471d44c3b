//! Shared state for the search endpoint handlers

use replay_core::SearchPipeline;
use std::time::Instant;

/// State cloned into every handler
///
/// Nothing here is mutated by requests.
#[derive(Clone)]
pub struct ServerState {
    /// Embed-then-search pipeline
    pub pipeline: SearchPipeline,

    /// Server start time
    pub start_time: Instant,
}

impl ServerState {
    /// Create new server state
    pub fn new(pipeline: SearchPipeline) -> Self {
        Self {
            pipeline,
            start_time: Instant::now(),
        }
    }
}
