//! Configuration management and environment variable loading

use crate::{ReplayError, Result};
use std::env;

/// Similarity threshold passed to the vector search function on every query
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.01;

/// Match count used when neither the request nor saved settings provide one
pub const DEFAULT_MATCH_COUNT: usize = 3;

/// Upper bound applied to the requested match count
pub const DEFAULT_MAX_MATCH_COUNT: usize = 20;

/// Dimension of `text-embedding-3-small` and `text-embedding-ada-002` vectors
pub const DEFAULT_EMBEDDING_DIMENSION: usize = 1536;

/// Load environment variables from a .env file
///
/// A missing file is not an error; the process environment is used as-is.
pub fn load_env() -> Result<()> {
    match dotenvy::dotenv() {
        Ok(path) => {
            tracing::info!("Loaded environment from: {}", path.display());
            Ok(())
        }
        Err(dotenvy::Error::LineParse(line, pos)) => Err(ReplayError::config(format!(
            "Failed to parse .env file at line {}, position {}",
            line, pos
        ))),
        Err(dotenvy::Error::Io(_)) => {
            tracing::debug!("No .env file found - using system environment variables only");
            Ok(())
        }
        Err(e) => Err(ReplayError::config(format!(
            "Failed to load .env file: {}",
            e
        ))),
    }
}

/// Get environment variable parsed as any `FromStr` type
pub fn get_env_int<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

/// Tunables for the query pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct SearchConfig {
    /// Minimum similarity for a segment to match
    pub similarity_threshold: f64,
    /// Match count used when a request omits it
    pub default_match_count: usize,
    /// Requested match counts above this are capped
    pub max_match_count: usize,
    /// Expected embedding length
    pub embedding_dimension: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            default_match_count: DEFAULT_MATCH_COUNT,
            max_match_count: DEFAULT_MAX_MATCH_COUNT,
            embedding_dimension: DEFAULT_EMBEDDING_DIMENSION,
        }
    }
}

impl SearchConfig {
    /// Build from `REPLAY_MAX_MATCHES` and `REPLAY_EMBEDDING_DIMENSION`
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_match_count: get_env_int("REPLAY_MAX_MATCHES", defaults.max_match_count),
            embedding_dimension: get_env_int(
                "REPLAY_EMBEDDING_DIMENSION",
                defaults.embedding_dimension,
            ),
            ..defaults
        }
    }

    /// Resolve a requested match count against the configured bounds
    pub fn resolve_match_count(&self, requested: Option<usize>) -> Result<usize> {
        match requested {
            None => Ok(self.default_match_count),
            Some(0) => Err(ReplayError::validation(
                "Match count must be at least 1.",
            )),
            Some(n) => Ok(n.min(self.max_match_count)),
        }
    }
}
