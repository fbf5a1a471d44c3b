//! Core type definitions for Replay

use serde::{Deserialize, Serialize};
use std::fmt;

/// Embedding vector produced by the query embedder
pub type Embedding = Vec<f32>;

/// A labeled moment of the match video with its descriptive text
///
/// Rows are written offline by the ingestion scripts and never mutated
/// afterwards. The embedding column stays in the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Offset into the match video, in seconds
    pub timestamp_start_of_possession_seconds: f64,

    /// Period, score, minute and team in possession
    #[serde(default)]
    pub possession_details: String,

    /// Commentary-style description that was embedded
    #[serde(default)]
    pub description: String,

    /// Cosine similarity to the query, when the store reports it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f64>,
}

/// API key for the embedding provider
///
/// `Debug` never prints the key.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wrap a raw key, trimming surrounding whitespace
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into().trim().to_string())
    }

    /// The raw key
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Whether any key is present
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Length of the key in characters
    pub fn len(&self) -> usize {
        self.0.chars().count()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential(<{} chars>)", self.len())
    }
}

/// A single user search
#[derive(Debug, Clone)]
pub struct Query {
    /// Raw query text
    pub text: String,
    /// Provider credential
    pub credential: Credential,
    /// Maximum number of segments to return
    pub match_count: usize,
}

/// Body accepted by `POST /api/search`
///
/// Fields are optional on the wire so that absence surfaces as a
/// validation error rather than a decode failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Query text
    #[serde(default)]
    pub query: Option<String>,

    /// Embedding provider key
    #[serde(default, rename = "apiKey")]
    pub api_key: Option<String>,

    /// Requested match count
    #[serde(default)]
    pub matches: Option<usize>,
}

/// Body returned by `POST /api/search`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResponse {
    /// Ranked segments, best first
    pub possessions: Vec<Segment>,
}

/// Collapse newlines to spaces before embedding
pub fn normalize_query(text: &str) -> String {
    text.replace("\r\n", " ").replace(['\n', '\r'], " ")
}
