//! Error types for Replay

use thiserror::Error;

/// Main error type for Replay operations
#[derive(Debug, Error)]
pub enum ReplayError {
    /// Missing or malformed user input
    #[error("{0}")]
    Validation(String),

    /// Credential rejected by the embedding provider
    #[error("Auth error: {0}")]
    Auth(String),

    /// Embedding provider unreachable or returned a non-success status
    #[error("Upstream error: {message}")]
    Upstream {
        /// Error message
        message: String,
        /// HTTP status returned by the provider, if any
        status: Option<u16>,
    },

    /// Vector search backend error
    #[error("Search error: {0}")]
    Search(String),

    /// Search succeeded but nothing cleared the similarity threshold
    #[error("No data found for the given query.")]
    NoResults,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Network/HTTP error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// Convenient Result type using ReplayError
pub type Result<T> = std::result::Result<T, ReplayError>;

impl ReplayError {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        ReplayError::Validation(msg.into())
    }

    /// Create an auth error
    pub fn auth(msg: impl Into<String>) -> Self {
        ReplayError::Auth(msg.into())
    }

    /// Create an upstream error without an HTTP status
    pub fn upstream(msg: impl Into<String>) -> Self {
        ReplayError::Upstream {
            message: msg.into(),
            status: None,
        }
    }

    /// Create an upstream error for a non-success HTTP status
    pub fn upstream_status(status: u16, msg: impl Into<String>) -> Self {
        ReplayError::Upstream {
            message: msg.into(),
            status: Some(status),
        }
    }

    /// Create a search error
    pub fn search(msg: impl Into<String>) -> Self {
        ReplayError::Search(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        ReplayError::Config(msg.into())
    }

    /// HTTP status carried by an upstream error
    pub fn upstream_http_status(&self) -> Option<u16> {
        match self {
            ReplayError::Upstream { status, .. } => *status,
            _ => None,
        }
    }

    /// True for failures raised by the query embedding stage
    pub fn is_embedding_failure(&self) -> bool {
        matches!(self, ReplayError::Auth(_) | ReplayError::Upstream { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = ReplayError::search("relation does not exist");
        assert_eq!(err.to_string(), "Search error: relation does not exist");

        let err = ReplayError::validation("Please enter a query.");
        assert_eq!(err.to_string(), "Please enter a query.");

        assert_eq!(
            ReplayError::NoResults.to_string(),
            "No data found for the given query."
        );
    }

    #[test]
    fn test_upstream_status() {
        let err = ReplayError::upstream_status(503, "overloaded");
        assert_eq!(err.upstream_http_status(), Some(503));
        assert!(err.is_embedding_failure());

        let err = ReplayError::upstream("connection refused");
        assert_eq!(err.upstream_http_status(), None);

        assert!(ReplayError::auth("bad key").is_embedding_failure());
        assert!(!ReplayError::search("boom").is_embedding_failure());
    }
}
