//! Request handlers for the search endpoint

use crate::state::ServerState;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use replay_core::utils::redact_secrets;
use replay_core::{ReplayError, SearchRequest, SearchResponse};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `ok` while the process serves requests
    pub status: String,
    /// Crate version
    pub version: String,
    /// Uptime in seconds
    pub uptime_secs: u64,
    /// Timestamp
    pub timestamp: String,
}

/// Health check handler
pub async fn health_check(State(state): State<ServerState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// `POST /api/search`: embed the query, then search the possessions table
pub async fn search_handler(
    State(state): State<ServerState>,
    payload: std::result::Result<Json<SearchRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(body) => body,
        Err(rejection) => {
            warn!("Rejected search body: {}", rejection.body_text());
            return ApiError::BadRequest(rejection.body_text()).into_response();
        }
    };

    let query = match state.pipeline.validate(request) {
        Ok(q) => q,
        Err(e) => return ApiError::from(e).into_response(),
    };

    info!(
        "Search for {:?} ({} matches)",
        redact_secrets(&query.text),
        query.match_count
    );

    match state.pipeline.run(&query).await {
        Ok(possessions) => Json(SearchResponse { possessions }).into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

/// API error types
///
/// Server-side failures carry no detail beyond the status code and a fixed
/// body; the cause is only logged.
#[derive(Debug)]
pub enum ApiError {
    /// Missing or malformed input
    BadRequest(String),
    /// Embedding provider failure, including a rejected credential
    Embedding,
    /// Vector search failure
    Search,
    /// Anything else
    Internal,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Embedding => (StatusCode::INTERNAL_SERVER_ERROR, "Error".to_string()),
            ApiError::Search => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Possessions Error".to_string(),
            ),
            ApiError::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "Error".to_string()),
        };

        (status, body).into_response()
    }
}

impl From<ReplayError> for ApiError {
    fn from(err: ReplayError) -> Self {
        if err.is_embedding_failure() {
            error!("Embedding failed: {}", redact_secrets(&err.to_string()));
            return ApiError::Embedding;
        }

        match err {
            ReplayError::Validation(msg) => ApiError::BadRequest(msg),
            ReplayError::Search(msg) => {
                error!("Possessions search failed: {}", redact_secrets(&msg));
                ApiError::Search
            }
            other => {
                error!("Search request failed: {}", redact_secrets(&other.to_string()));
                ApiError::Internal
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_response() {
        let response = ApiError::BadRequest("Please enter a query.".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = ApiError::Search.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_error_mapping() {
        assert!(matches!(
            ApiError::from(ReplayError::validation("x")),
            ApiError::BadRequest(_)
        ));
        assert!(matches!(
            ApiError::from(ReplayError::auth("bad key")),
            ApiError::Embedding
        ));
        assert!(matches!(
            ApiError::from(ReplayError::upstream_status(502, "bad gateway")),
            ApiError::Embedding
        ));
        assert!(matches!(
            ApiError::from(ReplayError::search("timeout")),
            ApiError::Search
        ));
        assert!(matches!(
            ApiError::from(ReplayError::config("x")),
            ApiError::Internal
        ));
    }
}
