//! Replay search endpoint
//!
//! # Endpoints
//!
//! - `GET /health` - Health check
//! - `POST /api/search` - `{ query, apiKey, matches }` → `{ possessions: [...] }`
//!
//! Validation failures answer `400` with the message as plain text. Any
//! embedding failure answers `500 Error`; a vector search failure answers
//! `500 Possessions Error`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod handlers;
pub mod server;
pub mod state;

pub use handlers::{ApiError, HealthResponse};
pub use server::{build_router, SearchApiConfig, SearchApiServer};
pub use state::ServerState;
