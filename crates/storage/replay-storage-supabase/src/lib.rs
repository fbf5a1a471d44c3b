//! Replay Supabase storage
//!
//! Similarity search over possession segments stored in Supabase with
//! pgvector. Uses the Supabase REST API (PostgREST) RPC endpoint.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod migrations;
pub mod vector_search;

pub use vector_search::{SupabaseConfig, SupabaseVectorSearch, DEFAULT_SEARCH_FUNCTION};
