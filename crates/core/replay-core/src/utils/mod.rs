//! Utility functions

pub mod logger;
pub mod redact;

pub use redact::redact_secrets;
