//! Logging utilities

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the global logging system
///
/// `RUST_LOG` wins when set; otherwise `REPLAY_LOG_LEVEL` (default `info`).
/// Safe to call more than once: later calls are ignored.
pub fn init_logging() {
    let level = std::env::var("REPLAY_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    init_logging_with_level(&level);
}

/// Initialize logging with `level` as the filter used when `RUST_LOG` is unset
pub fn init_logging_with_level(level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_twice() {
        init_logging();
        init_logging();
        tracing::info!("logging initialized");
    }

    #[test]
    fn test_init_logging_with_level_accepts_bad_filter() {
        init_logging_with_level("not a [valid filter");
        init_logging_with_level("debug");
    }
}
