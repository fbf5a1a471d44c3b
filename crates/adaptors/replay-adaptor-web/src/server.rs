//! Search API server implementation

use crate::handlers::{health_check, search_handler};
use crate::state::ServerState;
use axum::{
    routing::{get, post},
    Router,
};
use replay_core::{ReplayError, Result, SearchPipeline};
use std::net::SocketAddr;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Search API configuration
#[derive(Debug, Clone)]
pub struct SearchApiConfig {
    /// Server host
    pub host: String,

    /// Server port (0 picks a free port)
    pub port: u16,

    /// Enable permissive CORS
    pub enable_cors: bool,
}

impl Default for SearchApiConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            enable_cors: true,
        }
    }
}

/// Build the Axum router
pub fn build_router(state: ServerState, enable_cors: bool) -> Router {
    let mut router = Router::new()
        .route("/health", get(health_check))
        .route("/api/search", post(search_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    if enable_cors {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        router = router.layer(cors);
    }

    router
}

/// Search API server service
pub struct SearchApiServer {
    config: SearchApiConfig,
    pipeline: SearchPipeline,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
    local_addr: Option<SocketAddr>,
}

impl SearchApiServer {
    /// Create new search API server
    pub fn new(config: SearchApiConfig, pipeline: SearchPipeline) -> Self {
        Self {
            config,
            pipeline,
            shutdown_tx: None,
            local_addr: None,
        }
    }

    /// Bind and serve in a background task, returning the bound address
    pub async fn start(&mut self) -> Result<SocketAddr> {
        if self.is_running() {
            return Err(ReplayError::config("Server already running"));
        }

        let router = build_router(ServerState::new(self.pipeline.clone()), self.config.enable_cors);

        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| ReplayError::config(format!("Failed to bind to {}: {}", addr, e)))?;
        let local_addr = listener.local_addr()?;
        info!("Search API listening on http://{}", local_addr);

        let (tx, rx) = tokio::sync::oneshot::channel();
        self.shutdown_tx = Some(tx);
        self.local_addr = Some(local_addr);

        tokio::spawn(async move {
            let server = axum::serve(listener, router).with_graceful_shutdown(async {
                let _ = rx.await;
            });
            if let Err(e) = server.await {
                error!("Server error: {}", e);
            }
        });

        Ok(local_addr)
    }

    /// Stop the server
    pub async fn stop(&mut self) -> Result<()> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
            info!("Search API server stopped");
        }
        self.local_addr = None;
        Ok(())
    }

    /// Check if server is running
    pub fn is_running(&self) -> bool {
        self.shutdown_tx.is_some()
    }

    /// Address the server is bound to
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }
}
