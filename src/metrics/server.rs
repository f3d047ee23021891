//! HTTP server for the Prometheus metrics endpoint.

use crate::metrics::MetricsRegistry;
use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Router};
use std::net::SocketAddr;
use thiserror::Error;
use tower_http::cors::CorsLayer;

/// Errors that can occur during metrics server operations.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listener could not be bound or the runtime could not start.
    #[error("failed to bind to address: {0}")]
    Bind(#[from] std::io::Error),

    /// The server stopped with an error after starting.
    #[error("server error: {0}")]
    Server(String),
}

/// Configuration for the metrics server.
#[derive(Debug, Clone)]
pub struct MetricsServerConfig {
    /// Address to bind the server to.
    pub bind_addr: SocketAddr,
}

impl Default for MetricsServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: ([0, 0, 0, 0], 9090).into(),
        }
    }
}

impl MetricsServerConfig {
    /// Creates a config with a custom port.
    pub fn with_port(port: u16) -> Self {
        Self {
            bind_addr: ([0, 0, 0, 0], port).into(),
        }
    }
}

/// HTTP server exposing `/metrics` and `/health`.
pub struct MetricsServer {
    config: MetricsServerConfig,
    registry: MetricsRegistry,
}

impl MetricsServer {
    /// Creates a new metrics server over a shared registry clone.
    pub fn new(config: MetricsServerConfig, registry: MetricsRegistry) -> Self {
        Self { config, registry }
    }

    /// Starts the HTTP server.
    ///
    /// This method runs the server until it is shut down.
    pub async fn run(self) -> Result<(), ServerError> {
        let listener = tokio::net::TcpListener::bind(self.config.bind_addr).await?;
        self.serve(listener).await
    }

    /// Runs the server on a dedicated thread with its own runtime.
    ///
    /// The counting loop stays synchronous; only the exporter is async.
    /// Binding happens before the thread starts, so an unusable address
    /// is reported here. Errors after startup are logged by the thread.
    pub fn spawn(self) -> Result<std::thread::JoinHandle<()>, ServerError> {
        let listener = std::net::TcpListener::bind(self.config.bind_addr)?;
        listener.set_nonblocking(true)?;
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()?;

        Ok(std::thread::spawn(move || {
            let result = runtime.block_on(async move {
                let listener = tokio::net::TcpListener::from_std(listener)?;
                self.serve(listener).await
            });
            if let Err(e) = result {
                tracing::error!(error = %e, "Metrics server stopped");
            }
        }))
    }

    async fn serve(self, listener: tokio::net::TcpListener) -> Result<(), ServerError> {
        let app = Router::new()
            .route("/metrics", get(metrics_handler))
            .route("/health", get(health_handler))
            .layer(CorsLayer::permissive())
            .with_state(self.registry);

        tracing::info!(
            addr = %self.config.bind_addr,
            "Metrics server listening"
        );

        axum::serve(listener, app)
            .await
            .map_err(|e| ServerError::Server(e.to_string()))?;

        Ok(())
    }
}

/// Handler for the /metrics endpoint.
async fn metrics_handler(State(registry): State<MetricsRegistry>) -> impl IntoResponse {
    match registry.encode() {
        Ok(output) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            output,
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            format!("Failed to encode metrics: {}", e),
        ),
    }
}

/// Handler for the /health endpoint.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
