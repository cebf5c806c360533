//! HTTP endpoint for serving metrics

use crate::{ExporterError, Result};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use scout_collector::CollectorRegistry;
use serde_json::json;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

/// HTTP endpoint for serving metrics and health checks
#[derive(Clone)]
pub struct MetricsEndpoint {
    registry: Arc<CollectorRegistry>,
    bind_addr: std::net::SocketAddr,
    server_handle: Option<Arc<tokio::task::JoinHandle<()>>>,
}

impl MetricsEndpoint {
    /// Create a new metrics endpoint
    pub fn new(registry: Arc<CollectorRegistry>, bind_addr: std::net::SocketAddr) -> Self {
        Self {
            registry,
            bind_addr,
            server_handle: None,
        }
    }

    /// Start the HTTP server
    pub async fn start(&mut self) -> Result<()> {
        if self.server_handle.is_some() {
            return Err(ExporterError::Server("Server already started".to_string()));
        }

        let app = create_app(self.registry.clone());
        let listener = TcpListener::bind(self.bind_addr).await?;

        info!("Starting metrics endpoint server on {}", self.bind_addr);

        let server_handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                warn!("Metrics endpoint server error: {}", e);
            }
        });

        self.server_handle = Some(Arc::new(server_handle));
        Ok(())
    }

    /// Stop the HTTP server
    pub async fn stop(&mut self) {
        if let Some(handle) = self.server_handle.take() {
            if let Ok(handle) = Arc::try_unwrap(handle) {
                handle.abort();
                let _ = handle.await;
            }
        }
    }

    /// Get the metrics URL
    pub fn metrics_url(&self) -> String {
        format!("http://{}/metrics", self.bind_addr)
    }

    /// Check if the server is running
    pub fn is_running(&self) -> bool {
        self.server_handle.is_some()
    }
}

impl Drop for MetricsEndpoint {
    fn drop(&mut self) {
        if let Some(handle) = self.server_handle.take() {
            if let Ok(handle) = Arc::try_unwrap(handle) {
                handle.abort();
            }
        }
    }
}

/// Create the Axum application
fn create_app(registry: Arc<CollectorRegistry>) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_handler))
        .route("/ready", get(ready_handler))
        .with_state(registry)
}

/// Handler for /metrics endpoint.
///
/// Every request runs one full collection cycle; the response carries
/// whatever the upstream APIs returned for this scrape.
async fn metrics_handler(State(registry): State<Arc<CollectorRegistry>>) -> Response {
    match registry.encode_text().await {
        Ok(metrics_text) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            metrics_text,
        )
            .into_response(),
        Err(e) => {
            warn!("Failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to encode metrics").into_response()
        }
    }
}

/// Handler for /health endpoint
async fn health_handler() -> Response {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "timestamp": chrono::Utc::now().to_rfc3339()
        })),
    )
        .into_response()
}

/// Handler for /ready endpoint (Kubernetes readiness probe)
async fn ready_handler(State(registry): State<Arc<CollectorRegistry>>) -> Response {
    if registry.collector_count() > 0 {
        (
            StatusCode::OK,
            Json(json!({
                "status": "ready",
                "timestamp": chrono::Utc::now().to_rfc3339()
            })),
        )
            .into_response()
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "not ready",
                "timestamp": chrono::Utc::now().to_rfc3339()
            })),
        )
            .into_response()
    }
}
