//! HTTP server exposing the metrics endpoint
//!
//! Serves `/metrics` in the Prometheus text exposition format straight from
//! the in-memory registry and `/health` for liveness probes.

use crate::error::Result;
use crate::logging::get_logger;
use crate::metrics::MetricSink;
use axum::{
    Router,
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
    routing::get,
};
use std::sync::Arc;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;

const TEXT_EXPOSITION_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

#[derive(Clone)]
struct AppState {
    sink: Arc<MetricSink>,
}

/// Build the exporter's router
pub fn router(sink: Arc<MetricSink>) -> Router {
    Router::new()
        .route("/metrics", get(metrics))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { sink })
}

async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    match state.sink.render() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, TEXT_EXPOSITION_CONTENT_TYPE)],
            body,
        )
            .into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, env!("APP_VERSION"))
}

/// Bind and serve until the shutdown signal fires
pub async fn serve(
    listen_addr: &str,
    sink: Arc<MetricSink>,
    mut shutdown: watch::Receiver<bool>,
) -> Result<()> {
    let logger = get_logger("web");
    let listener = tokio::net::TcpListener::bind(listen_addr).await?;
    logger.info(&format!("metrics endpoint listening on {}", listen_addr));

    axum::serve(listener, router(sink))
        .with_graceful_shutdown(async move {
            let _ = shutdown.changed().await;
        })
        .await?;

    logger.info("web server stopped");
    Ok(())
}
