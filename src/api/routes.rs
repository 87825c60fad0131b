//! API route definitions
//!
//! - /health - liveness probe
//! - /upload - photo upload, bare alert array
//! - /api/v1/audit - photo upload, enveloped findings
//! - /api/v1/classify - caller-supplied detections, enveloped findings
//! - /api/v1/clusters - tray clustering table

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{self, AuditState};

/// Enveloped `/api/v1` routes.
pub fn api_routes(state: AuditState) -> Router {
    Router::new()
        .route("/audit", post(handlers::audit_upload))
        .route("/classify", post(handlers::classify_detections))
        .route("/clusters", post(handlers::cluster_detections))
        .with_state(state)
}

/// Root-level routes kept for the existing web client.
pub fn legacy_routes(state: AuditState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/upload", post(handlers::upload))
        .with_state(state)
}
