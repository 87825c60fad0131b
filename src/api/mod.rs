//! REST API module using Axum
//!
//! HTTP surface of the compliance service:
//! - `/upload` for the web client (bare JSON array of alerts)
//! - `/api/v1` with the `{data, meta}` envelope
//! - `/health`

pub mod envelope;
pub mod error;
pub mod handlers;
mod routes;

pub use error::{AuditError, UploadError};
pub use handlers::AuditState;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;

/// CORS layer from the configured origins. Same-origin only when the list is
/// empty; `"*"` allows any origin.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    if origins.is_empty() {
        return layer;
    }
    if origins.iter().any(|o| o.trim() == "*") {
        return layer.allow_origin(AllowOrigin::any());
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| o.trim().parse().ok())
        .collect();
    tracing::info!(origins = ?origins, "CORS: allowing configured origins");
    layer.allow_origin(allowed)
}

/// Create the complete application router.
pub fn create_app(state: AuditState, server: &ServerConfig) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes(state.clone()))
        .merge(routes::legacy_routes(state))
        .layer(DefaultBodyLimit::max(server.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer(&server.cors_origins))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineParams;
    use crate::provider::FixtureProvider;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use std::path::PathBuf;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app_with_origins(cors_origins: Vec<String>) -> Router {
        let state = AuditState {
            provider: Arc::new(FixtureProvider::default()),
            reference_path: PathBuf::from("locations.csv"),
            params: EngineParams::default(),
            confidence: 0.04,
        };
        let server = ServerConfig {
            cors_origins,
            ..ServerConfig::default()
        };
        create_app(state, &server)
    }

    fn app() -> Router {
        app_with_origins(Vec::new())
    }

    #[tokio::test]
    async fn test_health_route() {
        let resp = app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_cors_preflight_allows_configured_origin() {
        let resp = app_with_origins(vec!["http://localhost:3000".to_string()])
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/upload")
                    .header(header::ORIGIN, "http://localhost:3000")
                    .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(
            resp.headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .and_then(|v| v.to_str().ok()),
            Some("http://localhost:3000")
        );
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let resp = app()
            .oneshot(Request::get("/api/v1/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
