//! Request-level error taxonomy and its HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use super::envelope::ApiErrorResponse;
use crate::engine::ClassifyError;
use crate::provider::ProviderError;
use crate::reference::ReferenceLoadError;

/// Everything that can end a compliance request. All variants are terminal:
/// no partial findings are returned.
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("No image provided")]
    NoImage,
    #[error("No selected file")]
    NoFilename,
    #[error("invalid upload: {0}")]
    BadUpload(String),
    #[error("invalid detections: {0}")]
    InvalidDetections(String),
    #[error(transparent)]
    Classify(#[from] ClassifyError),
    #[error("detection service error: {0}")]
    Provider(#[from] ProviderError),
    #[error("configuration error: {0}")]
    Reference(#[from] ReferenceLoadError),
    #[error("internal error: {0}")]
    Internal(String),
}

impl AuditError {
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::NoImage | Self::NoFilename | Self::BadUpload(_) | Self::InvalidDetections(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Classify(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Provider(ProviderError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
            Self::Provider(_) => StatusCode::BAD_GATEWAY,
            Self::Reference(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub const fn code(&self) -> &'static str {
        match self {
            Self::NoImage | Self::NoFilename | Self::BadUpload(_) | Self::InvalidDetections(_) => {
                "BAD_REQUEST"
            }
            Self::Classify(ClassifyError::EmptyResolution) => "EMPTY_RESOLUTION",
            Self::Classify(ClassifyError::InsufficientDetections { .. }) => "INSUFFICIENT_DETECTIONS",
            Self::Provider(ProviderError::Timeout(_)) => "PROVIDER_TIMEOUT",
            Self::Provider(_) => "PROVIDER_UNAVAILABLE",
            Self::Reference(_) => "REFERENCE_LOAD_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn log(&self) {
        match self.status() {
            s if s.is_server_error() => tracing::error!(code = self.code(), error = %self, "Request failed"),
            _ => tracing::warn!(code = self.code(), error = %self, "Request rejected"),
        }
    }
}

/// Envelope error shape for `/api/v1` routes.
impl IntoResponse for AuditError {
    fn into_response(self) -> Response {
        self.log();
        ApiErrorResponse::build(self.status(), self.code(), self.to_string())
    }
}

/// Bare `{"error": "..."}` shape used by the `/upload` endpoint.
#[derive(Debug)]
pub struct UploadError(pub AuditError);

impl From<AuditError> for UploadError {
    fn from(e: AuditError) -> Self {
        Self(e)
    }
}

impl IntoResponse for UploadError {
    fn into_response(self) -> Response {
        self.0.log();
        (
            self.0.status(),
            axum::Json(serde_json::json!({ "error": self.0.to_string() })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_status_mapping() {
        assert_eq!(AuditError::NoImage.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AuditError::from(ClassifyError::EmptyResolution).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            AuditError::from(ProviderError::Timeout(Duration::from_secs(30))).status(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            AuditError::from(ProviderError::Unavailable("down".into())).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            AuditError::from(ReferenceLoadError::Empty).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_messages_name_the_failure() {
        assert!(AuditError::from(ClassifyError::EmptyResolution)
            .to_string()
            .starts_with("cannot determine shelf"));
        assert!(AuditError::from(ClassifyError::InsufficientDetections { distinct: 3, required: 4 })
            .to_string()
            .starts_with("insufficient data"));
        assert!(AuditError::from(ReferenceLoadError::Empty)
            .to_string()
            .starts_with("configuration error"));
    }

    #[tokio::test]
    async fn test_upload_error_shape() {
        let resp = UploadError(AuditError::NoImage).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let v: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(v, serde_json::json!({"error": "No image provided"}));
    }
}
