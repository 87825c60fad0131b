//! Detection provider: source of `(label, confidence, bbox)` detections
//!
//! The classification engine never sees pixels. Providers turn an uploaded
//! image into detections:
//! - [`WorkflowProvider`]: hosted inference workflow over HTTP
//! - [`FixtureProvider`]: fixed detection list (offline runs and tests)
//!
//! Providers do not retry; retry policy belongs to the caller.

mod fixture;
mod workflow;

pub use fixture::FixtureProvider;
pub use workflow::WorkflowProvider;

use async_trait::async_trait;
use std::time::Duration;

use crate::types::Detection;

/// Detection provider failures.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("detection provider unavailable: {0}")]
    Unavailable(String),
    #[error("detection provider timed out after {0:?}")]
    Timeout(Duration),
    #[error("detection provider returned an unreadable response: {0}")]
    MalformedResponse(String),
}

/// Anything that can detect products in an image.
#[async_trait]
pub trait DetectionProvider: Send + Sync {
    /// Detect products in `image` (encoded image bytes), keeping only
    /// detections with confidence at or above `confidence`.
    async fn detect(&self, image: &[u8], confidence: f64) -> Result<Vec<Detection>, ProviderError>;

    /// Short name for logs.
    fn name(&self) -> &str;
}
