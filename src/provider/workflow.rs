//! Hosted inference workflow client
//!
//! Posts the image (base64) to `{api_url}/infer/workflows/{workspace}/{workflow_id}`
//! and reads `outputs[0].predictions.predictions[]`, where each prediction is
//! a center-size box: `{x, y, width, height, class, confidence}`.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::Deserialize;
use std::time::Duration;

use super::{DetectionProvider, ProviderError};
use crate::config::ProviderConfig;
use crate::types::{BoundingBox, Detection};

#[derive(Debug, Deserialize)]
struct WorkflowResponse {
    outputs: Vec<WorkflowOutput>,
}

#[derive(Debug, Deserialize)]
struct WorkflowOutput {
    predictions: PredictionSet,
}

#[derive(Debug, Deserialize)]
struct PredictionSet {
    predictions: Vec<Prediction>,
}

#[derive(Debug, Deserialize)]
struct Prediction {
    x: f64,
    y: f64,
    width: f64,
    height: f64,
    class: String,
    confidence: f64,
}

impl From<Prediction> for Detection {
    fn from(p: Prediction) -> Self {
        Self::new(
            p.class,
            BoundingBox::from_center(p.x, p.y, p.width, p.height),
            p.confidence,
        )
    }
}

/// HTTP client for the detection workflow.
#[derive(Clone)]
pub struct WorkflowProvider {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    timeout: Duration,
}

impl std::fmt::Debug for WorkflowProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowProvider")
            .field("endpoint", &self.endpoint)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl WorkflowProvider {
    /// Build a client from the provider section of the config.
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let timeout = config.timeout();
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::Unavailable(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            endpoint: format!(
                "{}/infer/workflows/{}/{}",
                config.api_url.trim_end_matches('/'),
                config.workspace,
                config.workflow_id
            ),
            api_key: config.api_key.clone(),
            timeout,
        })
    }

    /// Workflow URL, for logging.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn transport_error(&self, e: &reqwest::Error) -> ProviderError {
        if e.is_timeout() {
            ProviderError::Timeout(self.timeout)
        } else {
            ProviderError::Unavailable(e.to_string())
        }
    }
}

#[async_trait]
impl DetectionProvider for WorkflowProvider {
    async fn detect(&self, image: &[u8], confidence: f64) -> Result<Vec<Detection>, ProviderError> {
        let body = serde_json::json!({
            "api_key": self.api_key,
            "inputs": {
                "image": { "type": "base64", "value": STANDARD.encode(image) },
                "confidence": confidence,
            },
            "use_cache": false,
        });

        let resp = self
            .http
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(&e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ProviderError::Unavailable(format!(
                "workflow returned status {status}"
            )));
        }

        let bytes = resp.bytes().await.map_err(|e| self.transport_error(&e))?;
        let detections = parse_response(&bytes)?;
        Ok(detections
            .into_iter()
            .filter(|d| d.confidence >= confidence)
            .collect())
    }

    fn name(&self) -> &str {
        "workflow"
    }
}

/// Decode a workflow response body into detections.
fn parse_response(body: &[u8]) -> Result<Vec<Detection>, ProviderError> {
    let response: WorkflowResponse = serde_json::from_slice(body)
        .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;

    let output = response
        .outputs
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::MalformedResponse("no workflow outputs".to_string()))?;

    Ok(output
        .predictions
        .predictions
        .into_iter()
        .map(Detection::from)
        .collect())
}
