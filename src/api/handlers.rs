//! API route handlers
//!
//! Request handling for the compliance endpoints:
//! - Photo upload → detection provider → classification engine
//! - Direct classification of a supplied detection list
//! - Tray clustering diagnostics

use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::response::Response;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::envelope::ApiResponse;
use super::error::{AuditError, UploadError};
use crate::engine::{self, EngineParams, ShelfAudit};
use crate::provider::DetectionProvider;
use crate::reference;
use crate::types::{to_alerts, AlertView, Detection, Finding, FindingCategory};

// ============================================================================
// API State
// ============================================================================

/// Shared state for API handlers. Read-only; every request loads its own
/// copy of the reference table.
#[derive(Clone)]
pub struct AuditState {
    pub provider: Arc<dyn DetectionProvider>,
    /// Planogram CSV, re-read on every request
    pub reference_path: PathBuf,
    pub params: EngineParams,
    /// Default detector confidence threshold
    pub confidence: f64,
}

// ============================================================================
// Request / Response bodies
// ============================================================================

/// Health probe response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub provider: String,
}

/// Detections supplied by the caller instead of the provider.
#[derive(Debug, Deserialize)]
pub struct ClassifyRequest {
    pub detections: Vec<Detection>,
}

/// Classification result with both the raw findings and their display form.
#[derive(Debug, Serialize)]
pub struct AuditData {
    pub shelf: String,
    pub findings: Vec<Finding>,
    pub alerts: Vec<AlertView>,
}

impl From<ShelfAudit> for AuditData {
    fn from(audit: ShelfAudit) -> Self {
        Self {
            alerts: to_alerts(&audit.findings),
            shelf: audit.shelf,
            findings: audit.findings,
        }
    }
}

struct UploadForm {
    image: Vec<u8>,
    confidence: Option<f64>,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /health
pub async fn health(State(state): State<AuditState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        provider: state.provider.name().to_string(),
    })
}

/// POST /upload - multipart `image`, returns the display alerts as a bare array
pub async fn upload(
    State(state): State<AuditState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Vec<AlertView>>, UploadError> {
    let form = read_upload(multipart).await?;
    let audit = detect_and_audit(&state, form).await?;
    Ok(Json(to_alerts(&audit.findings)))
}

/// POST /api/v1/audit - multipart `image` (+ optional `confidence`)
pub async fn audit_upload(
    State(state): State<AuditState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, AuditError> {
    let form = read_upload(multipart).await?;
    let audit = detect_and_audit(&state, form).await?;
    Ok(ApiResponse::ok(AuditData::from(audit)))
}

/// POST /api/v1/classify - classify caller-supplied detections
pub async fn classify_detections(
    State(state): State<AuditState>,
    Json(request): Json<ClassifyRequest>,
) -> Result<Response, AuditError> {
    validate_detections(&request.detections)?;
    let audit = run_audit(&state, request.detections).await?;
    Ok(ApiResponse::ok(AuditData::from(audit)))
}

/// POST /api/v1/clusters - tray clustering table for caller-supplied detections
pub async fn cluster_detections(
    State(state): State<AuditState>,
    Json(request): Json<ClassifyRequest>,
) -> Result<Response, AuditError> {
    validate_detections(&request.detections)?;
    let report = run_blocking(&state, request.detections, |detections, reference, params| {
        engine::cluster_report(&detections, &reference, &params)
    })
    .await?;
    Ok(ApiResponse::ok(report))
}

// ============================================================================
// Pipeline
// ============================================================================

async fn detect_and_audit(state: &AuditState, form: UploadForm) -> Result<ShelfAudit, AuditError> {
    let confidence = form.confidence.unwrap_or(state.confidence);
    let detections = discard_malformed(state.provider.detect(&form.image, confidence).await?);
    info!(
        provider = state.provider.name(),
        detections = detections.len(),
        confidence,
        "Detections received"
    );
    run_audit(state, detections).await
}

async fn run_audit(state: &AuditState, detections: Vec<Detection>) -> Result<ShelfAudit, AuditError> {
    let audit = run_blocking(state, detections, |detections, reference, params| {
        engine::audit(&detections, &reference, &params)
    })
    .await?;

    info!(
        shelf = %audit.shelf,
        wrong_shelf = audit.count(FindingCategory::WrongShelf),
        missing = audit.count(FindingCategory::Missing),
        wrong_tray = audit.count(FindingCategory::WrongTray),
        wrong_position = audit.count(FindingCategory::WrongPosition),
        correct = audit.count(FindingCategory::Correct),
        "Shelf audit complete"
    );
    Ok(audit)
}

/// Load the reference table and run `f` on the blocking pool.
async fn run_blocking<T, F>(
    state: &AuditState,
    detections: Vec<Detection>,
    f: F,
) -> Result<T, AuditError>
where
    T: Send + 'static,
    F: FnOnce(Vec<Detection>, Vec<crate::types::ReferenceEntry>, EngineParams) -> Result<T, engine::ClassifyError>
        + Send
        + 'static,
{
    let path = state.reference_path.clone();
    let params = state.params;

    tokio::task::spawn_blocking(move || -> Result<T, AuditError> {
        let reference = reference::load_reference(&path)?;
        Ok(f(detections, reference, params)?)
    })
    .await
    .map_err(|e| AuditError::Internal(format!("classification task failed: {e}")))?
}

async fn read_upload(
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<UploadForm, AuditError> {
    // A body that is not multipart carries no image field
    let mut multipart = multipart.map_err(|rejection| {
        debug!(%rejection, "Upload is not multipart");
        AuditError::NoImage
    })?;
    let mut image: Option<(String, Vec<u8>)> = None;
    let mut confidence = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AuditError::BadUpload(e.to_string()))?
    {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("image") => {
                let filename = field.file_name().unwrap_or_default().to_owned();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AuditError::BadUpload(e.to_string()))?;
                image = Some((filename, bytes.to_vec()));
            }
            Some("confidence") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AuditError::BadUpload(e.to_string()))?;
                confidence = Some(parse_confidence(&text)?);
            }
            _ => {}
        }
    }

    let (filename, image) = image.ok_or(AuditError::NoImage)?;
    if filename.is_empty() {
        return Err(AuditError::NoFilename);
    }
    Ok(UploadForm { image, confidence })
}

fn parse_confidence(text: &str) -> Result<f64, AuditError> {
    let value: f64 = text
        .trim()
        .parse()
        .map_err(|_| AuditError::BadUpload(format!("confidence '{}' is not a number", text.trim())))?;
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(AuditError::BadUpload(format!("confidence {value} must be within [0, 1]")))
    }
}

/// Drop provider detections that would fail `validate_detections`.
fn discard_malformed(detections: Vec<Detection>) -> Vec<Detection> {
    let received = detections.len();
    let kept: Vec<Detection> = detections
        .into_iter()
        .filter(|d| d.bbox.is_well_formed() && (0.0..=1.0).contains(&d.confidence))
        .collect();
    if kept.len() < received {
        warn!(
            dropped = received - kept.len(),
            received,
            "Discarding malformed provider detections"
        );
    }
    kept
}

fn validate_detections(detections: &[Detection]) -> Result<(), AuditError> {
    for (i, d) in detections.iter().enumerate() {
        if !d.bbox.is_well_formed() {
            return Err(AuditError::InvalidDetections(format!(
                "detection {i} ({}) has a malformed bbox {:?}",
                d.label,
                d.bbox.to_array()
            )));
        }
        if !(0.0..=1.0).contains(&d.confidence) {
            return Err(AuditError::InvalidDetections(format!(
                "detection {i} ({}) has confidence {} outside [0, 1]",
                d.label, d.confidence
            )));
        }
    }
    Ok(())
}
