//! Shelf-compliance classification engine
//!
//! Turns one photograph's detections plus the planogram into findings. The
//! stages run strictly in order, each consuming the previous one's output:
//!
//! 1. **Shelf resolution** (`shelf`): majority vote over matched shelves
//! 2. **Presence** (`presence`): on-shelf / WRONG_SHELF split and MISSING set
//! 3. **Tray clustering** (`tray_cluster`, `kmeans`): 4 vertical bands,
//!    topmost band = tray 4
//! 4. **Tray conformance** (`tray_check`): WRONG_TRAY
//! 5. **Position check** (`position`): facing blocks vs slots, WRONG_POSITION
//! 6. **Aggregation** (`aggregate`): one ordered finding list
//!
//! Everything is a pure function of its inputs and [`EngineParams`]; nothing
//! is shared between calls.

pub mod aggregate;
pub mod index;
pub mod kmeans;
pub mod position;
pub mod presence;
pub mod shelf;
pub mod tray_check;
pub mod tray_cluster;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::defaults;
use crate::types::{normalize_key, BoundingBox, Detection, Finding, FindingCategory, ReferenceEntry};

use index::{ReferenceIndex, ShelfIndex};
use tray_cluster::TrayBand;

// ============================================================================
// Parameters
// ============================================================================

/// Which detections the tray and position stages look at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FindingPolicy {
    /// Only on-shelf detections reach the tray and position stages, so each
    /// detection gets exactly one finding.
    #[default]
    Exclusive,
    /// Every detection goes through the tray stage. Off-shelf detections have
    /// no tray on the resolved shelf and are reported both as WRONG_SHELF and
    /// WRONG_TRAY.
    Compatible,
}

/// Tunables for one classification run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineParams {
    /// Multiplier on the vertical center before clustering
    pub vertical_scale: f64,
    /// k-means seed
    pub seed: u64,
    /// k-means restarts
    pub n_init: usize,
    pub max_iterations: usize,
    pub tolerance: f64,
    pub policy: FindingPolicy,
}

impl Default for EngineParams {
    fn default() -> Self {
        Self {
            vertical_scale: defaults::DEFAULT_VERTICAL_SCALE,
            seed: defaults::DEFAULT_KMEANS_SEED,
            n_init: defaults::DEFAULT_KMEANS_RESTARTS,
            max_iterations: defaults::DEFAULT_KMEANS_MAX_ITERATIONS,
            tolerance: defaults::DEFAULT_KMEANS_TOLERANCE,
            policy: FindingPolicy::Exclusive,
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Terminal classification failures. No partial results are produced.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClassifyError {
    #[error("cannot determine shelf: no detection matches the reference table")]
    EmptyResolution,
    #[error("insufficient data: {distinct} distinct detections, tray clustering needs {required}")]
    InsufficientDetections { distinct: usize, required: usize },
}

// ============================================================================
// Outputs
// ============================================================================

/// Full result of a classification run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShelfAudit {
    /// Resolved shelf id
    pub shelf: String,
    /// Clustered tray per detection, input order
    pub tray_labels: Vec<u32>,
    pub findings: Vec<Finding>,
}

impl ShelfAudit {
    /// Number of findings in `category`.
    pub fn count(&self, category: FindingCategory) -> usize {
        self.findings.iter().filter(|f| f.category == category).count()
    }
}

/// One detection with its clustered tray and the resolved shelf's planogram row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterRow {
    pub name: String,
    pub bbox: BoundingBox,
    pub tray_cluster: u32,
    pub product_id: Option<String>,
    /// Planogram tray, `None` when the product is not on the resolved shelf
    pub tray: Option<u32>,
    pub position: Option<u32>,
}

/// Tray clustering diagnostic table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterReport {
    pub shelf: String,
    pub rows: Vec<ClusterRow>,
    pub bands: Vec<TrayBand>,
}

// ============================================================================
// Entry points
// ============================================================================

/// Classify detections against the planogram with default parameters.
pub fn classify(
    detections: &[Detection],
    reference: &[ReferenceEntry],
) -> Result<Vec<Finding>, ClassifyError> {
    audit(detections, reference, &EngineParams::default()).map(|a| a.findings)
}

/// Run every stage and keep the resolved shelf and tray labels alongside the
/// findings.
pub fn audit(
    detections: &[Detection],
    reference: &[ReferenceEntry],
    params: &EngineParams,
) -> Result<ShelfAudit, ClassifyError> {
    let index = ReferenceIndex::new(reference);
    let resolution = shelf::resolve_shelf(detections, &index)?;
    let shelf_index = ShelfIndex::new(&resolution.expected);

    let presence =
        presence::classify_presence(detections, &resolution.expected, &shelf_index, &index);

    let clusters = tray_cluster::cluster_trays(detections, params)?;

    let candidates: Vec<usize> = match params.policy {
        FindingPolicy::Exclusive => presence.on_shelf.clone(),
        FindingPolicy::Compatible => (0..detections.len()).collect(),
    };
    let trays = tray_check::check_trays(
        &candidates,
        detections,
        &clusters.labels,
        &shelf_index,
        &index,
    );
    let wrong_position = position::check_positions(&trays.placed, detections);

    debug!(
        shelf = resolution.shelf,
        on_shelf = presence.on_shelf.len(),
        wrong_shelf = presence.wrong_shelf.len(),
        missing = presence.missing.len(),
        wrong_tray = trays.wrong_tray.len(),
        wrong_position = wrong_position.len(),
        "Classification stages complete"
    );

    let findings = aggregate::aggregate(
        detections,
        presence,
        trays.wrong_tray,
        wrong_position,
        &shelf_index,
        &index,
    );

    Ok(ShelfAudit {
        shelf: resolution.shelf.to_string(),
        tray_labels: clusters.labels,
        findings,
    })
}

/// Clustered tray of every detection next to its planogram row on the
/// resolved shelf.
pub fn cluster_report(
    detections: &[Detection],
    reference: &[ReferenceEntry],
    params: &EngineParams,
) -> Result<ClusterReport, ClassifyError> {
    let index = ReferenceIndex::new(reference);
    let resolution = shelf::resolve_shelf(detections, &index)?;
    let shelf_index = ShelfIndex::new(&resolution.expected);
    let clusters = tray_cluster::cluster_trays(detections, params)?;

    let rows = detections
        .iter()
        .zip(&clusters.labels)
        .map(|(d, &tray_cluster)| {
            let entry = shelf_index.get(&normalize_key(&d.label));
            ClusterRow {
                name: d.label.clone(),
                bbox: d.bbox,
                tray_cluster,
                product_id: entry.map(|e| e.product_id.clone()),
                tray: entry.map(|e| e.tray),
                position: entry.map(|e| e.position),
            }
        })
        .collect();

    Ok(ClusterReport {
        shelf: resolution.shelf.to_string(),
        rows,
        bands: clusters.bands,
    })
}
