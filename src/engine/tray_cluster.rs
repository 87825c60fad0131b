//! Tray clustering: group detections into horizontal bands by vertical
//! position and number the bands from the bottom of the shelf.

use serde::Serialize;
use tracing::debug;

use super::kmeans::{count_distinct_up_to, KMeans, Point};
use super::{ClassifyError, EngineParams};
use crate::config::defaults::TRAY_COUNT;
use crate::types::Detection;

/// One horizontal band found in the photograph.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrayBand {
    /// Tray number, `TRAY_COUNT` for the topmost band down to 1
    pub tray: u32,
    /// Mean unscaled vertical center of the members (pixels)
    pub mean_center_y: f64,
    pub members: usize,
}

/// Tray assignment for every detection of the photograph.
#[derive(Debug, Clone, PartialEq)]
pub struct TrayClusters {
    /// Tray number per detection, same order as the input
    pub labels: Vec<u32>,
    /// Bands from top of the image to bottom
    pub bands: Vec<TrayBand>,
}

/// Clustering features: horizontal center, and vertical center scaled up so
/// vertical separation dominates the distance.
pub fn features(detections: &[Detection], vertical_scale: f64) -> Vec<Point> {
    detections
        .iter()
        .map(|d| [d.bbox.center_x(), d.bbox.center_y() * vertical_scale])
        .collect()
}

/// Cluster every detection into `TRAY_COUNT` bands.
///
/// The band with the smallest mean vertical center (top of the image) is
/// tray `TRAY_COUNT`; each band below it gets the next lower number.
pub fn cluster_trays(
    detections: &[Detection],
    params: &EngineParams,
) -> Result<TrayClusters, ClassifyError> {
    let points = features(detections, params.vertical_scale);

    let kmeans = KMeans {
        k: TRAY_COUNT,
        seed: params.seed,
        n_init: params.n_init,
        max_iterations: params.max_iterations,
        tolerance: params.tolerance,
    };
    let fit = kmeans.fit(&points).ok_or_else(|| ClassifyError::InsufficientDetections {
        distinct: count_distinct_up_to(&points, TRAY_COUNT),
        required: TRAY_COUNT,
    })?;

    // (cluster, mean unscaled cy, members)
    let mut order: Vec<(usize, f64, usize)> = (0..TRAY_COUNT)
        .map(|c| {
            let (sum, n) = fit
                .members(c)
                .fold((0.0, 0usize), |(s, n), i| (s + detections[i].bbox.center_y(), n + 1));
            (c, sum / n.max(1) as f64, n)
        })
        .collect();
    order.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));

    let mut tray_of_cluster = [0u32; TRAY_COUNT];
    let mut bands = Vec::with_capacity(TRAY_COUNT);
    for (rank, &(cluster, mean_center_y, members)) in order.iter().enumerate() {
        let tray = (TRAY_COUNT - rank) as u32;
        tray_of_cluster[cluster] = tray;
        bands.push(TrayBand {
            tray,
            mean_center_y,
            members,
        });
    }

    debug!(
        inertia = fit.inertia,
        bands = ?bands.iter().map(|b| (b.tray, b.mean_center_y, b.members)).collect::<Vec<_>>(),
        "Tray clustering complete"
    );

    Ok(TrayClusters {
        labels: fit.labels.iter().map(|&c| tray_of_cluster[c]).collect(),
        bands,
    })
}
