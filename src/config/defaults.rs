//! System-wide default constants.
//!
//! Grouped by subsystem for easy discovery.

// ============================================================================
// Tray Clustering
// ============================================================================

/// Number of physical trays per shelf, and therefore the k of the clustering.
pub const TRAY_COUNT: usize = 4;

/// Multiplier applied to the vertical center before clustering.
///
/// Trays are stacked vertically, so vertical separation has to dominate the
/// distance metric over horizontal spread within a tray.
pub const DEFAULT_VERTICAL_SCALE: f64 = 100.0;

/// Seed for k-means initialisation. Same seed, same tray labels.
pub const DEFAULT_KMEANS_SEED: u64 = 42;

/// Number of seeded k-means restarts; the lowest-inertia run wins.
pub const DEFAULT_KMEANS_RESTARTS: usize = 10;

/// Lloyd iteration cap per restart.
pub const DEFAULT_KMEANS_MAX_ITERATIONS: usize = 300;

/// Convergence threshold on total centroid movement (feature-space units).
pub const DEFAULT_KMEANS_TOLERANCE: f64 = 1e-4;

/// Squared distance under which two feature points count as the same point.
pub const DISTINCT_POINT_EPSILON_SQ: f64 = 1e-12;

// ============================================================================
// Detection Provider
// ============================================================================

/// Default inference endpoint.
pub const DEFAULT_PROVIDER_URL: &str = "https://detect.roboflow.com";

/// Default minimum detector confidence.
pub const DEFAULT_CONFIDENCE: f64 = 0.04;

/// HTTP timeout for a single detection request (seconds).
pub const PROVIDER_TIMEOUT_SECS: u64 = 30;

// ============================================================================
// Server
// ============================================================================

/// Default bind address.
pub const DEFAULT_SERVER_ADDR: &str = "0.0.0.0:5000";

/// Largest accepted upload body (bytes). Shelf photos from phones run 3-12 MB.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Default planogram location, relative to the working directory.
pub const DEFAULT_REFERENCE_PATH: &str = "locations.csv";
