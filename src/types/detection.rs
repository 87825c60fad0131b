//! Detection types: BoundingBox, Detection

use serde::{Deserialize, Serialize};

// ============================================================================
// Bounding Box
// ============================================================================

/// Axis-aligned box in pixel coordinates, `x1 < x2` and `y1 < y2`.
///
/// Serialized as an ordered `[x1, y1, x2, y2]` array.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct BoundingBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl BoundingBox {
    pub const fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Build a box from a center point and its size.
    pub fn from_center(cx: f64, cy: f64, width: f64, height: f64) -> Self {
        Self {
            x1: cx - width / 2.0,
            y1: cy - height / 2.0,
            x2: cx + width / 2.0,
            y2: cy + height / 2.0,
        }
    }

    pub fn center_x(&self) -> f64 {
        (self.x1 + self.x2) / 2.0
    }

    pub fn center_y(&self) -> f64 {
        (self.y1 + self.y2) / 2.0
    }

    /// Whether all coordinates are finite and the corners are ordered.
    pub fn is_well_formed(&self) -> bool {
        self.to_array().iter().all(|v| v.is_finite()) && self.x1 < self.x2 && self.y1 < self.y2
    }

    pub const fn to_array(self) -> [f64; 4] {
        [self.x1, self.y1, self.x2, self.y2]
    }

    /// Bit-exact identity key, used to match a detection against findings.
    pub fn bits(&self) -> [u64; 4] {
        self.to_array().map(f64::to_bits)
    }
}

impl From<[f64; 4]> for BoundingBox {
    fn from(v: [f64; 4]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }
}

impl From<BoundingBox> for [f64; 4] {
    fn from(b: BoundingBox) -> Self {
        b.to_array()
    }
}

// ============================================================================
// Detection
// ============================================================================

/// One item reported by the detection provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Product label as emitted by the detector
    pub label: String,
    pub bbox: BoundingBox,
    /// Detector confidence in [0, 1]
    #[serde(default)]
    pub confidence: f64,
}

impl Detection {
    pub fn new(label: impl Into<String>, bbox: BoundingBox, confidence: f64) -> Self {
        Self {
            label: label.into(),
            bbox,
            confidence,
        }
    }
}
