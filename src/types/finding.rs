//! Finding types: FindingCategory, Finding, AlertView

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::BoundingBox;

/// Display string for a correctly placed product.
pub const ALERT_CORRECT: &str = "Producto correcto";
/// Display string for an expected product that was not detected.
pub const ALERT_MISSING: &str = "Producto faltante";
/// Display string for every misplacement category.
pub const ALERT_MISPLACED: &str = "Producto mal acomodado";

/// Compliance category of a finding.
///
/// Declaration order matches the order categories appear in engine output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FindingCategory {
    WrongShelf,
    Missing,
    WrongTray,
    WrongPosition,
    Correct,
}

impl FindingCategory {
    /// User-facing alert text.
    pub const fn alert(self) -> &'static str {
        match self {
            Self::Correct => ALERT_CORRECT,
            Self::Missing => ALERT_MISSING,
            Self::WrongShelf | Self::WrongTray | Self::WrongPosition => ALERT_MISPLACED,
        }
    }
}

impl std::fmt::Display for FindingCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::WrongShelf => write!(f, "WRONG_SHELF"),
            Self::Missing => write!(f, "MISSING"),
            Self::WrongTray => write!(f, "WRONG_TRAY"),
            Self::WrongPosition => write!(f, "WRONG_POSITION"),
            Self::Correct => write!(f, "CORRECT"),
        }
    }
}

/// One classified compliance result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    /// Reference product id, `None` when the name is not in the planogram
    pub id: Option<String>,
    pub name: String,
    /// Detection box; `None` for missing products (serialized as `[]`)
    #[serde(with = "bbox_or_empty", default)]
    pub bbox: Option<BoundingBox>,
    pub category: FindingCategory,
}

impl Finding {
    pub fn detected(
        id: Option<String>,
        name: impl Into<String>,
        bbox: BoundingBox,
        category: FindingCategory,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            bbox: Some(bbox),
            category,
        }
    }

    pub fn missing(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            name: name.into(),
            bbox: None,
            category: FindingCategory::Missing,
        }
    }
}

mod bbox_or_empty {
    use super::{BoundingBox, Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(bbox: &Option<BoundingBox>, s: S) -> Result<S::Ok, S::Error> {
        let v: Vec<f64> = bbox.map(|b| b.to_array().to_vec()).unwrap_or_default();
        v.serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<BoundingBox>, D::Error> {
        let v = Vec::<f64>::deserialize(d)?;
        match v.len() {
            0 => Ok(None),
            4 => Ok(Some(BoundingBox::new(v[0], v[1], v[2], v[3]))),
            n => Err(serde::de::Error::invalid_length(n, &"an empty or 4-element array")),
        }
    }
}

// ============================================================================
// Presentation
// ============================================================================

/// A finding as delivered to the shelf dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertView {
    /// Sequential display id, starting at 1
    pub id: usize,
    pub nombre: String,
    /// `[x1, y1, x2, y2]`, or empty for missing products
    pub bbox: Vec<f64>,
    pub alerta: String,
}

/// Convert engine output into display alerts, keeping engine order.
pub fn to_alerts(findings: &[Finding]) -> Vec<AlertView> {
    findings
        .iter()
        .enumerate()
        .map(|(i, f)| AlertView {
            id: i + 1,
            nombre: f.name.clone(),
            bbox: f.bbox.map(|b| b.to_array().to_vec()).unwrap_or_default(),
            alerta: f.category.alert().to_string(),
        })
        .collect()
}
