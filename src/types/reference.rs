//! Planogram reference types

use serde::{Deserialize, Serialize};

/// Normalize a product name or detector label into the join key shared by
/// detections and reference entries: surrounding whitespace trimmed, lowercased.
pub fn normalize_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// One row of the planogram: where a product is expected to sit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceEntry {
    pub product_id: String,
    pub name: String,
    pub shelf: String,
    /// Tray (shelf level), numbered from the bottom
    pub tray: u32,
    /// 1-based slot within the tray, left to right
    pub position: u32,
}

impl ReferenceEntry {
    pub fn new(
        product_id: impl Into<String>,
        name: impl Into<String>,
        shelf: impl Into<String>,
        tray: u32,
        position: u32,
    ) -> Self {
        Self {
            product_id: product_id.into(),
            name: name.into(),
            shelf: shelf.into(),
            tray,
            position,
        }
    }

    pub fn key(&self) -> String {
        normalize_key(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_key_ignores_case_and_padding() {
        assert_eq!(normalize_key("  Shampoo KleenBebe 250ml "), "shampoo kleenbebe 250ml");
        assert_eq!(normalize_key("ABC"), normalize_key("abc\t"));
    }
}
