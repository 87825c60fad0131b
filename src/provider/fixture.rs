//! Fixed-list provider for offline runs and tests.

use async_trait::async_trait;
use std::path::Path;

use super::{DetectionProvider, ProviderError};
use crate::types::Detection;

/// Serves the same detections for every image.
#[derive(Debug, Clone, Default)]
pub struct FixtureProvider {
    detections: Vec<Detection>,
}

impl FixtureProvider {
    pub fn new(detections: Vec<Detection>) -> Self {
        Self { detections }
    }

    /// Read a JSON array of detections.
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let detections: Vec<Detection> = serde_json::from_str(&contents)?;
        Ok(Self::new(detections))
    }

    pub fn len(&self) -> usize {
        self.detections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }
}

#[async_trait]
impl DetectionProvider for FixtureProvider {
    async fn detect(&self, _image: &[u8], confidence: f64) -> Result<Vec<Detection>, ProviderError> {
        Ok(self
            .detections
            .iter()
            .filter(|d| d.confidence >= confidence)
            .cloned()
            .collect())
    }

    fn name(&self) -> &str {
        "fixture"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BoundingBox;
    use std::io::Write;

    #[tokio::test]
    async fn test_filters_by_confidence() {
        let bbox = BoundingBox::new(0.0, 0.0, 1.0, 1.0);
        let provider = FixtureProvider::new(vec![
            Detection::new("A", bbox, 0.9),
            Detection::new("B", bbox, 0.03),
            Detection::new("C", bbox, 0.04),
        ]);

        let found = provider.detect(b"", 0.04).await.unwrap();
        let labels: Vec<&str> = found.iter().map(|d| d.label.as_str()).collect();
        assert_eq!(labels, vec!["A", "C"]);
    }

    #[test]
    fn test_from_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"label": "Jabon", "bbox": [1, 2, 3, 4], "confidence": 0.5}}]"#
        )
        .unwrap();

        let provider = FixtureProvider::from_json_file(file.path()).unwrap();
        assert_eq!(provider.len(), 1);
        assert!(!provider.is_empty());
        assert!(FixtureProvider::default().is_empty());
    }
}
