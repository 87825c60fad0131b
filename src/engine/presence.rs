//! Presence classification: on-shelf vs wrong-shelf detections, and the
//! expected products nobody detected.

use std::collections::HashSet;

use super::index::{ReferenceIndex, ShelfIndex};
use crate::types::{normalize_key, Detection, Finding, FindingCategory, ReferenceEntry};

/// Output of the presence stage.
#[derive(Debug, Clone, Default)]
pub struct Presence {
    /// Indices of detections whose name belongs to the resolved shelf
    pub on_shelf: Vec<usize>,
    /// One WRONG_SHELF finding per off-shelf detection, in detection order
    pub wrong_shelf: Vec<Finding>,
    /// One MISSING finding per undetected expected entry, in table order
    pub missing: Vec<Finding>,
    /// Normalized names of the missing entries
    pub missing_keys: HashSet<String>,
}

impl Presence {
    pub fn is_on_shelf(&self, detection: usize) -> bool {
        self.on_shelf.binary_search(&detection).is_ok()
    }
}

pub fn classify_presence(
    detections: &[Detection],
    expected: &[&ReferenceEntry],
    shelf_index: &ShelfIndex<'_>,
    index: &ReferenceIndex<'_>,
) -> Presence {
    let mut presence = Presence::default();
    let mut detected_keys: HashSet<String> = HashSet::with_capacity(detections.len());

    for (i, detection) in detections.iter().enumerate() {
        let key = normalize_key(&detection.label);
        if shelf_index.contains(&key) {
            presence.on_shelf.push(i);
        } else {
            presence.wrong_shelf.push(Finding::detected(
                index.get(&key).map(|e| e.product_id.clone()),
                detection.label.clone(),
                detection.bbox,
                FindingCategory::WrongShelf,
            ));
        }
        detected_keys.insert(key);
    }

    for entry in expected {
        let key = entry.key();
        if !detected_keys.contains(&key) {
            presence
                .missing
                .push(Finding::missing(entry.product_id.clone(), entry.name.clone()));
            presence.missing_keys.insert(key);
        }
    }

    presence
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BoundingBox;

    fn det(label: &str, x: f64) -> Detection {
        Detection::new(label, BoundingBox::new(x, 0.0, x + 10.0, 10.0), 0.9)
    }

    #[test]
    fn test_split_and_missing() {
        let table = vec![
            ReferenceEntry::new("1", "A", "S1", 1, 1),
            ReferenceEntry::new("2", "B", "S1", 1, 2),
            ReferenceEntry::new("3", "C", "S2", 1, 1),
        ];
        let index = ReferenceIndex::new(&table);
        let expected = index.shelf("S1").to_vec();
        let shelf_index = ShelfIndex::new(&expected);

        let detections = vec![det(" a ", 0.0), det("C", 20.0), det("Mystery", 40.0)];
        let presence = classify_presence(&detections, &expected, &shelf_index, &index);

        assert_eq!(presence.on_shelf, vec![0]);
        assert!(presence.is_on_shelf(0));
        assert!(!presence.is_on_shelf(1));

        assert_eq!(presence.wrong_shelf.len(), 2);
        assert_eq!(presence.wrong_shelf[0].name, "C");
        assert_eq!(presence.wrong_shelf[0].id.as_deref(), Some("3"));
        assert_eq!(presence.wrong_shelf[0].bbox, Some(detections[1].bbox));
        assert_eq!(presence.wrong_shelf[1].id, None);

        assert_eq!(presence.missing.len(), 1);
        assert_eq!(presence.missing[0].name, "B");
        assert_eq!(presence.missing[0].id.as_deref(), Some("2"));
        assert!(presence.missing[0].bbox.is_none());
        assert!(presence.missing_keys.contains("b"));
    }
}
