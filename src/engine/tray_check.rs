//! Tray conformance: clustered tray vs planogram tray.

use super::index::{ReferenceIndex, ShelfIndex};
use crate::types::{normalize_key, Detection, Finding, FindingCategory, ReferenceEntry};

/// A detection sitting in its planogram tray, ready for the position check.
#[derive(Debug, Clone, Copy)]
pub struct Placed<'a> {
    /// Index into the detection list
    pub detection: usize,
    pub tray: u32,
    pub entry: &'a ReferenceEntry,
}

#[derive(Debug, Clone, Default)]
pub struct TrayCheck<'a> {
    pub wrong_tray: Vec<Finding>,
    pub placed: Vec<Placed<'a>>,
}

/// Compare each candidate's clustered tray against the resolved shelf's
/// planogram. A candidate with no entry on the shelf has no reference tray
/// and never conforms.
pub fn check_trays<'a>(
    candidates: &[usize],
    detections: &[Detection],
    tray_labels: &[u32],
    shelf_index: &ShelfIndex<'a>,
    index: &ReferenceIndex<'a>,
) -> TrayCheck<'a> {
    let mut check = TrayCheck::default();

    for &i in candidates {
        let detection = &detections[i];
        let key = normalize_key(&detection.label);
        let clustered = tray_labels[i];

        match shelf_index.get(&key) {
            Some(entry) if entry.tray == clustered => check.placed.push(Placed {
                detection: i,
                tray: clustered,
                entry,
            }),
            on_shelf => {
                let id = on_shelf
                    .or_else(|| index.get(&key))
                    .map(|e| e.product_id.clone());
                check.wrong_tray.push(Finding::detected(
                    id,
                    detection.label.clone(),
                    detection.bbox,
                    FindingCategory::WrongTray,
                ));
            }
        }
    }

    check
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BoundingBox;

    #[test]
    fn test_conforming_and_wrong_tray() {
        let table = vec![
            ReferenceEntry::new("1", "A", "S1", 1, 1),
            ReferenceEntry::new("2", "B", "S1", 2, 1),
            ReferenceEntry::new("3", "C", "S2", 3, 1),
        ];
        let index = ReferenceIndex::new(&table);
        let shelf_index = ShelfIndex::new(index.shelf("S1"));

        let bbox = BoundingBox::new(0.0, 0.0, 1.0, 1.0);
        let detections = vec![
            Detection::new("A", bbox, 0.9),
            Detection::new("b", bbox, 0.9),
            Detection::new("C", bbox, 0.9),
            Detection::new("Nope", bbox, 0.9),
        ];
        let labels = vec![1, 3, 3, 2];

        let check = check_trays(&[0, 1, 2, 3], &detections, &labels, &shelf_index, &index);

        assert_eq!(check.placed.len(), 1);
        assert_eq!(check.placed[0].detection, 0);
        assert_eq!(check.placed[0].tray, 1);

        let names: Vec<&str> = check.wrong_tray.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["b", "C", "Nope"]);
        assert_eq!(check.wrong_tray[0].id.as_deref(), Some("2"));
        // Off-shelf name: no tray on this shelf even though tray numbers agree,
        // id still resolved from the full table
        assert_eq!(check.wrong_tray[1].id.as_deref(), Some("3"));
        assert_eq!(check.wrong_tray[2].id, None);
    }
}
