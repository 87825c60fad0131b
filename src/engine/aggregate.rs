//! Finding aggregation in fixed category order.

use std::collections::HashSet;

use super::index::{ReferenceIndex, ShelfIndex};
use super::presence::Presence;
use crate::types::{normalize_key, Detection, Finding, FindingCategory};

/// Merge stage outputs into one list:
/// WRONG_SHELF, MISSING, WRONG_TRAY, WRONG_POSITION, CORRECT.
///
/// A detection is CORRECT when it is on the resolved shelf, its name is not
/// among the missing products, and no misplacement finding carries the same
/// `(name, bbox)` pair.
pub fn aggregate(
    detections: &[Detection],
    presence: Presence,
    wrong_tray: Vec<Finding>,
    wrong_position: Vec<Finding>,
    shelf_index: &ShelfIndex<'_>,
    index: &ReferenceIndex<'_>,
) -> Vec<Finding> {
    let correct: Vec<Finding> = {
        let flagged: HashSet<(&str, [u64; 4])> = presence
            .wrong_shelf
            .iter()
            .chain(&wrong_tray)
            .chain(&wrong_position)
            .filter_map(|f| f.bbox.map(|b| (f.name.as_str(), b.bits())))
            .collect();

        detections
            .iter()
            .enumerate()
            .filter(|(i, _)| presence.is_on_shelf(*i))
            .filter_map(|(_, d)| {
                let key = normalize_key(&d.label);
                if presence.missing_keys.contains(&key)
                    || flagged.contains(&(d.label.as_str(), d.bbox.bits()))
                {
                    return None;
                }
                let id = shelf_index
                    .get(&key)
                    .or_else(|| index.get(&key))
                    .map(|e| e.product_id.clone());
                Some(Finding::detected(id, d.label.clone(), d.bbox, FindingCategory::Correct))
            })
            .collect()
    };

    let Presence {
        wrong_shelf,
        missing,
        ..
    } = presence;

    let mut findings = Vec::with_capacity(
        wrong_shelf.len() + missing.len() + wrong_tray.len() + wrong_position.len() + correct.len(),
    );
    findings.extend(wrong_shelf);
    findings.extend(missing);
    findings.extend(wrong_tray);
    findings.extend(wrong_position);
    findings.extend(correct);
    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BoundingBox, ReferenceEntry};

    #[test]
    fn test_order_and_correct_set() {
        let table = vec![
            ReferenceEntry::new("1", "A", "S1", 1, 1),
            ReferenceEntry::new("2", "B", "S1", 1, 2),
            ReferenceEntry::new("3", "C", "S1", 1, 3),
        ];
        let index = ReferenceIndex::new(&table);
        let shelf_index = ShelfIndex::new(index.shelf("S1"));

        let box_a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let box_b = BoundingBox::new(20.0, 0.0, 30.0, 10.0);
        let box_x = BoundingBox::new(40.0, 0.0, 50.0, 10.0);
        let detections = vec![
            Detection::new("A", box_a, 0.9),
            Detection::new("B", box_b, 0.9),
            Detection::new("X", box_x, 0.9),
        ];

        let presence = Presence {
            on_shelf: vec![0, 1],
            wrong_shelf: vec![Finding::detected(None, "X", box_x, FindingCategory::WrongShelf)],
            missing: vec![Finding::missing("3", "C")],
            missing_keys: ["c".to_string()].into_iter().collect(),
        };
        let wrong_tray = vec![Finding::detected(Some("2".into()), "B", box_b, FindingCategory::WrongTray)];

        let findings = aggregate(&detections, presence, wrong_tray, Vec::new(), &shelf_index, &index);
        let cats: Vec<FindingCategory> = findings.iter().map(|f| f.category).collect();
        assert_eq!(
            cats,
            vec![
                FindingCategory::WrongShelf,
                FindingCategory::Missing,
                FindingCategory::WrongTray,
                FindingCategory::Correct,
            ]
        );
        assert_eq!(findings[3].name, "A");
        assert_eq!(findings[3].id.as_deref(), Some("1"));
        assert_eq!(findings[3].bbox, Some(box_a));
    }
}
