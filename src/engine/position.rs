//! Position segmentation: collapse runs of the same product into facings and
//! compare the facing order in each tray with the planogram slots.

use tracing::debug;

use super::tray_check::Placed;
use crate::types::{normalize_key, BoundingBox, Detection, Finding, FindingCategory, ReferenceEntry};

/// A maximal left-to-right run of one product within a tray.
#[derive(Debug, Clone)]
pub struct Block<'a> {
    /// Label of the first member
    pub name: String,
    key: String,
    /// Box of the first member
    pub bbox: BoundingBox,
    pub entry: &'a ReferenceEntry,
    pub center_xs: Vec<f64>,
}

impl Block<'_> {
    pub fn mean_center_x(&self) -> f64 {
        self.center_xs.iter().sum::<f64>() / self.center_xs.len().max(1) as f64
    }

    pub fn len(&self) -> usize {
        self.center_xs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.center_xs.is_empty()
    }
}

/// Build the blocks of one tray, ordered by mean horizontal center.
pub fn segment_blocks<'a>(members: &[Placed<'a>], detections: &[Detection]) -> Vec<Block<'a>> {
    let mut ordered: Vec<(f64, &Placed<'a>)> = members
        .iter()
        .map(|p| (detections[p.detection].bbox.center_x(), p))
        .collect();
    ordered.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut blocks: Vec<Block<'a>> = Vec::new();
    for (center_x, placed) in ordered {
        let detection = &detections[placed.detection];
        let key = normalize_key(&detection.label);

        match blocks.last_mut() {
            Some(block) if block.key == key => block.center_xs.push(center_x),
            _ => blocks.push(Block {
                name: detection.label.clone(),
                key,
                bbox: detection.bbox,
                entry: placed.entry,
                center_xs: vec![center_x],
            }),
        }
    }

    blocks.sort_by(|a, b| a.mean_center_x().total_cmp(&b.mean_center_x()));
    blocks
}

/// WRONG_POSITION findings for every block whose observed rank differs from
/// its planogram slot. Trays are visited in the order they first appear.
pub fn check_positions(placed: &[Placed<'_>], detections: &[Detection]) -> Vec<Finding> {
    let mut trays: Vec<u32> = Vec::new();
    for p in placed {
        if !trays.contains(&p.tray) {
            trays.push(p.tray);
        }
    }

    let mut findings = Vec::new();
    for tray in trays {
        let members: Vec<Placed<'_>> = placed.iter().filter(|p| p.tray == tray).copied().collect();
        let blocks = segment_blocks(&members, detections);
        debug!(tray, members = members.len(), blocks = blocks.len(), "Segmented tray");

        for (rank, block) in blocks.into_iter().enumerate() {
            let observed = rank as u32 + 1;
            if observed != block.entry.position {
                findings.push(Finding::detected(
                    Some(block.entry.product_id.clone()),
                    block.name,
                    block.bbox,
                    FindingCategory::WrongPosition,
                ));
            }
        }
    }

    findings
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(label: &str, cx: f64) -> Detection {
        Detection::new(label, BoundingBox::from_center(cx, 100.0, 20.0, 40.0), 0.9)
    }

    fn placed<'a>(detection: usize, entry: &'a ReferenceEntry) -> Placed<'a> {
        Placed {
            detection,
            tray: entry.tray,
            entry,
        }
    }

    #[test]
    fn test_runs_collapse_into_one_block() {
        let a = ReferenceEntry::new("1", "A", "S1", 1, 1);
        let b = ReferenceEntry::new("2", "B", "S1", 1, 2);
        // Input order scrambled; sorted by x: A A A B B
        let detections = vec![det("B", 400.0), det("A", 10.0), det("a ", 200.0), det("A", 90.0), det("B", 500.0)];
        let members = vec![
            placed(0, &b),
            placed(1, &a),
            placed(2, &a),
            placed(3, &a),
            placed(4, &b),
        ];

        let blocks = segment_blocks(&members, &detections);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].name, "A");
        assert_eq!(blocks[0].len(), 3);
        // Representative box is the leftmost member's
        assert_eq!(blocks[0].bbox, detections[1].bbox);

        let mean = blocks[0].mean_center_x();
        assert!(mean > 10.0 && mean < 200.0);
        assert!((mean - 100.0).abs() < 1e-9);
        assert!((blocks[1].mean_center_x() - 450.0).abs() < 1e-9);
    }

    #[test]
    fn test_interleaved_product_makes_separate_blocks() {
        let a = ReferenceEntry::new("1", "A", "S1", 1, 1);
        let b = ReferenceEntry::new("2", "B", "S1", 1, 2);
        let detections = vec![det("A", 0.0), det("B", 50.0), det("A", 100.0)];
        let members = vec![placed(0, &a), placed(1, &b), placed(2, &a)];

        let blocks = segment_blocks(&members, &detections);
        let names: Vec<&str> = blocks.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "A"]);
    }

    #[test]
    fn test_swapped_products_flagged() {
        let a = ReferenceEntry::new("1", "A", "S1", 1, 1);
        let b = ReferenceEntry::new("2", "B", "S1", 1, 2);
        let c = ReferenceEntry::new("3", "C", "S1", 1, 3);
        // Observed order: B, A, C
        let detections = vec![det("A", 200.0), det("B", 50.0), det("C", 400.0)];
        let members = vec![placed(0, &a), placed(1, &b), placed(2, &c)];

        let findings = check_positions(&members, &detections);
        let names: Vec<&str> = findings.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["B", "A"]);
        assert!(findings.iter().all(|f| f.category == FindingCategory::WrongPosition));
        assert_eq!(findings[0].id.as_deref(), Some("2"));
    }

    #[test]
    fn test_multi_facing_block_counts_as_one_slot() {
        let a = ReferenceEntry::new("1", "A", "S1", 2, 1);
        let b = ReferenceEntry::new("2", "B", "S1", 2, 2);
        let detections = vec![det("A", 0.0), det("A", 30.0), det("A", 60.0), det("B", 90.0)];
        let members = vec![placed(0, &a), placed(1, &a), placed(2, &a), placed(3, &b)];

        assert!(check_positions(&members, &detections).is_empty());
    }

    #[test]
    fn test_trays_checked_independently() {
        let a = ReferenceEntry::new("1", "A", "S1", 1, 1);
        let b = ReferenceEntry::new("2", "B", "S1", 2, 1);
        let detections = vec![det("A", 500.0), det("B", 10.0)];
        let members = vec![placed(0, &a), placed(1, &b)];

        assert!(check_positions(&members, &detections).is_empty());
    }
}
