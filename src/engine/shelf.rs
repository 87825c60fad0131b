//! Shelf resolution: which planogram shelf the photograph depicts.

use tracing::debug;

use super::index::ReferenceIndex;
use super::ClassifyError;
use crate::types::{Detection, ReferenceEntry};

/// The shelf picked by majority vote and its expected entries.
#[derive(Debug, Clone)]
pub struct ShelfResolution<'a> {
    pub shelf: &'a str,
    /// Number of detections that voted for `shelf`
    pub votes: usize,
    /// Entries of the resolved shelf, in table order
    pub expected: Vec<&'a ReferenceEntry>,
}

/// Majority vote over the shelves of every detection that matches the planogram.
///
/// Ties go to the shelf first seen while scanning detections in input order.
/// Fails with [`ClassifyError::EmptyResolution`] when nothing matches.
pub fn resolve_shelf<'a>(
    detections: &[Detection],
    index: &ReferenceIndex<'a>,
) -> Result<ShelfResolution<'a>, ClassifyError> {
    // (shelf, count) in first-seen order
    let mut tally: Vec<(&'a str, usize)> = Vec::new();

    for detection in detections {
        let Some(entry) = index.lookup(&detection.label) else {
            continue;
        };
        let shelf = entry.shelf.as_str();
        match tally.iter_mut().find(|(s, _)| *s == shelf) {
            Some((_, count)) => *count += 1,
            None => tally.push((shelf, 1)),
        }
    }

    let mut best: Option<(&'a str, usize)> = None;
    for &(shelf, count) in &tally {
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((shelf, count));
        }
    }

    let (shelf, votes) = best.ok_or(ClassifyError::EmptyResolution)?;
    debug!(shelf, votes, candidates = tally.len(), "Resolved shelf");

    Ok(ShelfResolution {
        shelf,
        votes,
        expected: index.shelf(shelf).to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BoundingBox;

    fn det(label: &str) -> Detection {
        Detection::new(label, BoundingBox::new(0.0, 0.0, 1.0, 1.0), 0.9)
    }

    fn table() -> Vec<ReferenceEntry> {
        vec![
            ReferenceEntry::new("1", "A", "S1", 1, 1),
            ReferenceEntry::new("2", "B", "S1", 1, 2),
            ReferenceEntry::new("3", "C", "S2", 1, 1),
            ReferenceEntry::new("4", "D", "S2", 2, 1),
        ]
    }

    #[test]
    fn test_majority_wins() {
        let table = table();
        let index = ReferenceIndex::new(&table);
        let detections = vec![det("c"), det("A"), det("B"), det("unknown")];

        let res = resolve_shelf(&detections, &index).unwrap();
        assert_eq!(res.shelf, "S1");
        assert_eq!(res.votes, 2);
        assert_eq!(res.expected.len(), 2);
    }

    #[test]
    fn test_tie_goes_to_first_seen_shelf() {
        let table = table();
        let index = ReferenceIndex::new(&table);

        let res = resolve_shelf(&[det("C"), det("A"), det("B"), det("D")], &index).unwrap();
        assert_eq!(res.shelf, "S2");

        let res = resolve_shelf(&[det("A"), det("C"), det("D"), det("B")], &index).unwrap();
        assert_eq!(res.shelf, "S1");
    }

    #[test]
    fn test_no_match_is_empty_resolution() {
        let table = table();
        let index = ReferenceIndex::new(&table);
        let detections = vec![det("x"), det("y"), det("z"), det("w")];

        let err = resolve_shelf(&detections, &index).unwrap_err();
        assert!(matches!(err, ClassifyError::EmptyResolution));
    }
}
