use kdtree::KdTree;
use kdtree::distance::squared_euclidean;

use crate::{HachureId, HachureSet, Point};

/// Where a candidate crossing might be: one segment of one part of one
/// hachure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SegmentRef {
    pub hachure: HachureId,
    pub part: usize,
    pub segment: usize,
}

/// A k-d tree over the midpoints of every hachure segment, rebuilt once per
/// contour. Intersecting each contour ring against the whole live set is
/// the dominant cost of a run; the tree narrows each ring segment down to
/// the handful of hachure segments whose midpoints are near enough to
/// possibly cross it.
pub struct HachureIndex {
    tree: KdTree<f64, SegmentRef, [f64; 2]>,
    max_half_length: f64,
    len: usize,
}

impl HachureIndex {
    #[must_use]
    pub fn build(set: &HachureSet) -> Self {
        let mut tree = KdTree::new(2);
        let mut max_half_length = 0.0_f64;
        let mut len = 0;

        for hachure in set.iter() {
            for (part_idx, part) in hachure.parts.iter().enumerate() {
                for (seg_idx, w) in part.points().windows(2).enumerate() {
                    let mid = w[0].lerp(&w[1], 0.5);
                    if !mid.x().is_finite() || !mid.y().is_finite() {
                        continue;
                    }
                    max_half_length = max_half_length.max(w[0].distance(&w[1]) / 2.0);
                    let entry = SegmentRef {
                        hachure: hachure.id,
                        part: part_idx,
                        segment: seg_idx,
                    };
                    if tree.add([mid.x(), mid.y()], entry).is_ok() {
                        len += 1;
                    }
                }
            }
        }

        Self {
            tree,
            max_half_length,
            len,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Hachure segments that could intersect the segment `a..b`, in a
    /// deterministic order.
    #[must_use]
    pub fn candidates(&self, a: Point, b: Point) -> Vec<SegmentRef> {
        if self.len == 0 {
            return Vec::new();
        }

        let mid = a.lerp(&b, 0.5);
        let reach = a.distance(&b) / 2.0 + self.max_half_length + 1e-9;

        let Ok(found) = self
            .tree
            .within(&[mid.x(), mid.y()], reach * reach, &squared_euclidean)
        else {
            return Vec::new();
        };

        let mut refs: Vec<SegmentRef> = found.into_iter().map(|(_, r)| *r).collect();
        refs.sort_unstable();
        refs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Polyline;

    fn set_with_vertical_lines() -> HachureSet {
        let mut set = HachureSet::default();
        for x in [10.0, 20.0, 30.0] {
            set.insert(
                Polyline::from_iter([(x, 0.0), (x, 5.0), (x, 10.0)]),
                Point::new(x, 0.0),
            );
        }
        set
    }

    #[test]
    fn test_candidates_near_segment() {
        let set = set_with_vertical_lines();
        let index = HachureIndex::build(&set);

        // a horizontal segment crossing only the line at x = 10
        let refs = index.candidates(Point::new(8.0, 4.0), Point::new(12.0, 4.0));
        assert!(!refs.is_empty());
        assert!(refs.iter().all(|r| r.hachure == 0));
    }

    #[test]
    fn test_candidates_cover_all_crossed_lines() {
        let set = set_with_vertical_lines();
        let index = HachureIndex::build(&set);

        let refs = index.candidates(Point::new(0.0, 4.0), Point::new(40.0, 4.0));
        let mut ids: Vec<HachureId> = refs.iter().map(|r| r.hachure).collect();
        ids.dedup();
        assert_eq!(ids, vec![0, 1, 2]);
    }

    #[test]
    fn test_candidates_sorted_and_deterministic() {
        let set = set_with_vertical_lines();
        let index = HachureIndex::build(&set);

        let a = Point::new(0.0, 4.0);
        let b = Point::new(40.0, 4.0);
        let first = index.candidates(a, b);
        let second = index.candidates(a, b);
        assert_eq!(first, second);
        assert!(first.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_empty_set() {
        let index = HachureIndex::build(&HachureSet::default());
        assert!(index.is_empty());
        assert!(index
            .candidates(Point::new(0.0, 0.0), Point::new(1.0, 1.0))
            .is_empty());
    }
}
