//! Min tree tracking the smallest priority.
use super::OrderStatTree;
use segment_tree::{ops::MinIgnoreNaN, SegmentPoint};

/// Segment tree reducing its leaves with `min`.
///
/// Leaves start at `+inf`, the identity of `min`, so unused leaves never
/// affect [`MinTree::minimum`]. The minimum over all leaves is refreshed on
/// every [`OrderStatTree::set`] and read in `O(1)`.
#[derive(Debug)]
pub struct MinTree {
    capacity: usize,
    tree: SegmentPoint<f32, MinIgnoreNaN>,
    minimum: f32,
}

impl MinTree {
    /// Creates a tree with at least `capacity` leaves, all set to `+inf`.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1).next_power_of_two();
        Self {
            capacity,
            tree: SegmentPoint::build(vec![f32::INFINITY; capacity], MinIgnoreNaN),
            minimum: f32::INFINITY,
        }
    }

    /// Returns the minimum over all leaves.
    pub fn minimum(&self) -> f32 {
        self.minimum
    }
}

impl OrderStatTree for MinTree {
    fn capacity(&self) -> usize {
        self.capacity
    }

    fn set(&mut self, ix: usize, value: f32) {
        assert!(ix < self.capacity, "leaf {} out of range", ix);
        self.tree.modify(ix, value);
        self.minimum = self.tree.query(0, self.capacity);
    }

    fn range_reduce(&self, lo: usize, hi: usize) -> f32 {
        assert!(lo <= hi && hi < self.capacity, "invalid range [{}, {}]", lo, hi);
        self.tree.query(lo, hi + 1)
    }

    fn reduce(&self) -> f32 {
        self.minimum()
    }
}
