//! Sum tree for prioritized sampling.
use super::OrderStatTree;

/// Binary tree whose internal nodes hold the sum of their children.
///
/// Nodes are stored in a flat array, the root at index 1 and the `i`-th leaf
/// at `capacity + i`. Unused leaves keep the identity value `0`, so they never
/// receive sampling mass.
#[derive(Debug, Clone)]
pub struct SumTree {
    capacity: usize,
    tree: Vec<f32>,
}

impl SumTree {
    /// Creates a tree with at least `capacity` leaves, all set to zero.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1).next_power_of_two();
        Self {
            capacity,
            tree: vec![0f32; 2 * capacity],
        }
    }

    /// Returns the value of the `ix`-th leaf.
    pub fn get(&self, ix: usize) -> f32 {
        assert!(ix < self.capacity, "leaf {} out of range", ix);
        self.tree[ix + self.capacity]
    }

    /// Returns the sum of all leaves.
    pub fn total(&self) -> f32 {
        self.tree[1]
    }

    /// Returns the index of the leaf where the running prefix sum first exceeds `mass`.
    ///
    /// The returned `i` satisfies `sum(0..i) <= mass < sum(0..=i)`; ties go to the
    /// left subtree. `mass` is expected in `[0, self.total())`. If rounding pushes
    /// the descent towards an empty right subtree, it stays on the left, so the
    /// result never lands on a leaf carrying no mass unless the whole tree is empty.
    pub fn find_prefix(&self, mass: f32) -> usize {
        let mut mass = mass;
        let mut node = 1;
        while node < self.capacity {
            let left = 2 * node;
            if mass < self.tree[left] || self.tree[left + 1] <= 0f32 {
                node = left;
            } else {
                mass -= self.tree[left];
                node = left + 1;
            }
        }
        node - self.capacity
    }
}

impl OrderStatTree for SumTree {
    fn capacity(&self) -> usize {
        self.capacity
    }

    fn set(&mut self, ix: usize, value: f32) {
        assert!(ix < self.capacity, "leaf {} out of range", ix);
        let mut node = ix + self.capacity;
        self.tree[node] = value;
        // Recompute rather than propagate a delta, so rounding errors do not accumulate.
        while node > 1 {
            node /= 2;
            self.tree[node] = self.tree[2 * node] + self.tree[2 * node + 1];
        }
    }

    fn range_reduce(&self, lo: usize, hi: usize) -> f32 {
        assert!(lo <= hi && hi < self.capacity, "invalid range [{}, {}]", lo, hi);
        let mut sum = 0f32;
        let mut l = lo + self.capacity;
        let mut r = hi + self.capacity + 1;
        while l < r {
            if l & 1 == 1 {
                sum += self.tree[l];
                l += 1;
            }
            if r & 1 == 1 {
                r -= 1;
                sum += self.tree[r];
            }
            l /= 2;
            r /= 2;
        }
        sum
    }

    fn reduce(&self) -> f32 {
        self.total()
    }
}
