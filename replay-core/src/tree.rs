//! Order-statistics trees over a fixed number of leaves.
//!
//! Both trees hold `capacity.next_power_of_two()` leaves and support point
//! updates and inclusive range reductions in `O(log N)`. [`SumTree`] also
//! answers the inverse prefix-sum query used for proportional sampling.
mod min_tree;
mod sum_tree;
pub use min_tree::MinTree;
pub use sum_tree::SumTree;

/// Interface shared by the order-statistics trees.
pub trait OrderStatTree {
    /// Returns the number of leaves, a power of two.
    fn capacity(&self) -> usize;

    /// Sets the value of the `ix`-th leaf and refreshes its ancestors.
    ///
    /// # Panics
    ///
    /// Panics if `ix >= self.capacity()`.
    fn set(&mut self, ix: usize, value: f32);

    /// Reduces the leaves in `[lo, hi]`, both ends inclusive.
    ///
    /// # Panics
    ///
    /// Panics if `lo > hi` or `hi >= self.capacity()`.
    fn range_reduce(&self, lo: usize, hi: usize) -> f32;

    /// Reduces all leaves.
    fn reduce(&self) -> f32;
}
