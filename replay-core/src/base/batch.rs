//! Column storage for observations and actions.

/// Column storage of observations or actions inside a replay buffer.
///
/// A replay buffer keeps one instance per column, created with the buffer
/// capacity, and writes single items into slots. Sampling gathers the items
/// at the given slots into a new, independent instance.
///
/// # Examples
///
/// ```ignore
/// struct DiscreteAct(Vec<i64>);
///
/// impl BatchBase for DiscreteAct {
///     type Item = i64;
///
///     fn new(capacity: usize) -> Self {
///         Self(vec![0; capacity])
///     }
///
///     fn push(&mut self, ix: usize, item: i64) {
///         self.0[ix] = item;
///     }
///
///     fn sample(&self, ixs: &[usize]) -> Self {
///         Self(ixs.iter().map(|&ix| self.0[ix]).collect())
///     }
/// }
/// ```
pub trait BatchBase {
    /// A single observation or action stored in one slot.
    type Item;

    /// Creates storage for `capacity` items.
    fn new(capacity: usize) -> Self;

    /// Writes `item` into slot `ix`, replacing what was there.
    fn push(&mut self, ix: usize, item: Self::Item);

    /// Gathers the items at `ixs`, in order and with repetitions, into a new batch.
    fn sample(&self, ixs: &[usize]) -> Self;
}

impl<T: Clone + Default> BatchBase for Vec<T> {
    type Item = T;

    fn new(capacity: usize) -> Self {
        vec![T::default(); capacity]
    }

    fn push(&mut self, ix: usize, item: T) {
        self[ix] = item;
    }

    fn sample(&self, ixs: &[usize]) -> Self {
        ixs.iter().map(|&ix| self[ix].clone()).collect()
    }
}
