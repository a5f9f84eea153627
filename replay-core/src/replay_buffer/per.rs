//! State of prioritized experience replay.
use super::{IwScheduler, PerConfig};
use crate::{MinTree, OrderStatTree, SumTree};
use rand::Rng;

/// Returns `priority^alpha` if it can be stored among `capacity` leaves.
///
/// The leaf must be positive, and small enough that the sum of `capacity`
/// such leaves is still finite in `f32`.
pub(super) fn leaf_value(priority: f32, alpha: f32, capacity: usize) -> Option<f32> {
    let leaf = priority.powf(alpha);
    let bound = f32::MAX / capacity.max(1) as f32;
    if leaf > 0.0 && leaf <= bound {
        Some(leaf)
    } else {
        None
    }
}

/// Priorities of the stored transitions and the sampling schedule.
///
/// Both trees hold `priority^alpha` for every occupied slot. The sum tree
/// drives proportional sampling, the min tree gives the normalizer of
/// importance weights.
pub(super) struct PerState {
    alpha: f32,

    /// Number of slots of the buffer.
    capacity: usize,

    /// Priority given to newly pushed transitions.
    max_priority: f32,

    max_priority_decay: f32,

    sum_tree: SumTree,

    min_tree: MinTree,

    /// Scheduler for importance sampling weights.
    pub iw_scheduler: IwScheduler,
}

impl PerState {
    pub fn new(capacity: usize, per_config: &PerConfig) -> Self {
        Self {
            alpha: per_config.alpha,
            capacity,
            max_priority: per_config.initial_max_priority,
            max_priority_decay: per_config.max_priority_decay,
            sum_tree: SumTree::new(capacity),
            min_tree: MinTree::new(capacity),
            iw_scheduler: IwScheduler::from_config(per_config),
        }
    }

    pub fn max_priority(&self) -> f32 {
        self.max_priority
    }

    pub fn sum_tree(&self) -> &SumTree {
        &self.sum_tree
    }

    pub fn min_tree(&self) -> &MinTree {
        &self.min_tree
    }

    /// Returns `priority^alpha` if the trees can hold it.
    pub fn leaf(&self, priority: f32) -> Option<f32> {
        leaf_value(priority, self.alpha, self.capacity)
    }

    fn set(&mut self, ix: usize, priority: f32) {
        let p = priority.powf(self.alpha);
        self.sum_tree.set(ix, p);
        self.min_tree.set(ix, p);
    }

    /// Gives the slot just written the running maximum priority.
    pub fn set_max_priority(&mut self, ix: usize) {
        self.set(ix, self.max_priority);
    }

    /// Draws `size` slots in `[0, len)` with probability proportional to `priority^alpha`.
    pub fn sample(&self, rng: &mut impl Rng, size: usize, len: usize) -> Vec<usize> {
        let total = self.sum_tree.total();
        (0..size)
            .map(|_| {
                let mass = rng.gen::<f32>() * total;
                self.sum_tree.find_prefix(mass).min(len - 1)
            })
            .collect()
    }

    /// Computes importance sampling weights normalized by the largest possible weight.
    ///
    /// The weight is $w_i=\left(N P(i)\right)^{-\beta}$, divided by the weight of
    /// the transition with the smallest priority in the buffer. `N` and the
    /// total cancel out, leaving $(p_i / p_{min})^{-\beta}$, evaluated in `f64`.
    /// Weights too small for `f32` are raised to [`f32::MIN_POSITIVE`].
    pub fn weights(&self, ixs: &[usize], beta: f32) -> Vec<f32> {
        let p_min = self.min_tree.minimum() as f64;
        let beta = beta as f64;
        ixs.iter()
            .map(|&ix| {
                let ratio = self.sum_tree.get(ix) as f64 / p_min;
                (ratio.powf(-beta) as f32).max(f32::MIN_POSITIVE)
            })
            .collect()
    }

    /// Sets the priorities of already validated slots.
    ///
    /// The running maximum becomes `max(max_priority, max(priorities)) * decay`,
    /// applied once per call. The decay is skipped when it would take the
    /// maximum out of the range the trees can hold.
    pub fn update(&mut self, ixs: &[usize], priorities: &[f32]) {
        for (&ix, &p) in ixs.iter().zip(priorities.iter()) {
            self.set(ix, p);
        }
        let max_p = priorities.iter().cloned().fold(self.max_priority, f32::max);
        let decayed = max_p * self.max_priority_decay;
        self.max_priority = match self.leaf(decayed) {
            Some(_) => decayed,
            None => max_p,
        };
        self.iw_scheduler.step();
    }
}
