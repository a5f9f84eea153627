//! Annealing of the importance weight exponent.
use super::PerConfig;
use serde::{Deserialize, Serialize};

/// Linear schedule of the exponent $\beta$ of importance sampling weights.
///
/// `beta` starts at `beta_0` and reaches `beta_final` after `n_updates_final`
/// priority updates, where it stays. A prioritized buffer advances the
/// schedule once per accepted [`update_priority`](crate::ReplayBufferBase::update_priority)
/// call.
///
/// ```rust
/// use replay_core::IwScheduler;
///
/// let mut scheduler = IwScheduler::new(0.5, 1.0, 2);
/// scheduler.step();
/// assert_eq!(scheduler.beta(), 0.75);
/// ```
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct IwScheduler {
    beta_0: f32,
    beta_final: f32,
    n_updates_final: usize,
    n_updates: usize,
}

impl IwScheduler {
    /// Creates a schedule from `beta_0` to `beta_final` over `n_updates_final` updates.
    pub fn new(beta_0: f32, beta_final: f32, n_updates_final: usize) -> Self {
        Self {
            beta_0,
            beta_final,
            n_updates_final,
            n_updates: 0,
        }
    }

    /// Creates the schedule described by a [`PerConfig`].
    pub fn from_config(config: &PerConfig) -> Self {
        Self::new(config.beta_0, config.beta_final, config.n_opts_final)
    }

    /// Returns the current exponent.
    pub fn beta(&self) -> f32 {
        if self.is_annealed() {
            return self.beta_final;
        }
        let progress = self.n_updates as f32 / self.n_updates_final as f32;
        self.beta_0 + (self.beta_final - self.beta_0) * progress
    }

    /// Returns the number of priority updates seen so far.
    pub fn n_updates(&self) -> usize {
        self.n_updates
    }

    /// Returns `true` once `beta` has reached `beta_final`.
    pub fn is_annealed(&self) -> bool {
        self.n_updates >= self.n_updates_final
    }

    /// Advances the schedule by one priority update.
    pub fn step(&mut self) {
        self.n_updates = self.n_updates.saturating_add(1);
    }
}
