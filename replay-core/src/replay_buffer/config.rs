//! Configuration of [`ReplayBuffer`](super::ReplayBuffer).
//!
//! A buffer is assembled from optional components:
//! - no component: uniform sampling,
//! - [`PerConfig`]: prioritized sampling with importance weights,
//! - [`EpisodicConfig`]: n-step returns over linked transitions,
//! - both: prioritized sampling of n-step transitions.
use super::per::leaf_value;
use crate::ReplayBufferError;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    default::Default,
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration for Prioritized Experience Replay (PER).
///
/// # Examples
///
/// ```rust
/// use replay_core::PerConfig;
///
/// let config = PerConfig::default()
///     .alpha(0.6)
///     .beta_0(0.4)
///     .beta_final(1.0)
///     .n_opts_final(500_000);
/// ```
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct PerConfig {
    /// Exponent for prioritization. A value of 0 results in uniform sampling.
    pub alpha: f32,

    /// Initial value of the importance sampling exponent.
    pub beta_0: f32,

    /// Final value of the importance sampling exponent.
    pub beta_final: f32,

    /// Number of priority updates after which `beta` reaches `beta_final`.
    pub n_opts_final: usize,

    /// Priority given to transitions pushed before any priority update.
    pub initial_max_priority: f32,

    /// Factor applied to the running maximum priority on every priority update.
    pub max_priority_decay: f32,
}

impl Default for PerConfig {
    /// Creates a default PER configuration:
    /// - `alpha = 0.6`
    /// - `beta_0 = 0.4`
    /// - `beta_final = 1.0`
    /// - `n_opts_final = 500_000`
    /// - `initial_max_priority = 1.0`
    /// - `max_priority_decay = 0.95`
    fn default() -> Self {
        Self {
            alpha: 0.6,
            beta_0: 0.4,
            beta_final: 1.0,
            n_opts_final: 500_000,
            initial_max_priority: 1.0,
            max_priority_decay: 0.95,
        }
    }
}

impl PerConfig {
    /// Sets the prioritization exponent `alpha`.
    pub fn alpha(mut self, alpha: f32) -> Self {
        self.alpha = alpha;
        self
    }

    /// Sets the initial importance sampling exponent `beta_0`.
    pub fn beta_0(mut self, beta_0: f32) -> Self {
        self.beta_0 = beta_0;
        self
    }

    /// Sets the final importance sampling exponent `beta_final`.
    pub fn beta_final(mut self, beta_final: f32) -> Self {
        self.beta_final = beta_final;
        self
    }

    /// Sets the number of priority updates to reach the final beta value.
    pub fn n_opts_final(mut self, n_opts_final: usize) -> Self {
        self.n_opts_final = n_opts_final;
        self
    }

    /// Sets the priority of transitions pushed before any priority update.
    pub fn initial_max_priority(mut self, initial_max_priority: f32) -> Self {
        self.initial_max_priority = initial_max_priority;
        self
    }

    /// Sets the decay factor of the running maximum priority.
    pub fn max_priority_decay(mut self, max_priority_decay: f32) -> Self {
        self.max_priority_decay = max_priority_decay;
        self
    }

    fn validate(&self, capacity: usize) -> Result<()> {
        if !(self.alpha >= 0.0 && self.alpha.is_finite()) {
            return Err(invalid(format!("alpha must be non-negative, got {}", self.alpha)));
        }
        if !(self.beta_0 > 0.0) || !(self.beta_final > 0.0) {
            return Err(invalid(format!(
                "beta must be positive, got beta_0 = {}, beta_final = {}",
                self.beta_0, self.beta_final
            )));
        }
        if !(self.initial_max_priority > 0.0 && self.initial_max_priority.is_finite()) {
            return Err(invalid(format!(
                "initial_max_priority must be positive, got {}",
                self.initial_max_priority
            )));
        }
        if leaf_value(self.initial_max_priority, self.alpha, capacity).is_none() {
            return Err(invalid(format!(
                "initial_max_priority^alpha = {}^{} is out of the range of the priority trees",
                self.initial_max_priority, self.alpha
            )));
        }
        if !(self.max_priority_decay > 0.0 && self.max_priority_decay.is_finite()) {
            return Err(invalid(format!(
                "max_priority_decay must be positive, got {}",
                self.max_priority_decay
            )));
        }
        Ok(())
    }
}

/// Configuration of n-step returns over episodes.
///
/// Transitions are grouped into episodes per worker. A sampled transition
/// receives the discounted sum of up to `n_step` rewards of its episode.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct EpisodicConfig {
    /// Maximum number of rewards folded into a return, at least 1.
    pub n_step: usize,

    /// Discount factor in `[0, 1]`.
    pub gamma: f32,

    /// Number of workers producing transitions, at least 1.
    pub worker_size: usize,
}

impl Default for EpisodicConfig {
    fn default() -> Self {
        Self {
            n_step: 3,
            gamma: 0.99,
            worker_size: 1,
        }
    }
}

impl EpisodicConfig {
    /// Sets the number of steps of returns.
    pub fn n_step(mut self, n_step: usize) -> Self {
        self.n_step = n_step;
        self
    }

    /// Sets the discount factor.
    pub fn gamma(mut self, gamma: f32) -> Self {
        self.gamma = gamma;
        self
    }

    /// Sets the number of workers.
    pub fn worker_size(mut self, worker_size: usize) -> Self {
        self.worker_size = worker_size;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.n_step == 0 {
            return Err(invalid("n_step must be at least 1".to_string()));
        }
        if !(0.0..=1.0).contains(&self.gamma) {
            return Err(invalid(format!("gamma must be in [0, 1], got {}", self.gamma)));
        }
        if self.worker_size == 0 {
            return Err(invalid("worker_size must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Configuration of [`ReplayBuffer`](super::ReplayBuffer).
///
/// # Examples
///
/// ```rust
/// use replay_core::{EpisodicConfig, PerConfig, ReplayBufferConfig};
///
/// // Uniform sampling
/// let config = ReplayBufferConfig::default()
///     .capacity(10000)
///     .seed(42);
///
/// // Prioritized sampling of 3-step returns
/// let config = ReplayBufferConfig::default()
///     .capacity(10000)
///     .per_config(Some(PerConfig::default()))
///     .episodic_config(Some(EpisodicConfig::default().n_step(3).gamma(0.99)));
/// ```
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct ReplayBufferConfig {
    /// Maximum number of transitions in the buffer. When the buffer is full,
    /// new transitions replace the oldest ones.
    pub capacity: usize,

    /// Random seed used for sampling transitions.
    pub seed: u64,

    /// Configuration of prioritized experience replay. If `None`,
    /// transitions are sampled uniformly at random.
    pub per_config: Option<PerConfig>,

    /// Configuration of n-step returns. If `None`, batches hold 1-step rewards.
    pub episodic_config: Option<EpisodicConfig>,
}

impl Default for ReplayBufferConfig {
    /// Creates a default configuration:
    /// - `capacity = 10000`
    /// - `seed = 42`
    /// - `per_config = None`
    /// - `episodic_config = None`
    fn default() -> Self {
        Self {
            capacity: 10000,
            seed: 42,
            per_config: None,
            episodic_config: None,
        }
    }
}

impl ReplayBufferConfig {
    /// Sets the capacity of the replay buffer.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the random seed for sampling.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Sets the configuration for prioritized experience replay.
    pub fn per_config(mut self, per_config: Option<PerConfig>) -> Self {
        self.per_config = per_config;
        self
    }

    /// Sets the configuration for n-step returns.
    pub fn episodic_config(mut self, episodic_config: Option<EpisodicConfig>) -> Self {
        self.episodic_config = episodic_config;
        self
    }

    /// Checks the values of the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ReplayBufferError::Capacity`] if `capacity` is zero and
    /// [`ReplayBufferError::InvalidConfig`] for other out-of-range values.
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(ReplayBufferError::Capacity(self.capacity).into());
        }
        if let Some(per_config) = &self.per_config {
            per_config.validate(self.capacity)?;
        }
        if let Some(episodic_config) = &self.episodic_config {
            episodic_config.validate()?;
        }
        Ok(())
    }

    /// Loads the configuration from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves the configuration to a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

fn invalid(msg: String) -> anyhow::Error {
    ReplayBufferError::InvalidConfig(msg).into()
}
