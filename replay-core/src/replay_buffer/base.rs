//! Replay buffer assembled from optional components.
use super::{
    episode::EpisodeIndex, per::PerState, storage::RingStorage, EpisodeKey, ReplayBufferConfig,
    Transition, TransitionBatch,
};
use crate::{
    BatchBase, ExperienceBufferBase, MinTree, ReplayBufferBase, ReplayBufferError, SampleIndex,
    SumTree,
};
use anyhow::Result;
use log::{debug, info, trace};
use rand::{rngs::StdRng, Rng, SeedableRng};

#[cfg_attr(doc, aquamarine::aquamarine)]
/// A replay buffer with optional prioritization and n-step returns.
///
/// The buffer owns a ring storage of transitions and, depending on its
/// [`ReplayBufferConfig`], a pair of priority trees and an episode index:
///
/// ```mermaid
/// graph LR
///     L[Training loop] -->|push| S[Ring storage]
///     S -->|batch| L
///     L -->|update_priority| P[Sum/min trees]
///     P -.->|slot selection, weights| S
///     E[Episode index] -.->|n-step folding| S
/// ```
///
/// | `per_config` | `episodic_config` | Sampling                               |
/// |--------------|-------------------|----------------------------------------|
/// | `None`       | `None`            | uniform, 1-step                        |
/// | `Some`       | `None`            | proportional to `priority^alpha`       |
/// | `None`       | `Some`            | uniform, n-step returns                |
/// | `Some`       | `Some`            | proportional, n-step returns           |
///
/// # Priority updates
///
/// Indices in a batch refer to slots of the ring. A push between sampling and
/// [`ReplayBufferBase::update_priority`] may overwrite a sampled slot with an
/// unrelated transition. Each index therefore carries the generation of the
/// slot, and updates on overwritten slots fail with
/// [`ReplayBufferError::StaleIndex`].
///
/// The buffer is not synchronized; share it across threads behind a lock.
///
/// # Examples
///
/// ```rust
/// use replay_core::{
///     ExperienceBufferBase, PerConfig, ReplayBuffer, ReplayBufferBase, ReplayBufferConfig,
///     Transition,
/// };
///
/// let config = ReplayBufferConfig::default()
///     .capacity(100)
///     .per_config(Some(PerConfig::default()));
/// let mut buffer = ReplayBuffer::<Vec<f32>, Vec<i64>>::build(&config).unwrap();
///
/// for t in 0..10 {
///     buffer.push(Transition::new(t as f32, 0, 1.0, t as f32 + 1.0, false)).unwrap();
/// }
///
/// let batch = buffer.batch_with_beta(4, 0.4).unwrap();
/// let ixs = batch.ix_sample.unwrap();
/// let td_errs = vec![0.5; ixs.len()];
/// buffer.update_priority(&ixs, &td_errs).unwrap();
/// ```
pub struct ReplayBuffer<O, A>
where
    O: BatchBase,
    A: BatchBase,
{
    storage: RingStorage<O, A>,

    /// Random number generator for sampling.
    rng: StdRng,

    /// State for prioritized experience replay, if enabled.
    per_state: Option<PerState>,

    /// Episode index for n-step returns, if enabled.
    episodes: Option<EpisodeIndex>,
}

impl<O, A> ReplayBuffer<O, A>
where
    O: BatchBase,
    A: BatchBase,
{
    /// Returns `true` if sampling is proportional to priorities.
    pub fn is_prioritized(&self) -> bool {
        self.per_state.is_some()
    }

    /// Returns `true` if batches hold n-step returns.
    pub fn is_episodic(&self) -> bool {
        self.episodes.is_some()
    }

    /// Returns the priority given to newly pushed transitions.
    pub fn max_priority(&self) -> Option<f32> {
        self.per_state.as_ref().map(|s| s.max_priority())
    }

    /// Returns the current exponent of importance weights.
    pub fn beta(&self) -> Option<f32> {
        self.per_state.as_ref().map(|s| s.iw_scheduler.beta())
    }

    /// Returns the tree of `priority^alpha` sums.
    pub fn sum_tree(&self) -> Option<&SumTree> {
        self.per_state.as_ref().map(|s| s.sum_tree())
    }

    /// Returns the tree of `priority^alpha` minima.
    pub fn min_tree(&self) -> Option<&MinTree> {
        self.per_state.as_ref().map(|s| s.min_tree())
    }

    /// Returns the keys of the episodes with transitions in the buffer, sorted.
    pub fn episode_keys(&self) -> Vec<EpisodeKey> {
        self.episodes
            .as_ref()
            .map(|e| e.episode_keys())
            .unwrap_or_default()
    }

    /// Returns the slots of an episode in temporal order.
    pub fn episode_slots(&self, key: &EpisodeKey) -> Option<Vec<usize>> {
        self.episodes.as_ref().and_then(|e| e.episode_slots(key))
    }

    /// Returns the sum of all rewards in the buffer.
    pub fn sum_rewards(&self) -> f32 {
        self.storage.sum_rewards()
    }

    /// Returns the number of transitions flagged as done.
    pub fn num_done_flags(&self) -> usize {
        self.storage.num_done_flags()
    }

    fn sample(&mut self, size: usize, beta: Option<f32>) -> Result<TransitionBatch<O, A>> {
        let len = self.storage.len();
        if len == 0 {
            return Err(ReplayBufferError::EmptyBuffer.into());
        }

        let (ixs, weight) = match &self.per_state {
            Some(per_state) => {
                let beta = beta.unwrap_or_else(|| per_state.iw_scheduler.beta());
                let ixs = per_state.sample(&mut self.rng, size, len);
                let weight = per_state.weights(&ixs, beta);
                (ixs, Some(weight))
            }
            None => {
                let rng = &mut self.rng;
                let ixs = (0..size)
                    .map(|_| rng.gen_range(0..len))
                    .collect::<Vec<_>>();
                (ixs, None)
            }
        };

        // Rewards and the slots providing next_obs and is_done
        let (reward, last_ixs): (Vec<f32>, Vec<usize>) = match &self.episodes {
            Some(episodes) => {
                let gamma = episodes.gamma();
                ixs.iter()
                    .map(|&ix| {
                        let slots = episodes.n_step_slots(ix);
                        let (reward, _) = slots.iter().fold((0f32, 1f32), |(r, g), &s| {
                            (r + g * self.storage.reward(s), g * gamma)
                        });
                        (reward, *slots.last().unwrap_or(&ix))
                    })
                    .unzip()
            }
            None => (self.storage.sample_reward(&ixs), ixs.clone()),
        };

        let ix_sample = weight.as_ref().map(|_| {
            ixs.iter()
                .map(|&ix| self.storage.sample_index(ix))
                .collect::<Vec<_>>()
        });
        trace!("ReplayBuffer::batch(): {} samples", ixs.len());

        Ok(TransitionBatch {
            obs: self.storage.sample_obs(&ixs),
            act: self.storage.sample_act(&ixs),
            next_obs: self.storage.sample_next_obs(&last_ixs),
            reward,
            is_done: self.storage.sample_is_done(&last_ixs),
            weight,
            ix_sample,
        })
    }

    /// Checks a priority update as a whole.
    fn validate_priority(&self, ixs: &[SampleIndex], priorities: &[f32]) -> Result<()> {
        if ixs.len() != priorities.len() {
            return Err(ReplayBufferError::InvalidPriority(format!(
                "{} indices but {} priorities",
                ixs.len(),
                priorities.len()
            ))
            .into());
        }
        if let Some(p) = priorities.iter().find(|&&p| !(p > 0.0 && p.is_finite())) {
            return Err(ReplayBufferError::InvalidPriority(format!(
                "priorities must be positive and finite, got {}",
                p
            ))
            .into());
        }
        if let Some(per_state) = &self.per_state {
            if let Some(p) = priorities.iter().find(|&&p| per_state.leaf(p).is_none()) {
                return Err(ReplayBufferError::InvalidPriority(format!(
                    "priority {} raised to alpha is out of the range of the priority trees",
                    p
                ))
                .into());
            }
        }
        let len = self.storage.len();
        for ix in ixs.iter() {
            if ix.ix >= len {
                return Err(ReplayBufferError::IndexRange { ix: ix.ix, len }.into());
            }
            let found = self.storage.generation(ix.ix);
            if found != ix.generation {
                debug!("Rejected priority update on overwritten slot {}", ix.ix);
                return Err(ReplayBufferError::StaleIndex {
                    ix: ix.ix,
                    expected: ix.generation,
                    found,
                }
                .into());
            }
        }
        Ok(())
    }
}

impl<O, A> ExperienceBufferBase for ReplayBuffer<O, A>
where
    O: BatchBase,
    A: BatchBase,
{
    type Item = Transition<O::Item, A::Item>;

    fn len(&self) -> usize {
        self.storage.len()
    }

    fn capacity(&self) -> usize {
        self.storage.capacity()
    }

    /// Adds a transition at the cursor, evicting the oldest one if the buffer is full.
    ///
    /// In episodic buffers the transition is appended to the current episode
    /// of its worker; prioritized buffers give it the running maximum priority.
    ///
    /// # Errors
    ///
    /// Returns [`ReplayBufferError::InvalidWorker`] if an episodic buffer
    /// receives a worker id out of range. The buffer is unchanged in that case.
    fn push(&mut self, tr: Self::Item) -> Result<SampleIndex> {
        let ix = self.storage.cursor();

        if let Some(episodes) = &mut self.episodes {
            let (worker, terminal) = match tr.episode {
                Some(source) => (source.worker, source.terminal),
                None => (0, tr.is_done),
            };
            episodes.check_worker(worker)?;
            episodes.evict(ix);
            episodes.record(ix, worker, terminal);
        }

        let sample_ix = self
            .storage
            .push(tr.obs, tr.act, tr.reward, tr.next_obs, tr.is_done);

        if let Some(per_state) = &mut self.per_state {
            per_state.set_max_priority(ix);
        }

        trace!("ReplayBuffer::push(): slot {}", ix);
        Ok(sample_ix)
    }
}

impl<O, A> ReplayBufferBase for ReplayBuffer<O, A>
where
    O: BatchBase,
    A: BatchBase,
{
    type Config = ReplayBufferConfig;
    type Batch = TransitionBatch<O, A>;

    fn build(config: &Self::Config) -> Result<Self> {
        config.validate()?;
        let capacity = config.capacity;
        info!(
            "Construct replay buffer with capacity = {}, prioritized = {}, episodic = {}",
            capacity,
            config.per_config.is_some(),
            config.episodic_config.is_some()
        );

        Ok(Self {
            storage: RingStorage::new(capacity),
            rng: StdRng::seed_from_u64(config.seed),
            per_state: config
                .per_config
                .as_ref()
                .map(|c| PerState::new(capacity, c)),
            episodes: config
                .episodic_config
                .as_ref()
                .map(|c| EpisodeIndex::new(capacity, c)),
        })
    }

    fn batch(&mut self, size: usize) -> Result<Self::Batch> {
        self.sample(size, None)
    }

    fn batch_with_beta(&mut self, size: usize, beta: f32) -> Result<Self::Batch> {
        if !(beta > 0.0 && beta.is_finite()) {
            return Err(ReplayBufferError::BetaRange(beta).into());
        }
        self.sample(size, Some(beta))
    }

    /// Sets `priority^alpha` for each slot in `ixs`.
    ///
    /// The running maximum priority becomes
    /// `max(max_priority, max(priorities)) * max_priority_decay`, once per call.
    /// For buffers without prioritization the request is only validated.
    fn update_priority(&mut self, ixs: &[SampleIndex], priorities: &[f32]) -> Result<()> {
        self.validate_priority(ixs, priorities)?;
        if ixs.is_empty() {
            return Ok(());
        }
        if let Some(per_state) = &mut self.per_state {
            let ixs = ixs.iter().map(|ix| ix.ix).collect::<Vec<_>>();
            per_state.update(&ixs, priorities);
        }
        Ok(())
    }
}
