//! Replay buffer interface for reinforcement learning.
//!
//! A training loop pushes transitions through [`ExperienceBufferBase`] and draws
//! batches through [`ReplayBufferBase`]. After an optimization step, the loop may
//! feed new priorities back for the sampled transitions.
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Reference to a slot of a replay buffer at the time it was written.
///
/// `generation` identifies the write: it changes every time the ring cursor
/// overwrites the slot, so a reference obtained before an overwrite is
/// recognized as stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SampleIndex {
    /// Slot index in the buffer.
    pub ix: usize,

    /// Write stamp of the slot.
    pub generation: u64,
}

/// Interface for buffers that store experiences from environments.
pub trait ExperienceBufferBase {
    /// The type of items stored in the buffer.
    type Item;

    /// Pushes a new experience into the buffer.
    ///
    /// When the buffer is full, the oldest experience is overwritten.
    /// Returns a reference to the slot that was written.
    fn push(&mut self, tr: Self::Item) -> Result<SampleIndex>;

    /// Returns the current number of experiences in the buffer.
    fn len(&self) -> usize;

    /// Returns the maximum number of experiences the buffer holds.
    fn capacity(&self) -> usize;

    /// Returns `true` if the buffer holds no experiences.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if the buffer holds at least `n` experiences.
    fn can_sample(&self, n: usize) -> bool {
        self.len() >= n
    }

    /// Returns `true` if the next push overwrites an experience.
    fn is_full(&self) -> bool {
        self.len() == self.capacity()
    }
}

/// Interface for replay buffers that generate batches for training.
pub trait ReplayBufferBase: Sized {
    /// Configuration parameters for the replay buffer.
    type Config: Clone;

    /// The type of batch generated for training.
    type Batch;

    /// Builds a new replay buffer from the given configuration.
    ///
    /// Fails if the configuration is invalid.
    fn build(config: &Self::Config) -> Result<Self>;

    /// Samples a batch of `size` experiences with replacement.
    ///
    /// Prioritized buffers use the exponent of importance weights given by
    /// their schedule. Fails if the buffer is empty.
    fn batch(&mut self, size: usize) -> Result<Self::Batch>;

    /// Samples a batch like [`ReplayBufferBase::batch`] with an explicit exponent
    /// `beta` of importance weights.
    ///
    /// Fails unless `beta` is positive and finite. Buffers without
    /// prioritization ignore `beta`.
    fn batch_with_beta(&mut self, size: usize, beta: f32) -> Result<Self::Batch>;

    /// Updates the priorities of the experiences at `ixs`.
    ///
    /// `ixs` must come from the most recent batch. The request is validated as
    /// a whole before any priority is changed: lengths must match, priorities
    /// must be positive and finite, and every slot must still hold the
    /// experience it held when sampled. Prioritized buffers also reject
    /// priorities whose `priority^alpha` underflows to zero or is too large
    /// for the sum of all priorities to stay finite.
    fn update_priority(&mut self, ixs: &[SampleIndex], priorities: &[f32]) -> Result<()>;
}
