//! Batches of transitions sampled from a replay buffer.
use crate::{BatchBase, SampleIndex};

/// A batch of transitions, one column per field.
///
/// For episodic buffers, `reward` holds the discounted n-step return and
/// `next_obs`, `is_done` are taken from the last transition folded into it.
///
/// All columns are copies; mutating a batch never affects the buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionBatch<O, A>
where
    O: BatchBase,
    A: BatchBase,
{
    /// Observations.
    pub obs: O,

    /// Actions.
    pub act: A,

    /// Observations after the (last folded) action.
    pub next_obs: O,

    /// Rewards, or n-step returns.
    pub reward: Vec<f32>,

    /// Termination flags.
    pub is_done: Vec<i8>,

    /// Importance sampling weights for prioritized experience replay.
    pub weight: Option<Vec<f32>>,

    /// Slots of the sampled transitions, needed to update their priorities.
    pub ix_sample: Option<Vec<SampleIndex>>,
}

impl<O, A> TransitionBatch<O, A>
where
    O: BatchBase,
    A: BatchBase,
{
    /// Returns the number of transitions in the batch.
    pub fn len(&self) -> usize {
        self.reward.len()
    }

    /// Returns `true` if the batch is empty.
    pub fn is_empty(&self) -> bool {
        self.reward.is_empty()
    }

    /// Returns a reference to the batch of observations.
    pub fn obs(&self) -> &O {
        &self.obs
    }

    /// Returns a reference to the batch of actions.
    pub fn act(&self) -> &A {
        &self.act
    }

    /// Decomposes the batch into
    /// `(obs, act, next_obs, reward, is_done, weight, ix_sample)`.
    #[allow(clippy::type_complexity)]
    pub fn unpack(
        self,
    ) -> (
        O,
        A,
        O,
        Vec<f32>,
        Vec<i8>,
        Option<Vec<f32>>,
        Option<Vec<SampleIndex>>,
    ) {
        (
            self.obs,
            self.act,
            self.next_obs,
            self.reward,
            self.is_done,
            self.weight,
            self.ix_sample,
        )
    }
}
