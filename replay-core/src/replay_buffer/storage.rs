//! Fixed-capacity ring storage of transitions.
use crate::{BatchBase, SampleIndex};

/// Column-wise ring storage.
///
/// Transitions are written at a cursor that wraps around `capacity`, so once
/// the storage is full every write evicts the oldest transition. Each write
/// stamps its slot with a fresh generation.
pub(super) struct RingStorage<O, A>
where
    O: BatchBase,
    A: BatchBase,
{
    /// Maximum number of transitions that can be stored.
    capacity: usize,

    /// Current insertion index.
    i: usize,

    /// Current number of stored transitions.
    size: usize,

    /// Number of writes so far, the generation of the latest write.
    n_pushes: u64,

    obs: O,
    act: A,
    next_obs: O,
    reward: Vec<f32>,
    is_done: Vec<i8>,

    /// Generation of the transition held by each slot; `0` for empty slots.
    generation: Vec<u64>,
}

impl<O, A> RingStorage<O, A>
where
    O: BatchBase,
    A: BatchBase,
{
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            i: 0,
            size: 0,
            n_pushes: 0,
            obs: O::new(capacity),
            act: A::new(capacity),
            next_obs: O::new(capacity),
            reward: vec![0.; capacity],
            is_done: vec![0; capacity],
            generation: vec![0; capacity],
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.size
    }

    /// Returns the slot written by the next push.
    pub fn cursor(&self) -> usize {
        self.i
    }

    pub fn push(
        &mut self,
        obs: O::Item,
        act: A::Item,
        reward: f32,
        next_obs: O::Item,
        is_done: bool,
    ) -> SampleIndex {
        let ix = self.i;
        self.n_pushes += 1;

        self.obs.push(ix, obs);
        self.act.push(ix, act);
        self.next_obs.push(ix, next_obs);
        self.reward[ix] = reward;
        self.is_done[ix] = is_done as i8;
        self.generation[ix] = self.n_pushes;

        self.i = (self.i + 1) % self.capacity;
        if self.size < self.capacity {
            self.size += 1;
        }

        SampleIndex {
            ix,
            generation: self.n_pushes,
        }
    }

    pub fn generation(&self, ix: usize) -> u64 {
        self.generation[ix]
    }

    pub fn sample_index(&self, ix: usize) -> SampleIndex {
        SampleIndex {
            ix,
            generation: self.generation[ix],
        }
    }

    pub fn reward(&self, ix: usize) -> f32 {
        self.reward[ix]
    }

    pub fn sample_obs(&self, ixs: &[usize]) -> O {
        self.obs.sample(ixs)
    }

    pub fn sample_act(&self, ixs: &[usize]) -> A {
        self.act.sample(ixs)
    }

    pub fn sample_next_obs(&self, ixs: &[usize]) -> O {
        self.next_obs.sample(ixs)
    }

    pub fn sample_reward(&self, ixs: &[usize]) -> Vec<f32> {
        ixs.iter().map(|&ix| self.reward[ix]).collect()
    }

    pub fn sample_is_done(&self, ixs: &[usize]) -> Vec<i8> {
        ixs.iter().map(|&ix| self.is_done[ix]).collect()
    }

    pub fn sum_rewards(&self) -> f32 {
        self.reward[..self.size].iter().sum()
    }

    pub fn num_done_flags(&self) -> usize {
        self.is_done[..self.size]
            .iter()
            .map(|&is_done| is_done as usize)
            .sum()
    }
}
