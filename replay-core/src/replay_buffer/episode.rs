//! Bookkeeping of episodes for n-step returns.
use super::EpisodicConfig;
use crate::ReplayBufferError;
use anyhow::Result;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

/// Identifies one rollout: the `episode`-th episode run by `worker`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EpisodeKey {
    /// Worker that ran the episode.
    pub worker: usize,

    /// Number of episodes the worker finished before this one.
    pub episode: u64,
}

/// Where a slot sits in its episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct EpisodeRef {
    key: EpisodeKey,
    /// Absolute position within the episode, counted from its first transition.
    position: usize,
    terminal: bool,
}

/// Surviving slots of one episode in temporal order.
///
/// `start` is the position of the front slot; it grows as the oldest slots
/// of the episode are evicted.
#[derive(Debug, Clone)]
struct EpisodeSlots {
    start: usize,
    slots: VecDeque<usize>,
}

/// Index from episodes to the slots holding their transitions.
pub(super) struct EpisodeIndex {
    n_step: usize,
    gamma: f32,
    worker_size: usize,

    /// Episode counter of each worker.
    worker_episode: Vec<u64>,

    /// Position of the next transition of each worker in its current episode.
    worker_position: Vec<usize>,

    episodes: HashMap<EpisodeKey, EpisodeSlots>,

    /// Episode membership of each slot; `None` for empty slots.
    slot_refs: Vec<Option<EpisodeRef>>,
}

impl EpisodeIndex {
    pub fn new(capacity: usize, config: &EpisodicConfig) -> Self {
        Self {
            n_step: config.n_step,
            gamma: config.gamma,
            worker_size: config.worker_size,
            worker_episode: vec![0; config.worker_size],
            worker_position: vec![0; config.worker_size],
            episodes: HashMap::new(),
            slot_refs: vec![None; capacity],
        }
    }

    pub fn gamma(&self) -> f32 {
        self.gamma
    }

    pub fn check_worker(&self, worker: usize) -> Result<()> {
        if worker >= self.worker_size {
            return Err(ReplayBufferError::InvalidWorker {
                worker,
                worker_size: self.worker_size,
            }
            .into());
        }
        Ok(())
    }

    /// Drops slot `ix` from its episode before the slot is overwritten.
    ///
    /// The ring evicts the transitions of an episode oldest first, so the
    /// evicted slot is always the front of its episode. Evicting the terminal
    /// slot, or the last surviving one, deletes the episode entry.
    pub fn evict(&mut self, ix: usize) {
        let r = match self.slot_refs[ix].take() {
            Some(r) => r,
            None => return,
        };

        if r.terminal {
            if self.episodes.remove(&r.key).is_some() {
                debug!("Episode {:?} removed with its terminal slot {}", r.key, ix);
            }
            return;
        }

        if let Some(entry) = self.episodes.get_mut(&r.key) {
            let front = entry.slots.pop_front();
            debug_assert_eq!(front, Some(ix));
            entry.start += 1;
            if entry.slots.is_empty() {
                self.episodes.remove(&r.key);
                debug!("Episode {:?} removed, all of its slots were evicted", r.key);
            }
        }
    }

    /// Appends slot `ix` to the current episode of `worker`.
    ///
    /// If `terminal`, the worker starts a new episode with its next transition.
    pub fn record(&mut self, ix: usize, worker: usize, terminal: bool) {
        let key = EpisodeKey {
            worker,
            episode: self.worker_episode[worker],
        };
        let position = self.worker_position[worker];

        self.episodes
            .entry(key)
            .or_insert_with(|| EpisodeSlots {
                start: position,
                slots: VecDeque::new(),
            })
            .slots
            .push_back(ix);
        self.slot_refs[ix] = Some(EpisodeRef {
            key,
            position,
            terminal,
        });

        if terminal {
            self.worker_episode[worker] += 1;
            self.worker_position[worker] = 0;
        } else {
            self.worker_position[worker] += 1;
        }
    }

    /// Returns up to `n_step` consecutive slots of the episode, starting at `ix`.
    ///
    /// The list is shorter when the episode has fewer transitions left.
    pub fn n_step_slots(&self, ix: usize) -> Vec<usize> {
        let r = match &self.slot_refs[ix] {
            Some(r) => r,
            None => return vec![ix],
        };
        match self.episodes.get(&r.key) {
            Some(entry) => entry
                .slots
                .iter()
                .skip(r.position - entry.start)
                .take(self.n_step)
                .copied()
                .collect(),
            None => vec![ix],
        }
    }

    pub fn episode_keys(&self) -> Vec<EpisodeKey> {
        let mut keys = self.episodes.keys().copied().collect::<Vec<_>>();
        keys.sort();
        keys
    }

    pub fn episode_slots(&self, key: &EpisodeKey) -> Option<Vec<usize>> {
        self.episodes
            .get(key)
            .map(|entry| entry.slots.iter().copied().collect())
    }
}
