//! A single transition pushed into a replay buffer.

/// Origin of a transition within a rollout.
///
/// Episodic buffers use it to link consecutive transitions of the same
/// episode. `terminal` marks the last transition of the episode, after which
/// the worker starts a new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpisodeSource {
    /// Index of the worker that produced the transition.
    pub worker: usize,

    /// `true` if this is the last transition of its episode.
    pub terminal: bool,
}

/// One step of interaction `(o_t, a_t, r_t, o_t+1, is_done_t)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition<O, A> {
    /// Observation before the action.
    pub obs: O,

    /// Action taken.
    pub act: A,

    /// Reward received.
    pub reward: f32,

    /// Observation after the action.
    pub next_obs: O,

    /// `true` if the environment reached a terminal state.
    pub is_done: bool,

    /// Origin of the transition, used by episodic buffers.
    ///
    /// If `None`, an episodic buffer attributes the transition to worker `0`
    /// and treats `is_done` as the end of the episode.
    pub episode: Option<EpisodeSource>,
}

impl<O, A> Transition<O, A> {
    /// Creates a transition without episode information.
    pub fn new(obs: O, act: A, reward: f32, next_obs: O, is_done: bool) -> Self {
        Self {
            obs,
            act,
            reward,
            next_obs,
            is_done,
            episode: None,
        }
    }

    /// Attaches the worker and the episode-end flag.
    pub fn with_episode(mut self, worker: usize, terminal: bool) -> Self {
        self.episode = Some(EpisodeSource { worker, terminal });
        self
    }
}
