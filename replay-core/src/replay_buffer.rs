//! Replay buffers for reinforcement learning.
//!
//! [`ReplayBuffer`] stores transitions in a ring of fixed capacity and
//! supports uniform sampling, prioritized sampling with importance weights,
//! and n-step returns over the episodes of several workers.
//!
//! # Examples
//!
//! ```rust
//! use replay_core::{
//!     EpisodicConfig, ExperienceBufferBase, ReplayBuffer, ReplayBufferBase,
//!     ReplayBufferConfig, Transition,
//! };
//!
//! let config = ReplayBufferConfig::default()
//!     .capacity(1000)
//!     .episodic_config(Some(EpisodicConfig::default().n_step(3).gamma(0.5)));
//! let mut buffer = ReplayBuffer::<Vec<f32>, Vec<i64>>::build(&config).unwrap();
//!
//! for t in 0..4 {
//!     let is_done = t == 3;
//!     let tr = Transition::new(t as f32, 0, 1.0, t as f32 + 1.0, is_done).with_episode(0, is_done);
//!     buffer.push(tr).unwrap();
//! }
//!
//! let batch = buffer.batch(8).unwrap();
//! assert_eq!(batch.len(), 8);
//! ```
mod array;
mod base;
mod batch;
mod config;
mod episode;
mod iw_scheduler;
mod per;
mod storage;
mod transition;
pub use array::{ArrayBatch, MultiArrayBatch};
pub use base::ReplayBuffer;
pub use batch::TransitionBatch;
pub use config::{EpisodicConfig, PerConfig, ReplayBufferConfig};
pub use episode::EpisodeKey;
pub use iw_scheduler::IwScheduler;
pub use transition::{EpisodeSource, Transition};
