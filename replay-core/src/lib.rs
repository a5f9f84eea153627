#![warn(missing_docs)]
//! Experience replay buffers for reinforcement learning.
//!
//! The crate provides a bounded, overwrite-on-full store of transitions with
//! - uniform sampling,
//! - prioritized sampling backed by order-statistics trees,
//! - n-step discounted returns over temporally linked transitions.
//!
//! The variants are configurations of a single [`ReplayBuffer`], selected with
//! [`ReplayBufferConfig`]. Errors are reported as [`ReplayBufferError`] inside
//! [`anyhow::Error`].
pub mod error;
pub mod replay_buffer;
pub mod tree;

mod base;
pub use base::{BatchBase, ExperienceBufferBase, ReplayBufferBase, SampleIndex};
pub use error::ReplayBufferError;
pub use replay_buffer::{
    ArrayBatch, EpisodeKey, EpisodeSource, EpisodicConfig, IwScheduler, MultiArrayBatch,
    PerConfig, ReplayBuffer, ReplayBufferConfig, Transition, TransitionBatch,
};
pub use tree::{MinTree, OrderStatTree, SumTree};
