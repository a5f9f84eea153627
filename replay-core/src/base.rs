//! Core interfaces of replay buffers.
mod batch;
mod replay_buffer;
pub use batch::BatchBase;
pub use replay_buffer::{ExperienceBufferBase, ReplayBufferBase, SampleIndex};
