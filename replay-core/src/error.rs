//! Errors in the library.
use thiserror::Error;

/// Errors raised by replay buffers.
///
/// All of them indicate a protocol violation on the caller side and are
/// surfaced immediately; the buffer never clamps or repairs its inputs.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReplayBufferError {
    /// The buffer was configured with a capacity of zero.
    #[error("Capacity must be positive, got {0}")]
    Capacity(usize),

    /// A configuration value is out of its valid range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Sampling was requested from a buffer holding no transitions.
    #[error("Cannot sample from an empty replay buffer")]
    EmptyBuffer,

    /// A priority update carried a non-positive priority, a priority whose
    /// `priority^alpha` the trees cannot hold, or mismatched lengths.
    #[error("Invalid priority update: {0}")]
    InvalidPriority(String),

    /// A priority update referred to a slot outside `[0, len)`.
    #[error("Index {ix} is out of range for a buffer holding {len} transitions")]
    IndexRange {
        /// Offending slot index.
        ix: usize,
        /// Number of transitions in the buffer.
        len: usize,
    },

    /// Prioritized sampling was requested with a non-positive or infinite `beta`.
    #[error("Beta must be positive and finite, got {0}")]
    BetaRange(f32),

    /// A priority update referred to a slot overwritten since it was sampled.
    #[error("Slot {ix} was overwritten (generation {expected} expected, found {found})")]
    StaleIndex {
        /// Slot index.
        ix: usize,
        /// Generation handed out with the index.
        expected: u64,
        /// Generation currently stored in the slot.
        found: u64,
    },

    /// A transition named a worker outside `[0, worker_size)`.
    #[error("Worker {worker} is out of range, worker_size = {worker_size}")]
    InvalidWorker {
        /// Worker id given with the transition.
        worker: usize,
        /// Number of workers the buffer was configured for.
        worker_size: usize,
    },
}
