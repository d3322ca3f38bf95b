//! Cache error types for nodesim-cache.
//!
//! [`CacheError`] covers the invariant violations a frame cache refuses to
//! absorb. Misses are not errors: lookups return `Option`.

use thiserror::Error;

/// Errors produced by frame cache writes.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CacheError {
    /// A frame was inserted with a time earlier than the last stored frame.
    #[error("out-of-order insertion: time {time} precedes last cached time {last}")]
    OutOfOrderInsertion { time: f32, last: f32 },

    /// The frame time is not a number.
    #[error("invalid frame time: {time}")]
    InvalidTime { time: f32 },
}
