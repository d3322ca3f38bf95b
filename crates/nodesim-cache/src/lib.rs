//! Frame caches for time-stepped simulation nodes.
//!
//! Simulation state is stored per compute context: each distinct call path
//! to a simulation pairing gets its own [`FrameCache`], found in a
//! session-scoped [`ComputeCacheRegistry`] by [`nodesim_core::ContextHash`].
//!
//! # Modules
//!
//! - [`error`]: CacheError enum for rejected writes
//! - [`frame`]: CachedFrame and the time-ordered FrameCache
//! - [`traits`]: CacheStore trait definition
//! - [`registry`]: ComputeCacheRegistry in-memory implementation

pub mod error;
pub mod frame;
pub mod registry;
pub mod traits;

// Re-export key types for ergonomic use.
pub use error::CacheError;
pub use frame::{CachedFrame, FrameCache};
pub use registry::{BucketStats, ComputeCacheRegistry};
pub use traits::CacheStore;
