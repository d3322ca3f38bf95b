//! The [`CacheStore`] trait: the contract between simulation nodes and
//! whatever holds their frame caches.
//!
//! Readers only ever call [`CacheStore::lookup_context`], which never
//! creates anything, so a miss stays observable. The write path
//! ([`CacheStore::get_or_create`]) belongs to simulation output nodes.

use std::sync::Arc;

use nodesim_core::ContextHash;

use crate::frame::FrameCache;

/// Storage of frame caches keyed by compute context hash.
///
/// Implementations are shared across evaluation threads, so both methods
/// take `&self`.
pub trait CacheStore<P>: Send + Sync {
    /// Returns the cache of a bucket if one has been created.
    fn lookup_context(&self, hash: ContextHash) -> Option<Arc<FrameCache<P>>>;

    /// Returns the cache of a bucket, creating an empty one first if needed.
    fn get_or_create(&self, hash: ContextHash) -> Arc<FrameCache<P>>;
}
