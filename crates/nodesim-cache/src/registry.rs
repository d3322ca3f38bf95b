//! Session-scoped registry of frame caches.
//!
//! [`ComputeCacheRegistry`] is the in-memory [`CacheStore`]: a concurrent
//! map from [`ContextHash`] to a shared [`FrameCache`]. It lives exactly as
//! long as the evaluation session that owns it; invalidating the session
//! clears it.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use nodesim_core::ContextHash;

use crate::frame::FrameCache;
use crate::traits::CacheStore;

/// Summary of one cache bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct BucketStats {
    pub hash: ContextHash,
    pub frames: usize,
    pub first_time: Option<f32>,
    pub last_time: Option<f32>,
}

/// Map from context hash to frame cache.
#[derive(Debug)]
pub struct ComputeCacheRegistry<P> {
    caches: DashMap<ContextHash, Arc<FrameCache<P>>>,
}

impl<P> Default for ComputeCacheRegistry<P> {
    fn default() -> Self {
        ComputeCacheRegistry {
            caches: DashMap::new(),
        }
    }
}

impl<P: Clone + Send + Sync> ComputeCacheRegistry<P> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops one bucket, returning its cache.
    pub fn remove(&self, hash: ContextHash) -> Option<Arc<FrameCache<P>>> {
        self.caches.remove(&hash).map(|(_, cache)| cache)
    }

    /// Drops every bucket.
    pub fn clear(&self) {
        debug!(buckets = self.caches.len(), "clearing compute cache registry");
        self.caches.clear();
    }

    pub fn len(&self) -> usize {
        self.caches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.caches.is_empty()
    }

    /// Per-bucket summary, sorted by hash for stable output.
    pub fn stats(&self) -> Vec<BucketStats> {
        let mut stats: Vec<BucketStats> = self
            .caches
            .iter()
            .map(|entry| BucketStats {
                hash: *entry.key(),
                frames: entry.value().len(),
                first_time: entry.value().first().map(|f| f.time),
                last_time: entry.value().last().map(|f| f.time),
            })
            .collect();
        stats.sort_by_key(|s| s.hash);
        stats
    }
}

impl<P: Clone + Send + Sync> CacheStore<P> for ComputeCacheRegistry<P> {
    fn lookup_context(&self, hash: ContextHash) -> Option<Arc<FrameCache<P>>> {
        self.caches.get(&hash).map(|entry| Arc::clone(entry.value()))
    }

    fn get_or_create(&self, hash: ContextHash) -> Arc<FrameCache<P>> {
        let entry = self.caches.entry(hash).or_insert_with(|| {
            debug!(%hash, "creating frame cache");
            Arc::new(FrameCache::new())
        });
        Arc::clone(entry.value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nodesim_core::{ComputeContext, NodeId};

    fn hash_for(output: u32) -> ContextHash {
        ComputeContext::root("test")
            .simulation(NodeId::new(output).unwrap())
            .hash()
    }

    #[test]
    fn lookup_never_creates() {
        let registry: ComputeCacheRegistry<u8> = ComputeCacheRegistry::new();
        assert!(registry.lookup_context(hash_for(1)).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn get_or_create_returns_the_same_bucket() {
        let registry: ComputeCacheRegistry<u8> = ComputeCacheRegistry::new();
        let a = registry.get_or_create(hash_for(1));
        a.insert(1.0, 7).unwrap();
        let b = registry.get_or_create(hash_for(1));
        assert!(Arc::ptr_eq(&a, &b));

        let found = registry.lookup_context(hash_for(1)).unwrap();
        assert_eq!(found.first().map(|f| f.payload), Some(7));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn buckets_are_independent() {
        let registry: ComputeCacheRegistry<u8> = ComputeCacheRegistry::new();
        registry.get_or_create(hash_for(1)).insert(1.0, 1).unwrap();
        registry.get_or_create(hash_for(2)).insert(5.0, 2).unwrap();
        let one = registry.lookup_context(hash_for(1)).unwrap();
        assert_eq!(one.len(), 1);
        assert_eq!(one.value_before_time(10.0).map(|f| f.payload), Some(1));
    }

    #[test]
    fn remove_and_clear() {
        let registry: ComputeCacheRegistry<u8> = ComputeCacheRegistry::new();
        registry.get_or_create(hash_for(1));
        registry.get_or_create(hash_for(2));
        assert!(registry.remove(hash_for(1)).is_some());
        assert!(registry.lookup_context(hash_for(1)).is_none());
        registry.clear();
        assert!(registry.is_empty());
    }

    #[test]
    fn stats_describe_each_bucket() {
        let registry: ComputeCacheRegistry<u8> = ComputeCacheRegistry::new();
        let cache = registry.get_or_create(hash_for(3));
        cache.insert(2.0, 0).unwrap();
        cache.insert(4.0, 0).unwrap();
        let stats = registry.stats();
        assert_eq!(
            stats,
            vec![BucketStats {
                hash: hash_for(3),
                frames: 2,
                first_time: Some(2.0),
                last_time: Some(4.0),
            }]
        );
    }

    #[test]
    fn usable_as_trait_object() {
        let registry: ComputeCacheRegistry<u8> = ComputeCacheRegistry::new();
        let store: &dyn CacheStore<u8> = &registry;
        store.get_or_create(hash_for(1)).insert(0.0, 1).unwrap();
        assert!(store.lookup_context(hash_for(1)).is_some());
    }
}
