//! Time-ordered storage of one simulation boundary's computed frames.
//!
//! A [`FrameCache`] is shared between the paired input and output nodes of
//! a simulation and any number of concurrent readers. Frames are appended
//! under a write lock after checking the new time against the last stored
//! one, so the stored sequence is always sorted by time and a reader never
//! sees a later frame without every earlier one.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::CacheError;

/// One committed simulation state.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedFrame<P> {
    /// Simulation time the frame was committed at.
    pub time: f32,
    pub payload: P,
}

/// Frames of one context-hash bucket, ascending by time.
#[derive(Debug)]
pub struct FrameCache<P> {
    frames: RwLock<Vec<CachedFrame<P>>>,
}

impl<P> Default for FrameCache<P> {
    fn default() -> Self {
        FrameCache {
            frames: RwLock::new(Vec::new()),
        }
    }
}

impl<P: Clone> FrameCache<P> {
    pub fn new() -> Self {
        Self::default()
    }

    // A panic while holding the lock cannot leave the Vec half-pushed.
    fn read(&self) -> RwLockReadGuard<'_, Vec<CachedFrame<P>>> {
        self.frames.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<CachedFrame<P>>> {
        self.frames.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends a frame.
    ///
    /// `time` must not be earlier than the last inserted time; equal times
    /// are accepted and the newer frame shadows the older one in lookups.
    pub fn insert(&self, time: f32, payload: P) -> Result<(), CacheError> {
        if time.is_nan() {
            return Err(CacheError::InvalidTime { time });
        }
        let mut frames = self.write();
        if let Some(last) = frames.last() {
            if time < last.time {
                return Err(CacheError::OutOfOrderInsertion {
                    time,
                    last: last.time,
                });
            }
        }
        frames.push(CachedFrame { time, payload });
        Ok(())
    }

    /// Returns the latest frame whose time is `<= time`.
    ///
    /// This lets a simulation resume from the most recent earlier state
    /// when the requested time was never committed exactly.
    pub fn value_before_time(&self, time: f32) -> Option<CachedFrame<P>> {
        let frames = self.read();
        let end = frames.partition_point(|frame| frame.time <= time);
        end.checked_sub(1).map(|i| frames[i].clone())
    }

    /// Returns the latest frame committed at exactly `time`.
    pub fn value_at_time(&self, time: f32) -> Option<CachedFrame<P>> {
        self.value_before_time(time)
            .filter(|frame| frame.time == time)
    }

    pub fn first(&self) -> Option<CachedFrame<P>> {
        self.read().first().cloned()
    }

    pub fn last(&self) -> Option<CachedFrame<P>> {
        self.read().last().cloned()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Copy of every stored frame, ascending by time.
    pub fn frames(&self) -> Vec<CachedFrame<P>> {
        self.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::Arc;

    fn cache_with(times: &[f32]) -> FrameCache<usize> {
        let cache = FrameCache::new();
        for (i, &t) in times.iter().enumerate() {
            cache.insert(t, i).unwrap();
        }
        cache
    }

    #[test]
    fn empty_cache_has_nothing() {
        let cache: FrameCache<()> = FrameCache::new();
        assert!(cache.is_empty());
        assert!(cache.value_before_time(10.0).is_none());
        assert!(cache.first().is_none());
        assert!(cache.last().is_none());
    }

    #[test]
    fn value_before_time_picks_latest_earlier_frame() {
        let cache = cache_with(&[1.0, 2.0, 5.0]);
        assert_eq!(cache.value_before_time(4.0).map(|f| f.time), Some(2.0));
        assert_eq!(cache.value_before_time(5.0).map(|f| f.time), Some(5.0));
        assert_eq!(cache.value_before_time(100.0).map(|f| f.time), Some(5.0));
        assert!(cache.value_before_time(0.5).is_none());
    }

    #[test]
    fn duplicate_times_resolve_to_newest() {
        let cache = cache_with(&[1.0, 3.0, 3.0]);
        assert_eq!(cache.value_before_time(3.0).map(|f| f.payload), Some(2));
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn exact_lookup() {
        let cache = cache_with(&[1.0, 2.0]);
        assert!(cache.value_at_time(2.0).is_some());
        assert!(cache.value_at_time(1.5).is_none());
    }

    #[test]
    fn first_is_earliest() {
        let cache = cache_with(&[4.0, 6.0, 9.0]);
        assert_eq!(cache.first().map(|f| f.time), Some(4.0));
        assert_eq!(cache.last().map(|f| f.time), Some(9.0));
    }

    #[test]
    fn out_of_order_insert_is_rejected() {
        let cache = cache_with(&[1.0, 5.0]);
        let err = cache.insert(3.0, 99).unwrap_err();
        assert_eq!(err, CacheError::OutOfOrderInsertion { time: 3.0, last: 5.0 });
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.value_before_time(4.0).map(|f| f.payload), Some(0));
    }

    #[test]
    fn nan_time_is_rejected() {
        let cache: FrameCache<()> = FrameCache::new();
        assert!(matches!(
            cache.insert(f32::NAN, ()),
            Err(CacheError::InvalidTime { .. })
        ));
        assert!(cache.is_empty());
    }

    #[test]
    fn readers_observe_a_sorted_prefix_while_writing() {
        let cache = Arc::new(FrameCache::<u32>::new());
        std::thread::scope(|scope| {
            let writer = Arc::clone(&cache);
            scope.spawn(move || {
                for frame in 0..500u32 {
                    writer.insert(frame as f32, frame).unwrap();
                }
            });
            for _ in 0..4 {
                let reader = Arc::clone(&cache);
                scope.spawn(move || {
                    for _ in 0..200 {
                        let frames = reader.frames();
                        for (i, frame) in frames.iter().enumerate() {
                            assert_eq!(frame.payload, i as u32);
                        }
                        if let Some(latest) = reader.value_before_time(1000.0) {
                            assert!(reader.len() > latest.payload as usize);
                        }
                    }
                });
            }
        });
        assert_eq!(cache.len(), 500);
    }

    proptest! {
        #[test]
        fn returns_greatest_time_not_after_query(
            mut times in prop::collection::vec(-100.0f32..100.0, 1..40),
            query in -150.0f32..150.0,
        ) {
            times.sort_by(f32::total_cmp);
            times.dedup();
            let cache = cache_with(&times);

            let expected = times.iter().copied().filter(|&t| t <= query).last();
            let found = cache.value_before_time(query).map(|f| f.time);
            prop_assert_eq!(found, expected);
            if query < times[0] {
                prop_assert!(found.is_none());
            }
        }

        #[test]
        fn descending_insert_always_fails(a in 0.0f32..50.0, delta in 0.001f32..50.0) {
            let cache = cache_with(&[a + delta]);
            let rejected = cache.insert(a, 1).is_err();
            prop_assert!(rejected);
        }
    }
}
