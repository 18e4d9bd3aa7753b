//! LRU cache of designed filters
//!
//! Designs are pure functions of (target, reference, taps, sample rate), so
//! repeated requests share one immutable [`FirFilter`].

use crate::error::Result;
use crate::fir::FirFilter;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tracing::debug;

/// Cache key; phon levels are keyed on the 0.1 phon design grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct DesignKey {
    target_tenths: i64,
    reference_tenths: i64,
    taps: usize,
    sample_rate: u32,
}

impl DesignKey {
    fn new(target_phon: f64, reference_phon: f64, taps: usize, sample_rate: u32) -> Self {
        Self {
            target_tenths: (target_phon * 10.0).round() as i64,
            reference_tenths: (reference_phon * 10.0).round() as i64,
            taps,
            sample_rate,
        }
    }
}

/// Designed filters keyed by design parameters
pub struct FilterCache {
    designs: LruCache<DesignKey, Arc<FirFilter>>,
    hits: u64,
    misses: u64,
}

impl FilterCache {
    /// Create a cache holding at most `capacity` filters (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            designs: LruCache::new(capacity),
            hits: 0,
            misses: 0,
        }
    }

    /// Return the cached design or design and remember it
    pub fn get_or_design(
        &mut self,
        target_phon: f64,
        reference_phon: f64,
        taps: usize,
        sample_rate: u32,
    ) -> Result<Arc<FirFilter>> {
        let key = DesignKey::new(target_phon, reference_phon, taps, sample_rate);

        if let Some(filter) = self.designs.get(&key) {
            self.hits += 1;
            return Ok(Arc::clone(filter));
        }

        self.misses += 1;
        let filter = Arc::new(FirFilter::design(
            target_phon,
            reference_phon,
            taps,
            sample_rate,
        )?);
        debug!(target_phon, reference_phon, taps, sample_rate, "Cached new FIR design");
        self.designs.put(key, Arc::clone(&filter));
        Ok(filter)
    }

    /// Number of cached designs
    pub fn len(&self) -> usize {
        self.designs.len()
    }

    /// True if nothing is cached
    pub fn is_empty(&self) -> bool {
        self.designs.is_empty()
    }

    /// Lookups served from the cache
    pub fn hits(&self) -> u64 {
        self.hits
    }

    /// Lookups that required a new design
    pub fn misses(&self) -> u64 {
        self.misses
    }

    /// Drop every cached design
    pub fn clear(&mut self) {
        self.designs.clear();
    }
}

impl Default for FilterCache {
    fn default() -> Self {
        Self::new(32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeated_design_is_shared() {
        let mut cache = FilterCache::new(4);
        let a = cache.get_or_design(60.0, 80.0, 129, 48000).unwrap();
        let b = cache.get_or_design(60.0, 80.0, 129, 48000).unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.hits(), 1);
        assert_eq!(cache.misses(), 1);
    }

    #[test]
    fn test_sub_grid_levels_share_a_design() {
        let mut cache = FilterCache::new(4);
        let a = cache.get_or_design(60.01, 80.0, 129, 48000).unwrap();
        let b = cache.get_or_design(60.0, 80.0, 129, 48000).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_evicts_least_recently_used() {
        let mut cache = FilterCache::new(2);
        cache.get_or_design(40.0, 80.0, 65, 48000).unwrap();
        cache.get_or_design(50.0, 80.0, 65, 48000).unwrap();
        cache.get_or_design(60.0, 80.0, 65, 48000).unwrap();
        assert_eq!(cache.len(), 2);

        // 40 phon was evicted and needs a fresh design
        cache.get_or_design(40.0, 80.0, 65, 48000).unwrap();
        assert_eq!(cache.misses(), 4);
    }

    #[test]
    fn test_errors_are_not_cached() {
        let mut cache = FilterCache::new(2);
        assert!(cache.get_or_design(5.0, 80.0, 65, 48000).is_err());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_zero_capacity_still_caches_one() {
        let mut cache = FilterCache::new(0);
        cache.get_or_design(60.0, 80.0, 33, 48000).unwrap();
        assert_eq!(cache.len(), 1);
    }
}
