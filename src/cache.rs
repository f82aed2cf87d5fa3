//! NFP memoisation cache.
//!
//! Entries live for exactly one evaluation batch: [`NfpCache::replace_batch`]
//! atomically swaps in a fresh map built from carried-over hits plus
//! newly computed misses, discarding anything not referenced by the
//! current batch.

use crate::nfp::{NfpKey, NfpValue};
use std::collections::HashMap;

#[derive(Debug, Default, Clone, Copy)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

#[derive(Default)]
pub struct NfpCache {
    entries: HashMap<NfpKey, NfpValue>,
    stats: CacheStats,
}

impl NfpCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &NfpKey) -> Option<&NfpValue> {
        self.entries.get(key)
    }

    /// Splits `keys` into those already cached (returned as a fresh map
    /// seeded from the current entries) and those that must be computed.
    pub fn partition_batch(&mut self, keys: &[NfpKey]) -> (HashMap<NfpKey, NfpValue>, Vec<NfpKey>) {
        let mut carried = HashMap::with_capacity(keys.len());
        let mut missing = Vec::new();
        for key in keys {
            if let Some(value) = self.entries.get(key) {
                carried.insert(*key, value.clone());
                self.stats.hits += 1;
            } else {
                missing.push(*key);
                self.stats.misses += 1;
            }
        }
        (carried, missing)
    }

    /// Atomically replaces the cache with `carried` plus `computed`,
    /// discarding every entry not referenced in the batch just finished.
    pub fn replace_batch(&mut self, mut carried: HashMap<NfpKey, NfpValue>, computed: Vec<(NfpKey, NfpValue)>) {
        for (key, value) in computed {
            carried.insert(key, value);
        }
        self.entries = carried;
    }

    /// Hit/miss counters accumulated since the cache (or the last explicit
    /// reset) was created. Instrumentation only, not part of the
    /// correctness contract.
    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = CacheStats::default();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nfp::NfpMode;
    use crate::shape::Polygon;

    fn dummy_value() -> NfpValue {
        NfpValue(vec![Polygon::new(0, vec![
            crate::shape::Point::new(0.0, 0.0),
            crate::shape::Point::new(1.0, 0.0),
            crate::shape::Point::new(1.0, 1.0),
        ])])
    }

    #[test]
    fn partition_then_replace_round_trips() {
        let mut cache = NfpCache::new();
        let k1 = NfpKey::new(1, 2, NfpMode::Inner, 0.0, 0.0);
        let k2 = NfpKey::new(2, 3, NfpMode::Outer, 0.0, 90.0);

        let (carried, missing) = cache.partition_batch(&[k1, k2]);
        assert!(carried.is_empty());
        assert_eq!(missing.len(), 2);
        assert_eq!(cache.stats().misses, 2);

        cache.replace_batch(carried, vec![(k1, dummy_value()), (k2, dummy_value())]);
        assert_eq!(cache.len(), 2);

        let (carried2, missing2) = cache.partition_batch(&[k1]);
        assert_eq!(carried2.len(), 1);
        assert!(missing2.is_empty());
        assert_eq!(cache.stats().hits, 1);
    }

    #[test]
    fn entries_not_referenced_are_discarded() {
        let mut cache = NfpCache::new();
        let k1 = NfpKey::new(1, 2, NfpMode::Inner, 0.0, 0.0);
        let k2 = NfpKey::new(2, 3, NfpMode::Outer, 0.0, 90.0);
        let (carried, _) = cache.partition_batch(&[k1, k2]);
        cache.replace_batch(carried, vec![(k1, dummy_value()), (k2, dummy_value())]);

        let (carried, missing) = cache.partition_batch(&[k1]);
        cache.replace_batch(carried, vec![]);
        assert!(missing.is_empty());
        assert_eq!(cache.len(), 1);
        assert!(cache.get(&k2).is_none());
    }
}
