//! Memoization of loaded recordings and derived tables

use feature_engine::{FeatureRow, GroupLabeler, GroupTables, SpectralConfig};
use fragment_store::{EpochShape, FragmentLayout, Recording};
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// Identifies one loaded recording
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordingKey {
    /// Fragment directory
    pub dir: PathBuf,
    /// Fragment pairs read
    pub chunk_count: usize,
    pub layout: FragmentLayout,
    pub shape: EpochShape,
}

/// Identifies the feature and aggregate tables derived from a recording
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FeatureKey {
    pub recording: RecordingKey,
    /// Bit pattern of the sampling rate
    pub sample_rate_bits: u64,
    pub segment_len: usize,
    pub overlap: Option<usize>,
    pub labeler: GroupLabeler,
}

impl FeatureKey {
    /// Key for extracting `recording` with `spectral` and `labeler`
    pub fn new(recording: RecordingKey, spectral: &SpectralConfig, labeler: &GroupLabeler) -> Self {
        Self {
            recording,
            sample_rate_bits: spectral.sample_rate.to_bits(),
            segment_len: spectral.segment_len,
            overlap: spectral.overlap,
            labeler: labeler.clone(),
        }
    }
}

/// Lookup counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered from the cache
    pub hits: u64,
    /// Lookups that required recomputation
    pub misses: u64,
}

/// Process-local cache for the load, extract and aggregate stages.
///
/// Values are handed out as shared [`Arc`]s and never mutated after insertion.
#[derive(Debug, Default)]
pub struct FeatureCache {
    recordings: HashMap<RecordingKey, Arc<Recording>>,
    features: HashMap<FeatureKey, Arc<Vec<FeatureRow>>>,
    aggregates: HashMap<FeatureKey, Arc<GroupTables>>,
    stats: CacheStats,
}

impl FeatureCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached recording for `key`
    pub fn recording(&mut self, key: &RecordingKey) -> Option<Arc<Recording>> {
        lookup(&self.recordings, &mut self.stats, key, "recording")
    }

    /// Store a freshly loaded recording
    pub fn store_recording(&mut self, key: RecordingKey, recording: Recording) -> Arc<Recording> {
        store(&mut self.recordings, key, recording)
    }

    /// Cached feature rows for `key`
    pub fn features(&mut self, key: &FeatureKey) -> Option<Arc<Vec<FeatureRow>>> {
        lookup(&self.features, &mut self.stats, key, "features")
    }

    /// Store freshly extracted feature rows
    pub fn store_features(&mut self, key: FeatureKey, rows: Vec<FeatureRow>) -> Arc<Vec<FeatureRow>> {
        store(&mut self.features, key, rows)
    }

    /// Cached group tables for `key`
    pub fn aggregates(&mut self, key: &FeatureKey) -> Option<Arc<GroupTables>> {
        lookup(&self.aggregates, &mut self.stats, key, "aggregates")
    }

    /// Store freshly aggregated group tables
    pub fn store_aggregates(&mut self, key: FeatureKey, tables: GroupTables) -> Arc<GroupTables> {
        store(&mut self.aggregates, key, tables)
    }

    /// Hit and miss counts since creation
    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Total stored entries across all stages
    pub fn len(&self) -> usize {
        self.recordings.len() + self.features.len() + self.aggregates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry; counters are kept
    pub fn clear(&mut self) {
        info!("Clearing feature cache ({} entries)", self.len());
        self.recordings.clear();
        self.features.clear();
        self.aggregates.clear();
    }
}

fn lookup<K, V>(map: &HashMap<K, Arc<V>>, stats: &mut CacheStats, key: &K, stage: &str) -> Option<Arc<V>>
where
    K: Eq + Hash + Debug,
{
    match map.get(key) {
        Some(value) => {
            stats.hits += 1;
            debug!("Cache hit for {}", stage);
            Some(Arc::clone(value))
        }
        None => {
            stats.misses += 1;
            debug!("Cache miss for {}: {:?}", stage, key);
            None
        }
    }
}

fn store<K: Eq + Hash, V>(map: &mut HashMap<K, Arc<V>>, key: K, value: V) -> Arc<V> {
    let value = Arc::new(value);
    map.insert(key, Arc::clone(&value));
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    fn recording_key(dir: &str) -> RecordingKey {
        RecordingKey {
            dir: PathBuf::from(dir),
            chunk_count: 2,
            layout: FragmentLayout::default(),
            shape: EpochShape::default(),
        }
    }

    fn recording() -> Recording {
        Recording::new(Array3::zeros((1, 4, 2)), vec![1]).unwrap()
    }

    #[test]
    fn test_miss_then_hit() {
        let mut cache = FeatureCache::new();
        let key = recording_key("chunks");

        assert!(cache.recording(&key).is_none());
        let stored = cache.store_recording(key.clone(), recording());
        let cached = cache.recording(&key).unwrap();

        assert!(Arc::ptr_eq(&stored, &cached));
        assert_eq!(cache.stats(), CacheStats { hits: 1, misses: 1 });
    }

    #[test]
    fn test_distinct_keys_are_distinct_entries() {
        let mut cache = FeatureCache::new();
        cache.store_recording(recording_key("a"), recording());
        cache.store_recording(recording_key("b"), recording());
        assert_eq!(cache.len(), 2);

        let base = FeatureKey::new(recording_key("a"), &SpectralConfig::default(), &GroupLabeler::default());
        let other_rate = FeatureKey::new(
            recording_key("a"),
            &SpectralConfig {
                sample_rate: 128.0,
                ..Default::default()
            },
            &GroupLabeler::default(),
        );
        assert_ne!(base, other_rate);

        cache.store_features(base.clone(), Vec::new());
        assert!(cache.features(&other_rate).is_none());
        assert!(cache.features(&base).is_some());
    }

    #[test]
    fn test_clear_empties_but_keeps_counters() {
        let mut cache = FeatureCache::new();
        let key = FeatureKey::new(recording_key("a"), &SpectralConfig::default(), &GroupLabeler::default());
        cache.store_aggregates(key.clone(), GroupTables::default());
        assert!(cache.aggregates(&key).is_some());

        cache.clear();

        assert!(cache.is_empty());
        assert!(cache.aggregates(&key).is_none());
        assert_eq!(cache.stats(), CacheStats { hits: 1, misses: 1 });
    }
}
