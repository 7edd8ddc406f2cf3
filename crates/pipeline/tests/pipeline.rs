//! End-to-end runs over fragments written by the splitter

use constellation::ViewParams;
use feature_engine::{Band, FeatureError, SpectralConfig};
use fragment_store::{Archive, ArchiveEntry, ArchiveKeys, EpochShape, FragmentLayout, LoadError, Splitter};
use ndarray::{Array, ArrayD, IxDyn};
use pipeline::{CacheStats, LoaderConfig, Pipeline, PipelineConfig, PipelineError};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::BTreeMap;
use std::f64::consts::PI;
use std::path::Path;
use std::sync::Arc;

const SAMPLES: usize = 256;
const CHANNELS: usize = 2;

/// Two subjects, labels [1, 0], every channel a 2 Hz sinusoid
fn write_fragments(dir: &Path) {
    let features = Array::from_shape_fn(IxDyn(&[2, SAMPLES, CHANNELS]), |ix| {
        let amplitude = 1.0 + ix[0] as f64 + 0.5 * ix[2] as f64;
        amplitude * (2.0 * PI * 2.0 * ix[1] as f64 / SAMPLES as f64).sin()
    });
    let labels = ArrayD::from_shape_vec(IxDyn(&[2]), vec![1i64, 0]).unwrap();

    let mut entries = BTreeMap::new();
    entries.insert("input".to_string(), ArchiveEntry::Float(features));
    entries.insert("label".to_string(), ArchiveEntry::Int(labels));

    let summary = Splitter::new(FragmentLayout::default(), ArchiveKeys::default())
        .split(&Archive::Keyed(entries), dir, 2)
        .unwrap();
    assert!(summary.labels_written);
}

fn settings(dir: &Path) -> PipelineConfig {
    PipelineConfig {
        loader: LoaderConfig {
            data_dir: dir.to_path_buf(),
            chunk_count: Some(2),
            layout: FragmentLayout::default(),
            shape: EpochShape {
                samples: SAMPLES,
                channels: CHANNELS,
            },
        },
        ..Default::default()
    }
}

#[test]
fn test_two_hertz_scenario() {
    let dir = tempfile::tempdir().unwrap();
    write_fragments(dir.path());
    let mut pipeline = Pipeline::new(settings(dir.path()));

    assert_eq!(pipeline.features().unwrap().len(), 2 * CHANNELS * Band::ALL.len());

    let tables = pipeline.group_tables().unwrap();
    for group in ["Alcoholic", "Non-Alcoholic"] {
        let rows = tables.group(group);
        assert_eq!(rows.len(), 10, "group {group}");

        for channel in 0..CHANNELS {
            let power = |band: Band| {
                rows.iter()
                    .find(|r| r.channel == channel && r.band == band)
                    .map(|r| r.mean_power)
                    .unwrap()
            };
            let delta = power(Band::Delta);
            for band in [Band::Theta, Band::Alpha, Band::Beta, Band::Gamma] {
                assert!(delta > power(band), "{group} channel {channel}: {band} >= Delta");
            }
        }
    }
}

#[test]
fn test_repeated_calls_hit_cache() {
    let dir = tempfile::tempdir().unwrap();
    write_fragments(dir.path());
    let mut pipeline = Pipeline::new(settings(dir.path()));

    let first = pipeline.group_tables().unwrap();
    assert_eq!(pipeline.cache().stats(), CacheStats { hits: 0, misses: 3 });

    // fragments are no longer needed once cached
    std::fs::remove_dir_all(dir.path()).unwrap();

    let second = pipeline.group_tables().unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(pipeline.cache().stats().hits, 1);

    let mut rng = StdRng::seed_from_u64(1);
    let scene = pipeline.render(&ViewParams::default(), &mut rng).unwrap();
    assert_eq!(scene.point_count(), 20);
    assert_eq!(pipeline.cache().stats().hits, 2);

    pipeline.clear_cache();
    assert!(pipeline.cache().is_empty());
    assert!(matches!(
        pipeline.group_tables(),
        Err(PipelineError::Load(LoadError::MissingFragment { .. }))
    ));
}

#[test]
fn test_distinct_spectral_settings_get_own_entries() {
    let dir = tempfile::tempdir().unwrap();
    write_fragments(dir.path());
    let mut pipeline = Pipeline::new(settings(dir.path()));

    let full = pipeline.group_tables().unwrap();

    let mut halved = settings(dir.path());
    halved.spectral = SpectralConfig {
        segment_len: 128,
        ..Default::default()
    };
    pipeline.set_settings(halved);
    let short = pipeline.group_tables().unwrap();

    assert!(!Arc::ptr_eq(&full, &short));
    // recording + two feature tables + two aggregate tables
    assert_eq!(pipeline.cache().len(), 5);
}

#[test]
fn test_seeded_render_is_reproducible() {
    let dir = tempfile::tempdir().unwrap();
    write_fragments(dir.path());
    let mut view = ViewParams::default();
    view.mapper.y_jitter = 2.0;
    view.mapper.z_jitter = 4.0;

    let mut pipeline = Pipeline::new(settings(dir.path()));
    let a = pipeline.render(&view, &mut StdRng::seed_from_u64(42)).unwrap();
    let b = pipeline.render(&view, &mut StdRng::seed_from_u64(42)).unwrap();
    assert_eq!(a, b);

    let json = serde_json::to_string(&a).unwrap();
    assert!(json.contains("\"Alcoholic\""));
}

#[test]
fn test_missing_fragments_abort() {
    let dir = tempfile::tempdir().unwrap();
    let mut pipeline = Pipeline::new(settings(dir.path()));

    let err = pipeline.render(&ViewParams::default(), &mut StdRng::seed_from_u64(0)).unwrap_err();
    assert!(matches!(err, PipelineError::Load(LoadError::MissingFragment { .. })));
    assert!(pipeline.cache().is_empty());
}

#[test]
fn test_discovered_chunk_count() {
    let dir = tempfile::tempdir().unwrap();
    write_fragments(dir.path());
    let mut config = settings(dir.path());
    config.loader.chunk_count = None;

    let mut pipeline = Pipeline::new(config);
    assert_eq!(pipeline.recording().unwrap().subjects(), 2);
}

#[test]
fn test_segment_longer_than_epoch_fails() {
    let dir = tempfile::tempdir().unwrap();
    write_fragments(dir.path());
    let mut config = settings(dir.path());
    config.spectral.segment_len = 512;

    let mut pipeline = Pipeline::new(config);
    assert!(matches!(
        pipeline.group_tables(),
        Err(PipelineError::Feature(FeatureError::InsufficientSamples { .. }))
    ));
}
