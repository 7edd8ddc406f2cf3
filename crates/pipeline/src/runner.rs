//! Load, extract, aggregate and map with memoized intermediate tables

use crate::cache::{FeatureCache, FeatureKey, RecordingKey};
use crate::settings::PipelineConfig;
use crate::PipelineError;
use constellation::{build_scene, ConstellationScene, ViewParams};
use feature_engine::{aggregate_by_group, FeatureExtractor, FeatureRow, GroupTables};
use fragment_store::{ChunkedLoader, Recording};
use rand::Rng;
use std::sync::Arc;
use tracing::info;

/// Runs the stages for one configuration, reusing results across calls
pub struct Pipeline {
    settings: PipelineConfig,
    cache: FeatureCache,
}

impl Pipeline {
    /// Create a pipeline with an empty cache
    pub fn new(settings: PipelineConfig) -> Self {
        Self::with_cache(settings, FeatureCache::new())
    }

    /// Create a pipeline around an existing cache
    pub fn with_cache(settings: PipelineConfig, cache: FeatureCache) -> Self {
        Self { settings, cache }
    }

    pub fn settings(&self) -> &PipelineConfig {
        &self.settings
    }

    /// Replace the configuration; cached entries for other settings stay valid
    pub fn set_settings(&mut self, settings: PipelineConfig) {
        self.settings = settings;
    }

    pub fn cache(&self) -> &FeatureCache {
        &self.cache
    }

    /// Forget every cached table so the next call recomputes
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    /// Loaded recording, read from disk on first use
    pub fn recording(&mut self) -> Result<Arc<Recording>, PipelineError> {
        let key = self.recording_key();
        if let Some(recording) = self.cache.recording(&key) {
            return Ok(recording);
        }

        let loader = ChunkedLoader::new(key.layout.clone(), key.shape);
        let recording = loader.load(&key.dir, key.chunk_count)?;
        Ok(self.cache.store_recording(key, recording))
    }

    /// Per-subject band power rows
    pub fn features(&mut self) -> Result<Arc<Vec<FeatureRow>>, PipelineError> {
        let key = self.feature_key();
        if let Some(rows) = self.cache.features(&key) {
            return Ok(rows);
        }

        let recording = self.recording()?;
        let mut extractor = FeatureExtractor::new(&self.settings.spectral, self.settings.groups.clone())?;
        let rows = extractor.extract(&recording.data, &recording.labels)?;
        Ok(self.cache.store_features(key, rows))
    }

    /// Group mean tables
    pub fn group_tables(&mut self) -> Result<Arc<GroupTables>, PipelineError> {
        let key = self.feature_key();
        if let Some(tables) = self.cache.aggregates(&key) {
            return Ok(tables);
        }

        let rows = self.features()?;
        let tables = aggregate_by_group(&rows);
        info!(
            "Aggregated {} feature rows into {} group rows",
            rows.len(),
            tables.row_count()
        );
        Ok(self.cache.store_aggregates(key, tables))
    }

    /// Scene for `view`; jitter comes from `rng` and is never cached
    pub fn render<R: Rng + ?Sized>(
        &mut self,
        view: &ViewParams,
        rng: &mut R,
    ) -> Result<ConstellationScene, PipelineError> {
        let tables = self.group_tables()?;
        Ok(build_scene(&tables, &self.settings.groups, view, rng)?)
    }

    /// Scene for the configured view
    pub fn render_configured<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<ConstellationScene, PipelineError> {
        let view = self.settings.view.clone();
        self.render(&view, rng)
    }

    fn recording_key(&self) -> RecordingKey {
        let loader = &self.settings.loader;
        let chunk_count = loader
            .chunk_count
            .unwrap_or_else(|| loader.layout.discover(&loader.data_dir));
        RecordingKey {
            dir: loader.data_dir.clone(),
            chunk_count,
            layout: loader.layout.clone(),
            shape: loader.shape,
        }
    }

    fn feature_key(&self) -> FeatureKey {
        FeatureKey::new(self.recording_key(), &self.settings.spectral, &self.settings.groups)
    }
}
