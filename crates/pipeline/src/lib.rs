//! EEG Constellation Pipeline
//!
//! Wires the fragment loader, spectral extractor, group aggregator and
//! point-cloud mapper together behind an explicit cache, and provides the
//! configuration and logging setup used by the `eeg-constellation` binary.

mod cache;
mod runner;
mod settings;

pub use cache::{CacheStats, FeatureCache, FeatureKey, RecordingKey};
pub use runner::Pipeline;
pub use settings::{LoaderConfig, PipelineConfig, ENV_PREFIX};

use constellation::MapperError;
use feature_engine::FeatureError;
use fragment_store::{LoadError, SplitError};
use thiserror::Error;
use tracing::{warn, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Pipeline error types
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Load failed: {0}")]
    Load(#[from] LoadError),

    #[error("Split failed: {0}")]
    Split(#[from] SplitError),

    #[error("Feature extraction failed: {0}")]
    Feature(#[from] FeatureError),

    #[error("Mapping failed: {0}")]
    Mapper(#[from] MapperError),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over `level`. `json` switches to one JSON
/// object per line.
pub fn init_logging(level: Level, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()));
    let builder = FmtSubscriber::builder().with_env_filter(filter).with_target(true);

    let result = if json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    };

    if result.is_err() {
        warn!("Tracing subscriber already installed");
    }
}
