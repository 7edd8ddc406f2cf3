//! Layered pipeline configuration

use crate::PipelineError;
use constellation::ViewParams;
use feature_engine::{GroupLabeler, SpectralConfig};
use fragment_store::{EpochShape, FragmentLayout};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable prefix, e.g. `EEG_CONSTELLATION__SPECTRAL__SEGMENT_LEN=128`
pub const ENV_PREFIX: &str = "EEG_CONSTELLATION";

/// Where and how to read fragment files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Directory holding the fragment files
    pub data_dir: PathBuf,
    /// Fragment pairs to read; `None` reads every contiguous pair found
    pub chunk_count: Option<usize>,
    /// Fragment file naming
    pub layout: FragmentLayout,
    /// Per-subject epoch dimensions used to reshape the features
    pub shape: EpochShape,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("chunks"),
            chunk_count: Some(10),
            layout: FragmentLayout::default(),
            shape: EpochShape::default(),
        }
    }
}

/// Full pipeline configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Fragment source
    pub loader: LoaderConfig,
    /// Welch settings
    pub spectral: SpectralConfig,
    /// Label to group mapping
    pub groups: GroupLabeler,
    /// View rendered by `eeg-constellation render`
    pub view: ViewParams,
    /// Jitter seed; fresh entropy when unset
    pub seed: Option<u64>,
}

impl PipelineConfig {
    /// Build from defaults, an optional TOML file and `EEG_CONSTELLATION__*` variables.
    ///
    /// Later sources override earlier ones.
    pub fn load(path: Option<&Path>) -> Result<Self, PipelineError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            info!("Reading configuration from {}", path.display());
            builder = builder.add_source(config::File::from(path));
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let settings: Self = builder.build()?.try_deserialize()?;
        debug!("Pipeline configuration: {:?}", settings);
        Ok(settings)
    }
}
