//! Feature Engineering Engine
//!
//! Welch power spectral density per (subject, channel), reduced to median
//! power per canonical EEG band, then averaged per group.

mod aggregate;
mod band;
mod error;
mod features;
mod statistics;
mod welch;

pub use aggregate::{aggregate_by_group, AggregatedRow, GroupTables};
pub use band::Band;
pub use error::FeatureError;
pub use features::{FeatureExtractor, FeatureRow, GroupLabeler, SpectralConfig};
pub use statistics::{mean_defined, median};
pub use welch::{Spectrum, WelchEstimator};
