//! Per-subject band power extraction

use crate::band::Band;
use crate::error::FeatureError;
use crate::welch::WelchEstimator;
use ndarray::{Array3, Axis};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Welch estimator settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpectralConfig {
    /// Sampling rate (Hz)
    pub sample_rate: f64,
    /// Samples per Welch segment
    pub segment_len: usize,
    /// Samples shared by consecutive segments (default: half a segment)
    pub overlap: Option<usize>,
}

impl Default for SpectralConfig {
    fn default() -> Self {
        Self {
            sample_rate: 256.0,
            segment_len: 256,
            overlap: None,
        }
    }
}

/// Maps raw label values to group names.
///
/// Labels equal to `positive_label` belong to `positive_group`, every other
/// value to `negative_group`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupLabeler {
    /// Raw label value of the positive group
    pub positive_label: i64,
    /// Name given to subjects with `positive_label`
    pub positive_group: String,
    /// Name given to every other subject
    pub negative_group: String,
}

impl Default for GroupLabeler {
    fn default() -> Self {
        Self {
            positive_label: 1,
            positive_group: "Alcoholic".to_string(),
            negative_group: "Non-Alcoholic".to_string(),
        }
    }
}

impl GroupLabeler {
    /// Group name for a raw label
    pub fn group_for(&self, label: i64) -> &str {
        if label == self.positive_label {
            &self.positive_group
        } else {
            &self.negative_group
        }
    }
}

/// Median band power of one channel of one subject
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    /// Subject index along axis 0 of the recording
    pub subject: usize,
    /// Group name from the labeler
    pub group: String,
    /// 0-based channel index
    pub channel: usize,
    pub band: Band,
    /// `None` when no frequency bin falls in the band
    pub power: Option<f64>,
}

/// Computes the [`FeatureRow`] table for a whole recording
pub struct FeatureExtractor {
    estimator: WelchEstimator,
    labeler: GroupLabeler,
}

impl FeatureExtractor {
    /// Create an extractor
    pub fn new(config: &SpectralConfig, labeler: GroupLabeler) -> Result<Self, FeatureError> {
        let overlap = config.overlap.unwrap_or(config.segment_len / 2);
        Ok(Self {
            estimator: WelchEstimator::with_overlap(config.sample_rate, config.segment_len, overlap)?,
            labeler,
        })
    }

    /// Label convention in use
    pub fn labeler(&self) -> &GroupLabeler {
        &self.labeler
    }

    /// One row per (subject, channel, band) of a `[subject, sample, channel]` tensor
    pub fn extract(&mut self, data: &Array3<f64>, labels: &[i64]) -> Result<Vec<FeatureRow>, FeatureError> {
        let (subjects, samples, channels) = data.dim();
        if labels.len() != subjects {
            return Err(FeatureError::LabelCountMismatch {
                labels: labels.len(),
                subjects,
            });
        }
        self.estimator.check_fits(samples)?;

        debug!(
            "Welch: {} segment(s) of {} samples, overlap {}",
            self.estimator.segment_count(samples),
            self.estimator.segment_len(),
            self.estimator.overlap()
        );

        let mut rows = Vec::with_capacity(subjects * channels * Band::ALL.len());
        let mut series = Vec::with_capacity(samples);
        let mut undefined = 0usize;

        for (subject, (epoch, &label)) in data.axis_iter(Axis(0)).zip(labels).enumerate() {
            let group = self.labeler.group_for(label).to_string();

            for (channel, column) in epoch.axis_iter(Axis(1)).enumerate() {
                series.clear();
                series.extend(column.iter().copied());
                let spectrum = self.estimator.estimate(&series)?;

                for band in Band::ALL {
                    let power = spectrum.band_median(band).filter(|p| !p.is_nan());
                    if power.is_none() {
                        undefined += 1;
                    }
                    rows.push(FeatureRow {
                        subject,
                        group: group.clone(),
                        channel,
                        band,
                        power,
                    });
                }
            }
        }

        if undefined > 0 {
            warn!(
                "{} of {} band powers are undefined (no frequency bins in band)",
                undefined,
                rows.len()
            );
        }
        info!(
            "Extracted {} feature rows from {} subjects x {} channels",
            rows.len(),
            subjects,
            channels
        );

        Ok(rows)
    }
}
