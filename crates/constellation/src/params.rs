//! View parameters supplied by the presentation layer

use crate::MapperError;
use feature_engine::{AggregatedRow, Band};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

/// Filtering and scaling for one mapping pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapperParams {
    /// Bands to show
    pub bands: Vec<Band>,
    /// 1-based inclusive channel range
    pub channel_range: (usize, usize),
    /// Size of the strongest point in view
    pub point_base_size: f64,
    /// Full width of the vertical jitter
    pub y_jitter: f64,
    /// Full width of the depth jitter before log-power scaling
    pub z_jitter: f64,
}

impl Default for MapperParams {
    fn default() -> Self {
        Self {
            bands: Band::ALL.to_vec(),
            channel_range: (1, 64),
            point_base_size: 15.0,
            y_jitter: 0.0,
            z_jitter: 0.0,
        }
    }
}

impl MapperParams {
    /// Reject values the mapper cannot honour
    pub fn validate(&self) -> Result<(), MapperError> {
        let (start, end) = self.channel_range;
        if start == 0 {
            return Err(MapperError::InvalidParameter(
                "channel range is 1-based; start must be at least 1".to_string(),
            ));
        }
        if start > end {
            return Err(MapperError::InvalidParameter(format!(
                "channel range start {start} exceeds end {end}"
            )));
        }
        for (name, value) in [
            ("point_base_size", self.point_base_size),
            ("y_jitter", self.y_jitter),
            ("z_jitter", self.z_jitter),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(MapperError::InvalidParameter(format!(
                    "{name} must be a non-negative number, got {value}"
                )));
            }
        }
        Ok(())
    }

    /// 0-based inclusive channel indices selected by `channel_range`
    pub fn channel_window(&self) -> RangeInclusive<usize> {
        let (start, end) = self.channel_range;
        start.saturating_sub(1)..=end.saturating_sub(1)
    }

    /// Whether `row` passes the band and channel filters
    pub fn accepts(&self, row: &AggregatedRow) -> bool {
        self.bands.contains(&row.band) && self.channel_window().contains(&row.channel)
    }
}

/// Per-group presentation settings, passed through untouched
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupStyle {
    /// Whether the group is drawn at all
    pub visible: bool,
    /// Opaque colour-scale identifier for the renderer
    pub color_scale: String,
}

impl Default for GroupStyle {
    fn default() -> Self {
        Self {
            visible: true,
            color_scale: "Viridis".to_string(),
        }
    }
}

/// Everything the presentation layer controls
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewParams {
    /// Filtering and scaling shared by both groups
    pub mapper: MapperParams,
    /// Style of the group labelled positive (e.g. Alcoholic)
    pub positive: GroupStyle,
    /// Style of the other group
    pub negative: GroupStyle,
}

impl Default for ViewParams {
    fn default() -> Self {
        Self {
            mapper: MapperParams::default(),
            positive: GroupStyle {
                visible: true,
                color_scale: "Reds".to_string(),
            },
            negative: GroupStyle {
                visible: true,
                color_scale: "Blues".to_string(),
            },
        }
    }
}
