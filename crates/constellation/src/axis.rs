//! Band axis layout

use feature_engine::Band;
use serde::{Deserialize, Serialize};

/// Vertical coordinate of a band (the band's center frequency in Hz)
pub fn band_y(band: Band) -> f64 {
    match band {
        Band::Delta => 2.5,
        Band::Theta => 6.0,
        Band::Alpha => 11.0,
        Band::Beta => 22.5,
        Band::Gamma => 38.5,
    }
}

/// Tick label for the y axis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisTick {
    pub label: String,
    pub value: f64,
}

/// One tick per band, ascending
pub fn y_axis_ticks() -> Vec<AxisTick> {
    Band::ALL
        .into_iter()
        .map(|band| AxisTick {
            label: band.name().to_string(),
            value: band_y(band),
        })
        .collect()
}
