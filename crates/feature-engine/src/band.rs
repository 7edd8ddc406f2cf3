//! Canonical EEG frequency bands

use crate::error::FeatureError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Canonical EEG band, a half-open interval `[low, high)` in Hz
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Band {
    /// 1-4 Hz
    Delta,
    /// 4-8 Hz
    Theta,
    /// 8-14 Hz
    Alpha,
    /// 14-31 Hz
    Beta,
    /// 31-46 Hz
    Gamma,
}

impl Band {
    /// All bands in ascending frequency order
    pub const ALL: [Band; 5] = [Band::Delta, Band::Theta, Band::Alpha, Band::Beta, Band::Gamma];

    /// Frequency interval `(low, high)` in Hz, low inclusive
    pub fn range_hz(self) -> (f64, f64) {
        match self {
            Band::Delta => (1.0, 4.0),
            Band::Theta => (4.0, 8.0),
            Band::Alpha => (8.0, 14.0),
            Band::Beta => (14.0, 31.0),
            Band::Gamma => (31.0, 46.0),
        }
    }

    /// Display name
    pub fn name(self) -> &'static str {
        match self {
            Band::Delta => "Delta",
            Band::Theta => "Theta",
            Band::Alpha => "Alpha",
            Band::Beta => "Beta",
            Band::Gamma => "Gamma",
        }
    }

    /// Whether `freq_hz` lies in this band
    pub fn contains(self, freq_hz: f64) -> bool {
        let (low, high) = self.range_hz();
        freq_hz >= low && freq_hz < high
    }

    /// Band containing `freq_hz`, if any
    pub fn classify(freq_hz: f64) -> Option<Band> {
        Band::ALL.into_iter().find(|b| b.contains(freq_hz))
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Band {
    type Err = FeatureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Band::ALL
            .into_iter()
            .find(|b| b.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| FeatureError::UnknownBand(s.to_string()))
    }
}
