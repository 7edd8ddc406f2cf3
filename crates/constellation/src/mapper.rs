//! Aggregated rows to 3D points

use crate::axis::band_y;
use crate::params::MapperParams;
use crate::MapperError;
use feature_engine::{AggregatedRow, Band};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One renderable point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointCloudPoint {
    /// 0-based channel index (x axis)
    pub channel: usize,
    /// Band coordinate plus vertical jitter
    pub y: f64,
    /// Depth jitter scaled by log power
    pub z: f64,
    /// Marker size, `point_base_size` for the strongest point
    pub size: f64,
    /// Raw mean power for the colour scale
    pub color_value: f64,
    pub band: Band,
    /// Group of the source row
    pub group: String,
}

/// Filter `rows` and map them to points.
///
/// Jitter is drawn from `rng` on every call. Sizes are normalised so the
/// strongest point in the filtered set has exactly `point_base_size`; if
/// every power is zero all sizes are zero.
pub fn map_points<R: Rng + ?Sized>(
    rows: &[AggregatedRow],
    params: &MapperParams,
    rng: &mut R,
) -> Result<Vec<PointCloudPoint>, MapperError> {
    params.validate()?;

    let selected: Vec<&AggregatedRow> = rows.iter().filter(|r| params.accepts(r)).collect();
    if selected.is_empty() {
        debug!("No rows pass the band/channel filter");
        return Ok(Vec::new());
    }

    let max_log_power = selected
        .iter()
        .map(|r| r.mean_power.ln_1p())
        .fold(0.0, f64::max);

    let points = selected
        .into_iter()
        .map(|row| {
            let log_power = row.mean_power.ln_1p();
            let y = band_y(row.band) + symmetric_jitter(rng, params.y_jitter);
            let z = symmetric_jitter(rng, params.z_jitter) * log_power;
            let size = if max_log_power > 0.0 {
                params.point_base_size * (log_power / max_log_power)
            } else {
                0.0
            };

            PointCloudPoint {
                channel: row.channel,
                y,
                z,
                size,
                color_value: row.mean_power,
                band: row.band,
                group: row.group.clone(),
            }
        })
        .collect::<Vec<_>>();

    debug!(
        "Mapped {} of {} rows (max log1p power {:.4})",
        points.len(),
        rows.len(),
        max_log_power
    );

    Ok(points)
}

/// Uniform draw in `[-width/2, width/2]`
fn symmetric_jitter<R: Rng + ?Sized>(rng: &mut R, width: f64) -> f64 {
    let half = width / 2.0;
    rng.gen_range(-half..=half)
}
