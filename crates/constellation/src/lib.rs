//! Constellation Point-Cloud Mapper
//!
//! Turns per-group band-power tables into renderable 3D points:
//! - x: channel index
//! - y: canonical band coordinate plus vertical jitter
//! - z: depth jitter scaled by log power
//! - size: log power normalised to the strongest point in view
//! - color: raw power

pub mod axis;
pub mod mapper;
pub mod params;
pub mod scene;

pub use axis::{band_y, y_axis_ticks, AxisTick};
pub use mapper::{map_points, PointCloudPoint};
pub use params::{GroupStyle, MapperParams, ViewParams};
pub use scene::{build_scene, ConstellationScene, GroupTrace};

use thiserror::Error;

/// Mapper error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MapperError {
    #[error("Invalid view parameter: {0}")]
    InvalidParameter(String),
}
