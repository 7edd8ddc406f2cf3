//! Scene assembly for the presentation layer

use crate::axis::{y_axis_ticks, AxisTick};
use crate::mapper::{map_points, PointCloudPoint};
use crate::params::{GroupStyle, ViewParams};
use crate::MapperError;
use feature_engine::{AggregatedRow, GroupLabeler, GroupTables};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Points of one group plus how to colour them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupTrace {
    /// Group name
    pub group: String,
    /// Colour-scale identifier passed through from the view
    pub color_scale: String,
    /// `(min, max)` of `color_value` in this trace; `None` when empty
    pub color_range: Option<(f64, f64)>,
    pub points: Vec<PointCloudPoint>,
}

/// Complete render input: one trace per visible group and the y-axis ticks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstellationScene {
    /// Visible groups, positive first
    pub traces: Vec<GroupTrace>,
    /// Band tick labels for the y axis
    pub y_axis: Vec<AxisTick>,
}

impl ConstellationScene {
    /// Trace for `group`, if visible
    pub fn trace(&self, group: &str) -> Option<&GroupTrace> {
        self.traces.iter().find(|t| t.group == group)
    }

    /// Points across all traces
    pub fn point_count(&self) -> usize {
        self.traces.iter().map(|t| t.points.len()).sum()
    }
}

/// Map both groups of `tables` under `view`.
///
/// Hidden groups are left out of the scene. Jitter is drawn fresh from
/// `rng` for every call.
pub fn build_scene<R: Rng + ?Sized>(
    tables: &GroupTables,
    labeler: &GroupLabeler,
    view: &ViewParams,
    rng: &mut R,
) -> Result<ConstellationScene, MapperError> {
    let (positive_rows, negative_rows) = tables.pair(labeler);
    let groups = [
        (&labeler.positive_group, positive_rows, &view.positive),
        (&labeler.negative_group, negative_rows, &view.negative),
    ];

    let mut traces = Vec::with_capacity(groups.len());
    for (group, rows, style) in groups {
        if !style.visible {
            debug!("Group {} hidden", group);
            continue;
        }
        traces.push(trace_for(group, rows, style, view, rng)?);
    }

    let scene = ConstellationScene {
        traces,
        y_axis: y_axis_ticks(),
    };
    info!(
        "Built scene with {} traces and {} points",
        scene.traces.len(),
        scene.point_count()
    );
    Ok(scene)
}

fn trace_for<R: Rng + ?Sized>(
    group: &str,
    rows: &[AggregatedRow],
    style: &GroupStyle,
    view: &ViewParams,
    rng: &mut R,
) -> Result<GroupTrace, MapperError> {
    let points = map_points(rows, &view.mapper, rng)?;
    let color_range = points.iter().map(|p| p.color_value).fold(None, |range, v| match range {
        None => Some((v, v)),
        Some((lo, hi)) => Some((f64::min(lo, v), f64::max(hi, v))),
    });

    Ok(GroupTrace {
        group: group.to_string(),
        color_scale: style.color_scale.clone(),
        color_range,
        points,
    })
}
