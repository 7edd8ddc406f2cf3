//! Group-wise mean of band power

use crate::band::Band;
use crate::features::{FeatureRow, GroupLabeler};
use crate::statistics::mean_defined;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Mean band power of one channel across the subjects of a group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedRow {
    /// 0-based channel index
    pub channel: usize,
    pub band: Band,
    /// Group the mean was taken over
    pub group: String,
    /// Mean of the defined per-subject band powers
    pub mean_power: f64,
}

/// One aggregated table per group name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupTables {
    tables: BTreeMap<String, Vec<AggregatedRow>>,
}

impl GroupTables {
    /// Rows of `group`; empty if the group has no defined rows
    pub fn group(&self, group: &str) -> &[AggregatedRow] {
        self.tables.get(group).map(Vec::as_slice).unwrap_or(&[])
    }

    /// `(positive, negative)` tables per the labeler's group names
    pub fn pair(&self, labeler: &GroupLabeler) -> (&[AggregatedRow], &[AggregatedRow]) {
        (
            self.group(&labeler.positive_group),
            self.group(&labeler.negative_group),
        )
    }

    /// All groups with their rows
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[AggregatedRow])> {
        self.tables.iter().map(|(g, rows)| (g.as_str(), rows.as_slice()))
    }

    /// Total rows across groups
    pub fn row_count(&self) -> usize {
        self.tables.values().map(Vec::len).sum()
    }
}

/// Partition rows by group, then average power per (channel, band).
///
/// Undefined powers are excluded from the mean; a (channel, band) whose
/// powers are all undefined produces no row.
pub fn aggregate_by_group(rows: &[FeatureRow]) -> GroupTables {
    let mut buckets: BTreeMap<(&str, usize, Band), Vec<Option<f64>>> = BTreeMap::new();
    for row in rows {
        buckets
            .entry((row.group.as_str(), row.channel, row.band))
            .or_default()
            .push(row.power);
    }

    let mut tables: BTreeMap<String, Vec<AggregatedRow>> = BTreeMap::new();
    for ((group, channel, band), powers) in buckets {
        let table = tables.entry(group.to_string()).or_default();
        match mean_defined(powers) {
            Some(mean_power) => table.push(AggregatedRow {
                channel,
                band,
                group: group.to_string(),
                mean_power,
            }),
            None => debug!("Dropping {} channel {} {}: all powers undefined", group, channel, band),
        }
    }

    GroupTables { tables }
}
