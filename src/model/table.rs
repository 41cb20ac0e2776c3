//! Table rows derived from aggregated statistics, in display order.

use crate::model::aggregate::{AggregatedMemory, AggregatedTiming};
use crate::trace::Category;

use std::cmp::Ordering;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub struct TimingRow {
    pub operation: String,
    /// Share of the summed mean times; 0 when that sum is 0.
    pub percentage: f64,
    pub time_mean: f64,
    pub time_std: f64,
    pub instances_mean: f64,
    pub instances_std: f64,
    pub category: Category,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimingTable {
    /// Sorted by `time_mean` descending, then operation name.
    pub rows: Vec<TimingRow>,
    pub total_time: f64,
    pub total_instances: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemoryRow {
    pub direction: String,
    pub bytes_mean: f64,
    pub bytes_std: f64,
    pub count_mean: f64,
    pub count_std: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemoryTable {
    /// Sorted by `bytes_mean` descending, then direction.
    pub rows: Vec<MemoryRow>,
    pub total_bytes: f64,
    pub total_count: f64,
}

fn descending(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

pub fn timing_table(aggregated: &BTreeMap<String, AggregatedTiming>) -> TimingTable {
    let total_time: f64 = aggregated.values().map(|a| a.time_mean).sum();
    let total_instances: f64 = aggregated.values().map(|a| a.instances_mean).sum();

    let mut rows: Vec<TimingRow> = aggregated
        .iter()
        .map(|(name, a)| TimingRow {
            operation: name.clone(),
            percentage: if total_time > 0.0 {
                100.0 * a.time_mean / total_time
            } else {
                0.0
            },
            time_mean: a.time_mean,
            time_std: a.time_std,
            instances_mean: a.instances_mean,
            instances_std: a.instances_std,
            category: a.category,
        })
        .collect();

    rows.sort_by(|a, b| {
        descending(a.time_mean, b.time_mean).then_with(|| a.operation.cmp(&b.operation))
    });

    TimingTable {
        rows,
        total_time,
        total_instances,
    }
}

pub fn memory_table(aggregated: &BTreeMap<String, AggregatedMemory>) -> MemoryTable {
    let mut rows: Vec<MemoryRow> = aggregated
        .iter()
        .map(|(direction, a)| MemoryRow {
            direction: direction.clone(),
            bytes_mean: a.bytes_mean,
            bytes_std: a.bytes_std,
            count_mean: a.count_mean,
            count_std: a.count_std,
        })
        .collect();

    rows.sort_by(|a, b| {
        descending(a.bytes_mean, b.bytes_mean).then_with(|| a.direction.cmp(&b.direction))
    });

    MemoryTable {
        total_bytes: rows.iter().map(|r| r.bytes_mean).sum(),
        total_count: rows.iter().map(|r| r.count_mean).sum(),
        rows,
    }
}
