//! Report model: aggregate stored runs of one version and derive the
//! timing and memory tables.

pub mod aggregate;
pub mod table;

pub use aggregate::{AggregatedMemory, AggregatedTiming, aggregate_memory, aggregate_timing};
pub use table::{MemoryRow, MemoryTable, TimingRow, TimingTable, memory_table, timing_table};

use crate::trace::{MemorySummary, TimingSummary};

/// Everything rendered for one version.
#[derive(Debug, Clone, PartialEq)]
pub struct VersionReport {
    pub version: String,
    /// Number of stored runs behind the timing table.
    pub runs: usize,
    pub timing: TimingTable,
    pub memory: MemoryTable,
}

pub fn build_version_report(
    version: &str,
    timing_runs: &[TimingSummary],
    memory_runs: &[MemorySummary],
) -> VersionReport {
    VersionReport {
        version: version.to_string(),
        runs: timing_runs.len(),
        timing: timing_table(&aggregate_timing(timing_runs)),
        memory: memory_table(&aggregate_memory(memory_runs)),
    }
}
