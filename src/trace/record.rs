use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Which query class produced a timing record.
///
/// Older stores used the `CUDA_*` / `MEMORY_OPER` labels; they are still
/// accepted when reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    #[serde(alias = "CUDA_KERNEL")]
    Kernel,
    #[serde(alias = "CUDA_API")]
    HostApi,
    #[serde(alias = "MEMORY_OPER")]
    MemoryTransfer,
}

impl Category {
    pub fn label(self) -> &'static str {
        match self {
            Category::Kernel => "KERNEL",
            Category::HostApi => "HOST_API",
            Category::MemoryTransfer => "MEMORY_TRANSFER",
        }
    }
}

/// Host/device copy direction. Other `copyKind` codes are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    HostToDevice,
    DeviceToHost,
}

impl Direction {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Direction::HostToDevice),
            2 => Some(Direction::DeviceToHost),
            _ => None,
        }
    }

    /// Key used in memory summaries.
    pub fn label(self) -> &'static str {
        match self {
            Direction::HostToDevice => "Host-to-Device",
            Direction::DeviceToHost => "Device-to-Host",
        }
    }

    /// Operation name used when copy durations land in the timing summary.
    pub fn memcpy_name(self) -> &'static str {
        match self {
            Direction::HostToDevice => "[CUDA memcpy Host-to-Device]",
            Direction::DeviceToHost => "[CUDA memcpy Device-to-Host]",
        }
    }
}

/// Accumulated timing for one normalized operation in one trace file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingRecord {
    /// Milliseconds.
    pub time: f64,
    pub instances: u64,
    pub category: Category,
}

/// Accumulated copy volume for one direction in one trace file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryRecord {
    /// Mebibytes.
    pub bytes: f64,
    pub count: u64,
}

/// Operation name -> timing, for one trace file.
pub type TimingSummary = BTreeMap<String, TimingRecord>;

/// Direction label -> copy volume, for one trace file.
pub type MemorySummary = BTreeMap<String, MemoryRecord>;

/// Operation name -> total milliseconds (plot mode).
pub type PlotTimingSummary = BTreeMap<String, f64>;

/// Direction label -> total MiB (plot mode).
pub type PlotMemorySummary = BTreeMap<String, f64>;

/// Output of a detailed extraction: feeds the LaTeX report.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetailedExtraction {
    pub timing: TimingSummary,
    pub memory: MemorySummary,
}

/// Output of a plot extraction: time-only totals per operation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlotExtraction {
    pub timing: PlotTimingSummary,
    pub memory: PlotMemorySummary,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_reads_legacy_labels() {
        let c: Category = serde_json::from_str("\"CUDA_API\"").unwrap();
        assert_eq!(c, Category::HostApi);
        let c: Category = serde_json::from_str("\"MEMORY_OPER\"").unwrap();
        assert_eq!(c, Category::MemoryTransfer);
        assert_eq!(
            serde_json::to_string(&Category::HostApi).unwrap(),
            "\"HOST_API\""
        );
    }

    #[test]
    fn direction_codes() {
        assert_eq!(Direction::from_code(1), Some(Direction::HostToDevice));
        assert_eq!(Direction::from_code(2), Some(Direction::DeviceToHost));
        assert_eq!(Direction::from_code(8), None);
    }
}
