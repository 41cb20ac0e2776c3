//! Trace-side of the pipeline: record types, name normalization and the
//! SQLite extractor.

pub mod extract;
pub mod normalize;
pub mod record;

pub use extract::{extract_detailed, extract_plot};
pub use normalize::ExtractionMode;
pub use record::{
    Category, DetailedExtraction, MemoryRecord, MemorySummary, PlotExtraction, TimingRecord,
    TimingSummary,
};
