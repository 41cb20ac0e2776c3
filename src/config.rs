//! File layout: where record stores and reports live inside an output dir.

use crate::trace::ExtractionMode;
use std::path::{Path, PathBuf};

pub const DETAILED_TIMING_STORE: &str = "cuda_summary_latex.json";
pub const DETAILED_MEMORY_STORE: &str = "memops_summary_latex.json";
pub const PLOT_TIMING_STORE: &str = "cuda_summary.json";
pub const PLOT_MEMORY_STORE: &str = "memops_summary.json";

/// Trace files are discovered by this extension.
pub const TRACE_EXTENSION: &str = "sqlite";

/// The pair of record stores one extraction mode appends to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreLayout {
    pub timing: PathBuf,
    pub memory: PathBuf,
}

impl StoreLayout {
    pub fn for_mode(dir: &Path, mode: ExtractionMode) -> Self {
        let (timing, memory) = match mode {
            ExtractionMode::Detailed => (DETAILED_TIMING_STORE, DETAILED_MEMORY_STORE),
            ExtractionMode::Plot => (PLOT_TIMING_STORE, PLOT_MEMORY_STORE),
        };
        Self {
            timing: dir.join(timing),
            memory: dir.join(memory),
        }
    }
}

/// Spaces in a version label become underscores in file names and labels.
pub fn version_slug(version: &str) -> String {
    version.replace(' ', "_")
}

pub fn report_path(dir: &Path, version: &str) -> PathBuf {
    dir.join(format!("latex_tables_{}.txt", version_slug(version)))
}
