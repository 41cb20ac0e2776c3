//! Batch drivers: one trace file or one version at a time, failures
//! contained to the item that caused them.

use crate::Result;
use crate::config::{StoreLayout, TRACE_EXTENSION, report_path};
use crate::error::ReportError;
use crate::model::build_version_report;
use crate::render::render_latex_report;
use crate::store::{append_pair, group_by_version, load};
use crate::trace::{ExtractionMode, MemorySummary, TimingSummary, extract_detailed, extract_plot};

use anyhow::bail;
use std::fs;
use std::path::{Path, PathBuf};

fn is_trace_file(path: &Path) -> bool {
    path.is_file() && path.extension().is_some_and(|e| e == TRACE_EXTENSION)
}

/// A single `.sqlite` file, or every `.sqlite` file directly inside a
/// directory (sorted).
pub fn discover_traces(input: &Path) -> Result<Vec<PathBuf>> {
    if is_trace_file(input) {
        return Ok(vec![input.to_path_buf()]);
    }
    if !input.is_dir() {
        bail!(
            "{} must be a .{} file or a directory containing .{} files",
            input.display(),
            TRACE_EXTENSION,
            TRACE_EXTENSION
        );
    }

    let mut files = Vec::new();
    for entry in fs::read_dir(input)? {
        let path = entry?.path();
        if is_trace_file(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExtractOutcome {
    pub processed: usize,
    pub failed: usize,
}

fn extract_one(
    path: &Path,
    version: &str,
    mode: ExtractionMode,
    layout: &StoreLayout,
) -> Result<()> {
    let source = path.file_name().map(|n| n.to_string_lossy().into_owned());
    let source = source.as_deref();

    match mode {
        ExtractionMode::Detailed => {
            let ex = extract_detailed(path)?;
            append_pair(layout, version, source, ex.timing, ex.memory)?;
        }
        ExtractionMode::Plot => {
            let ex = extract_plot(path)?;
            append_pair(layout, version, source, ex.timing, ex.memory)?;
        }
    }
    Ok(())
}

/// Extract every file in order and append each result before moving on.
pub fn extract_batch(
    files: &[PathBuf],
    version: &str,
    mode: ExtractionMode,
    layout: &StoreLayout,
) -> ExtractOutcome {
    let mut outcome = ExtractOutcome::default();

    for path in files {
        tracing::info!(file = %path.display(), version, "processing");
        match extract_one(path, version, mode, layout) {
            Ok(()) => outcome.processed += 1,
            Err(e) => {
                tracing::warn!(file = %path.display(), "skipped: {:#}", e);
                outcome.failed += 1;
            }
        }
    }

    outcome
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReportOutcome {
    pub written: Vec<PathBuf>,
    /// Versions present in the timing store only.
    pub skipped: Vec<String>,
    pub failed: Vec<String>,
}

/// Render one report file per version found in both stores.
///
/// Store load failures abort; per-version failures are logged and counted.
pub fn report_batch(
    timing_store: &Path,
    memory_store: &Path,
    out_dir: &Path,
) -> std::result::Result<ReportOutcome, ReportError> {
    let timing = group_by_version(load::<TimingSummary>(timing_store)?);
    let memory = group_by_version(load::<MemorySummary>(memory_store)?);

    let mut outcome = ReportOutcome::default();
    for (version, timing_runs) in &timing {
        let Some(memory_runs) = memory.get(version) else {
            let missing = ReportError::AggregationInputMissing {
                version: version.clone(),
            };
            tracing::debug!("{}", missing);
            outcome.skipped.push(version.clone());
            continue;
        };

        let report = build_version_report(version, timing_runs, memory_runs);
        let path = report_path(out_dir, version);
        match fs::write(&path, render_latex_report(&report)) {
            Ok(()) => {
                tracing::info!(
                    version = %version,
                    runs = report.runs,
                    path = %path.display(),
                    "report written"
                );
                outcome.written.push(path);
            }
            Err(source) => {
                let err = ReportError::Write { path, source };
                tracing::warn!("{}", err);
                outcome.failed.push(version.clone());
            }
        }
    }

    Ok(outcome)
}
