//! Operation-name canonicalization.
//!
//! Driver revisions tag symbols with `_v<N>` (e.g. `cuMemcpyHtoD_v2`); we strip
//! those so every revision of a symbol aggregates under one key. Each
//! extraction mode also drops one fixed noise symbol.

use regex::Regex;
use std::sync::LazyLock;

static VERSION_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_v\d+$").expect("version suffix pattern is valid"));

/// Which extraction path is running; decides the dropped noise symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionMode {
    /// Per-operation time, instances and category (LaTeX tables).
    Detailed,
    /// Time-only totals (plotting).
    Plot,
}

impl ExtractionMode {
    pub fn noise_identifier(self) -> &'static str {
        match self {
            ExtractionMode::Detailed => "cudaDeviceSynchronize",
            ExtractionMode::Plot => "cuModuleGetLoadingMode",
        }
    }
}

/// Strip every trailing `_v<digits>` suffix, then drop the mode's noise symbol.
///
/// Stripping repeats until no suffix remains so the result is a fixed point.
pub fn normalize(raw: &str, mode: ExtractionMode) -> Option<String> {
    let mut name = raw;
    while let Some(m) = VERSION_SUFFIX.find(name) {
        name = &name[..m.start()];
    }

    if name == mode.noise_identifier() {
        None
    } else {
        Some(name.to_string())
    }
}

/// Runtime API names carry a call signature, e.g. `cudaMalloc (void**, size_t)`.
pub fn strip_signature(raw: &str) -> &str {
    raw.find('(').map_or(raw, |i| &raw[..i]).trim()
}

pub fn normalize_api(raw: &str, mode: ExtractionMode) -> Option<String> {
    normalize(strip_signature(raw), mode)
}
