//! Error taxonomy shared by extraction, storage and reporting.
//!
//! Every failure here is contained per trace file or per version; the batch
//! drivers in `batch.rs` log and continue.

use std::path::PathBuf;
use thiserror::Error;

/// Which query class of a trace database was being read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryClass {
    Kernel,
    Runtime,
    MemcpyTime,
    MemcpyBytes,
}

impl std::fmt::Display for QueryClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            QueryClass::Kernel => "kernel executions",
            QueryClass::Runtime => "runtime API calls",
            QueryClass::MemcpyTime => "memcpy durations",
            QueryClass::MemcpyBytes => "memcpy bytes",
        };
        f.write_str(s)
    }
}

/// The trace database could not be opened or queried.
#[derive(Debug, Error)]
pub enum DataSourceError {
    #[error("cannot open trace database {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("query over {class} failed in {path}: {source}")]
    Query {
        path: PathBuf,
        class: QueryClass,
        #[source]
        source: rusqlite::Error,
    },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("cannot read record store {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Only surfaced when loading for reports; appends recover from it.
    #[error("record store {path} is not a valid entry list: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("cannot serialize entry for {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("cannot write record store {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("version {version:?} has no entries in the memory store")]
    AggregationInputMissing { version: String },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("cannot write report {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
