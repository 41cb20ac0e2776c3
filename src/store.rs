//! Append-only JSON record stores.
//!
//! A store is a pretty-printed JSON array of [`StoredEntry`] values in
//! insertion order. Appending reads the whole file, pushes one entry and
//! rewrites the file; only one writer per store may run at a time.

use crate::config::StoreLayout;
use crate::error::StoreError;

use chrono::{Local, SecondsFormat};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEntry<T> {
    pub version: String,
    /// Local capture time, ISO-8601 with offset.
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_file: Option<String>,
    pub data: T,
}

impl<T> StoredEntry<T> {
    pub fn new(version: &str, source_file: Option<&str>, data: T) -> Self {
        Self::at(version, &now_iso(), source_file, data)
    }

    pub fn at(version: &str, timestamp: &str, source_file: Option<&str>, data: T) -> Self {
        Self {
            version: version.to_string(),
            timestamp: timestamp.to_string(),
            source_file: source_file.map(str::to_string),
            data,
        }
    }
}

pub fn now_iso() -> String {
    Local::now().to_rfc3339_opts(SecondsFormat::Micros, false)
}

type RawEntry = StoredEntry<serde_json::Value>;

/// Existing entries with raw payloads so data of any shape survives a rewrite.
///
/// A missing file is an empty store. Anything that is not an array of
/// entries (bad UTF-8, bad JSON, stray elements) is discarded with a
/// warning; the next write replaces it.
fn read_existing(path: &Path) -> Result<Vec<RawEntry>, StoreError> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let bytes = fs::read(path).map_err(|source| StoreError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    match serde_json::from_slice::<Vec<RawEntry>>(&bytes) {
        Ok(entries) => Ok(entries),
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "record store is unreadable; previous entries will be overwritten"
            );
            Ok(Vec::new())
        }
    }
}

fn to_pretty_json(value: &impl Serialize) -> serde_json::Result<Vec<u8>> {
    let mut buf = Vec::new();
    let fmt = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, fmt);
    value.serialize(&mut ser)?;
    Ok(buf)
}

/// Append one entry and rewrite the store. Returns the new entry count.
pub fn append<T: Serialize>(path: &Path, entry: &StoredEntry<T>) -> Result<usize, StoreError> {
    let serialize_err = |source| StoreError::Serialize {
        path: path.to_path_buf(),
        source,
    };

    let mut entries = read_existing(path)?;
    entries.push(RawEntry {
        version: entry.version.clone(),
        timestamp: entry.timestamp.clone(),
        source_file: entry.source_file.clone(),
        data: serde_json::to_value(&entry.data).map_err(serialize_err)?,
    });

    let bytes = to_pretty_json(&entries).map_err(serialize_err)?;
    fs::write(path, bytes).map_err(|source| StoreError::Write {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(entries.len())
}

/// Append one extraction to both stores of a layout under a shared timestamp.
///
/// Succeeds only if both writes succeed. The writes are not atomic as a
/// pair: when the memory write fails, the timing entry is already on disk
/// and stays there without a partner.
pub fn append_pair<A: Serialize, B: Serialize>(
    layout: &StoreLayout,
    version: &str,
    source_file: Option<&str>,
    timing: A,
    memory: B,
) -> Result<(), StoreError> {
    let timestamp = now_iso();
    append(
        &layout.timing,
        &StoredEntry::at(version, &timestamp, source_file, timing),
    )?;
    append(
        &layout.memory,
        &StoredEntry::at(version, &timestamp, source_file, memory),
    )?;
    Ok(())
}

/// Load a store for reporting. Unlike appends, bad content is an error here.
pub fn load<T: DeserializeOwned>(path: &Path) -> Result<Vec<StoredEntry<T>>, StoreError> {
    let bytes = fs::read(path).map_err(|source| StoreError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&bytes).map_err(|source| StoreError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Payloads per version, each list in store order.
pub fn group_by_version<T>(entries: Vec<StoredEntry<T>>) -> BTreeMap<String, Vec<T>> {
    let mut out: BTreeMap<String, Vec<T>> = BTreeMap::new();
    for entry in entries {
        out.entry(entry.version).or_default().push(entry.data);
    }
    out
}
