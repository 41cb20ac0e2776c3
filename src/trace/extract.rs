//! Extraction of per-operation summaries from an Nsight Systems SQLite export.
//!
//! Schema consumed (read-only):
//!   StringIds(id, value)
//!   CUPTI_ACTIVITY_KIND_KERNEL(start, end, shortName -> StringIds.id)
//!   CUPTI_ACTIVITY_KIND_RUNTIME(start, end, nameId -> StringIds.id)
//!   CUPTI_ACTIVITY_KIND_MEMCPY(start, end, bytes, copyKind)
//!
//! Timestamps are nanoseconds; summaries report milliseconds and MiB.

use crate::error::{DataSourceError, QueryClass};
use crate::trace::normalize::{ExtractionMode, normalize, normalize_api};
use crate::trace::record::{
    Category, DetailedExtraction, Direction, MemoryRecord, PlotExtraction, TimingRecord,
};

use rusqlite::{Connection, OpenFlags, Row};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

const KERNEL_SQL: &str = r#"
    SELECT s.value, COUNT(*), SUM(k."end" - k.start)
    FROM CUPTI_ACTIVITY_KIND_KERNEL AS k
    JOIN StringIds AS s ON k.shortName = s.id
    GROUP BY s.value
"#;

const RUNTIME_SQL: &str = r#"
    SELECT s.value, COUNT(*), SUM(r."end" - r.start)
    FROM CUPTI_ACTIVITY_KIND_RUNTIME AS r
    JOIN StringIds AS s ON r.nameId = s.id
    GROUP BY s.value
"#;

const MEMCPY_TIME_SQL: &str = r#"
    SELECT copyKind, COUNT(*), SUM("end" - start)
    FROM CUPTI_ACTIVITY_KIND_MEMCPY
    WHERE copyKind IN (1, 2)
    GROUP BY copyKind
"#;

const MEMCPY_BYTES_SQL: &str = r#"
    SELECT copyKind, COUNT(*), SUM(bytes)
    FROM CUPTI_ACTIVITY_KIND_MEMCPY
    WHERE copyKind IN (1, 2)
    GROUP BY copyKind
"#;

const NS_PER_MS: f64 = 1e6;
const BYTES_PER_MIB: f64 = 1024.0 * 1024.0;

/// One `GROUP BY` row: raw key, row count, summed value.
#[derive(Debug, Clone, PartialEq)]
struct GroupRow<K> {
    key: K,
    count: u64,
    sum: f64,
}

/// Running totals for one normalized name within one query class.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Totals {
    count: u64,
    ms: f64,
}

/// Read-only handle on one trace database.
///
/// The connection lives exactly as long as this value; dropping it on any
/// exit path (including a failed query) releases the file.
pub struct TraceDb {
    path: PathBuf,
    conn: Connection,
}

impl TraceDb {
    pub fn open(path: &Path) -> Result<Self, DataSourceError> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|source| DataSourceError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(Self {
            path: path.to_path_buf(),
            conn,
        })
    }

    fn query<K>(
        &self,
        class: QueryClass,
        sql: &str,
        key: impl Fn(&Row<'_>) -> rusqlite::Result<K>,
    ) -> Result<Vec<GroupRow<K>>, DataSourceError> {
        let run = || -> rusqlite::Result<Vec<GroupRow<K>>> {
            let mut stmt = self.conn.prepare(sql)?;
            let rows = stmt.query_map([], |row| {
                let count: i64 = row.get(1)?;
                let sum: Option<f64> = row.get(2)?;
                Ok(GroupRow {
                    key: key(row)?,
                    count: count.max(0) as u64,
                    sum: sum.unwrap_or(0.0),
                })
            })?;
            let collected: rusqlite::Result<Vec<GroupRow<K>>> = rows.collect();
            collected
        };

        let rows = run().map_err(|source| DataSourceError::Query {
            path: self.path.clone(),
            class,
            source,
        })?;
        tracing::debug!(path = %self.path.display(), %class, rows = rows.len(), "queried");
        Ok(rows)
    }

    fn named_spans(
        &self,
        class: QueryClass,
        sql: &str,
    ) -> Result<Vec<GroupRow<String>>, DataSourceError> {
        self.query(class, sql, |row| row.get::<_, String>(0))
    }

    fn copy_rows(
        &self,
        class: QueryClass,
        sql: &str,
    ) -> Result<Vec<GroupRow<Direction>>, DataSourceError> {
        let rows = self.query(class, sql, |row| row.get::<_, i64>(0))?;
        Ok(rows
            .into_iter()
            .filter_map(|r| {
                Direction::from_code(r.key).map(|key| GroupRow {
                    key,
                    count: r.count,
                    sum: r.sum,
                })
            })
            .collect())
    }

    fn kernels(&self) -> Result<Vec<GroupRow<String>>, DataSourceError> {
        self.named_spans(QueryClass::Kernel, KERNEL_SQL)
    }

    fn runtime_calls(&self) -> Result<Vec<GroupRow<String>>, DataSourceError> {
        self.named_spans(QueryClass::Runtime, RUNTIME_SQL)
    }

    fn copy_durations(&self) -> Result<Vec<GroupRow<Direction>>, DataSourceError> {
        self.copy_rows(QueryClass::MemcpyTime, MEMCPY_TIME_SQL)
    }

    fn copy_volumes(&self) -> Result<Vec<GroupRow<Direction>>, DataSourceError> {
        self.copy_rows(QueryClass::MemcpyBytes, MEMCPY_BYTES_SQL)
    }
}

/// Re-group one query class by normalized name.
///
/// Raw keys like `foo_v2` and `foo_v3` are distinct in SQL but collapse to
/// `foo` here; their counts and durations are summed.
fn regroup(
    rows: Vec<GroupRow<String>>,
    normalize: impl Fn(&str) -> Option<String>,
) -> BTreeMap<String, Totals> {
    let mut out: BTreeMap<String, Totals> = BTreeMap::new();
    for row in rows {
        let Some(name) = normalize(&row.key) else {
            continue;
        };
        let t = out.entry(name).or_default();
        t.count += row.count;
        t.ms += row.sum / NS_PER_MS;
    }
    out
}

/// Detailed extraction for the LaTeX report.
///
/// Query classes are applied in order kernel, runtime API, memcpy; a later
/// class replaces any record of the same name written by an earlier one.
pub fn extract_detailed(path: &Path) -> Result<DetailedExtraction, DataSourceError> {
    let mode = ExtractionMode::Detailed;
    let db = TraceDb::open(path)?;

    let kernels = regroup(db.kernels()?, |k| normalize(k, mode));
    let apis = regroup(db.runtime_calls()?, |k| normalize_api(k, mode));
    let copies = db.copy_durations()?;
    let volumes = db.copy_volumes()?;

    let mut out = DetailedExtraction::default();

    let classes = [(kernels, Category::Kernel), (apis, Category::HostApi)];
    for (group, category) in classes {
        for (name, t) in group {
            out.timing.insert(
                name,
                TimingRecord {
                    time: t.ms,
                    instances: t.count,
                    category,
                },
            );
        }
    }

    for row in copies {
        out.timing.insert(
            row.key.memcpy_name().to_string(),
            TimingRecord {
                time: row.sum / NS_PER_MS,
                instances: row.count,
                category: Category::MemoryTransfer,
            },
        );
    }

    for row in volumes {
        out.memory.insert(
            row.key.label().to_string(),
            MemoryRecord {
                bytes: row.sum / BYTES_PER_MIB,
                count: row.count,
            },
        );
    }

    Ok(out)
}

/// Time-only extraction for plotting.
///
/// Unlike [`extract_detailed`], a runtime API whose normalized name matches a
/// kernel adds to that kernel's total instead of replacing it.
pub fn extract_plot(path: &Path) -> Result<PlotExtraction, DataSourceError> {
    let mode = ExtractionMode::Plot;
    let db = TraceDb::open(path)?;

    let kernels = regroup(db.kernels()?, |k| normalize(k, mode));
    let apis = regroup(db.runtime_calls()?, |k| normalize_api(k, mode));
    let copies = db.copy_durations()?;
    let volumes = db.copy_volumes()?;

    let mut out = PlotExtraction::default();

    for (name, t) in kernels.into_iter().chain(apis) {
        *out.timing.entry(name).or_insert(0.0) += t.ms;
    }

    for row in copies {
        out.timing
            .insert(row.key.memcpy_name().to_string(), row.sum / NS_PER_MS);
    }

    for row in volumes {
        out.memory
            .insert(row.key.label().to_string(), row.sum / BYTES_PER_MIB);
    }

    Ok(out)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    const MIB: i64 = 1024 * 1024;
    const MS: i64 = 1_000_000;

    /// Synthetic trace database with the tables the extractor reads.
    pub(crate) struct Fixture {
        pub dir: TempDir,
        pub path: PathBuf,
        conn: Connection,
        next_id: i64,
    }

    impl Fixture {
        pub(crate) fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("run.sqlite");
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch(
                r#"
                CREATE TABLE StringIds (id INTEGER PRIMARY KEY, value TEXT NOT NULL);
                CREATE TABLE CUPTI_ACTIVITY_KIND_KERNEL
                    (start INTEGER, "end" INTEGER, shortName INTEGER);
                CREATE TABLE CUPTI_ACTIVITY_KIND_RUNTIME
                    (start INTEGER, "end" INTEGER, nameId INTEGER);
                CREATE TABLE CUPTI_ACTIVITY_KIND_MEMCPY
                    (start INTEGER, "end" INTEGER, bytes INTEGER, copyKind INTEGER);
                "#,
            )
            .unwrap();
            Self {
                dir,
                path,
                conn,
                next_id: 0,
            }
        }

        fn string_id(&mut self, value: &str) -> i64 {
            let existing: Option<i64> = self
                .conn
                .query_row("SELECT id FROM StringIds WHERE value = ?1", [value], |r| {
                    r.get(0)
                })
                .ok();
            if let Some(id) = existing {
                return id;
            }
            self.next_id += 1;
            self.conn
                .execute(
                    "INSERT INTO StringIds (id, value) VALUES (?1, ?2)",
                    rusqlite::params![self.next_id, value],
                )
                .unwrap();
            self.next_id
        }

        pub(crate) fn kernel(&mut self, name: &str, ms: i64) -> &mut Self {
            let id = self.string_id(name);
            self.conn
                .execute(
                    concat!(
                        "INSERT INTO CUPTI_ACTIVITY_KIND_KERNEL ",
                        r#"(start, "end", shortName) VALUES (?1, ?2, ?3)"#,
                    ),
                    rusqlite::params![1000, 1000 + ms * MS, id],
                )
                .unwrap();
            self
        }

        pub(crate) fn api(&mut self, name: &str, ms: i64) -> &mut Self {
            let id = self.string_id(name);
            self.conn
                .execute(
                    concat!(
                        "INSERT INTO CUPTI_ACTIVITY_KIND_RUNTIME ",
                        r#"(start, "end", nameId) VALUES (?1, ?2, ?3)"#,
                    ),
                    rusqlite::params![0, ms * MS, id],
                )
                .unwrap();
            self
        }

        pub(crate) fn memcpy(&mut self, kind: i64, mib: i64, ms: i64) -> &mut Self {
            self.conn
                .execute(
                    concat!(
                        "INSERT INTO CUPTI_ACTIVITY_KIND_MEMCPY ",
                        r#"(start, "end", bytes, copyKind) VALUES (?1, ?2, ?3, ?4)"#,
                    ),
                    rusqlite::params![0, ms * MS, mib * MIB, kind],
                )
                .unwrap();
            self
        }
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn kernel_revisions_collapse_and_sum() {
        let mut fx = Fixture::new();
        fx.kernel("foo_v2", 10).kernel("foo_v2", 20).kernel("foo_v3", 5);

        let out = extract_detailed(&fx.path).unwrap();
        let foo = &out.timing["foo"];
        assert!(approx(foo.time, 35.0));
        assert_eq!(foo.instances, 3);
        assert_eq!(foo.category, Category::Kernel);
        assert_eq!(out.timing.len(), 1);
    }

    #[test]
    fn memcpy_volumes_by_direction() {
        let mut fx = Fixture::new();
        fx.memcpy(1, 100, 4).memcpy(2, 20, 1).memcpy(2, 30, 2).memcpy(8, 999, 9);

        let out = extract_detailed(&fx.path).unwrap();
        let mut expected = BTreeMap::new();
        expected.insert(
            "Host-to-Device".to_string(),
            MemoryRecord {
                bytes: 100.0,
                count: 1,
            },
        );
        expected.insert(
            "Device-to-Host".to_string(),
            MemoryRecord {
                bytes: 50.0,
                count: 2,
            },
        );
        assert_eq!(out.memory, expected);

        let h2d = &out.timing["[CUDA memcpy Host-to-Device]"];
        assert_eq!(h2d.category, Category::MemoryTransfer);
        assert!(approx(h2d.time, 4.0));
        let d2h = &out.timing["[CUDA memcpy Device-to-Host]"];
        assert_eq!(d2h.instances, 2);
        assert!(approx(d2h.time, 3.0));
    }

    #[test]
    fn detailed_drops_device_synchronize_and_strips_signatures() {
        let mut fx = Fixture::new();
        fx.api("cudaDeviceSynchronize_v3020 (void)", 50)
            .api("cudaMalloc_v3020 (void**, size_t)", 2)
            .api("cudaMalloc (void**, size_t)", 1)
            .api("cuModuleGetLoadingMode", 1);

        let out = extract_detailed(&fx.path).unwrap();
        assert!(!out.timing.contains_key("cudaDeviceSynchronize"));
        let malloc = &out.timing["cudaMalloc"];
        assert_eq!(malloc.instances, 2);
        assert!(approx(malloc.time, 3.0));
        assert_eq!(malloc.category, Category::HostApi);
        assert!(out.timing.contains_key("cuModuleGetLoadingMode"));
    }

    #[test]
    fn plot_drops_loading_mode_query() {
        let mut fx = Fixture::new();
        fx.api("cuModuleGetLoadingMode", 1).api("cudaDeviceSynchronize", 7);

        let out = extract_plot(&fx.path).unwrap();
        assert!(!out.timing.contains_key("cuModuleGetLoadingMode"));
        assert!(approx(out.timing["cudaDeviceSynchronize"], 7.0));
    }

    // Known inconsistency kept on purpose: when a kernel and a runtime API
    // normalize to the same name, detailed mode keeps only the API record
    // while plot mode sums both.
    #[test]
    fn cross_class_collision_overwrites_in_detailed_but_sums_in_plot() {
        let mut fx = Fixture::new();
        fx.kernel("shared_v1", 10).api("shared (int)", 4);

        let detailed = extract_detailed(&fx.path).unwrap();
        let rec = &detailed.timing["shared"];
        assert_eq!(rec.category, Category::HostApi);
        assert!(approx(rec.time, 4.0));
        assert_eq!(rec.instances, 1);

        let plot = extract_plot(&fx.path).unwrap();
        assert!(approx(plot.timing["shared"], 14.0));
    }

    #[test]
    fn plot_memory_is_mib_only() {
        let mut fx = Fixture::new();
        fx.memcpy(1, 64, 1).memcpy(1, 64, 1);

        let out = extract_plot(&fx.path).unwrap();
        assert!(approx(out.memory["Host-to-Device"], 128.0));
        assert!(!out.memory.contains_key("Device-to-Host"));
        assert!(approx(out.timing["[CUDA memcpy Host-to-Device]"], 2.0));
    }

    #[test]
    fn empty_trace_yields_empty_summaries() {
        let fx = Fixture::new();
        let out = extract_detailed(&fx.path).unwrap();
        assert!(out.timing.is_empty());
        assert!(out.memory.is_empty());
    }

    #[test]
    fn missing_table_is_a_query_error() {
        let fx = Fixture::new();
        fx.conn
            .execute_batch("DROP TABLE CUPTI_ACTIVITY_KIND_RUNTIME;")
            .unwrap();

        let err = extract_detailed(&fx.path).unwrap_err();
        match err {
            DataSourceError::Query { class, .. } => assert_eq!(class, QueryClass::Runtime),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_file_is_an_open_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = extract_plot(&dir.path().join("absent.sqlite")).unwrap_err();
        assert!(matches!(err, DataSourceError::Open { .. }));
    }
}
