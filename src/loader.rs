//! Load orchestration: schema, then every vertex, then every edge.
//!
//! The store rejects an edge whose endpoints are missing, so the two data
//! passes are strictly sequential over the same directory tree. A statement
//! the store refuses is logged together with the store's message and the run
//! moves on; only transport failures abort.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use log::{error, info, warn};
use tokio::time::{sleep, Instant};
use walkdir::WalkDir;

use crate::record::{read_edges, read_vertex};
use crate::schema::{schema_statement, SCHEMA_PROBE};
use crate::store::GraphStore;

const PROBE_INTERVAL: Duration = Duration::from_secs(1);

/// End-of-run counts, logged once after the edge phase.
#[derive(Debug, Default, PartialEq)]
pub struct LoadReport {
    pub vertices_inserted: usize,
    pub vertices_failed: usize,
    pub edges_inserted: usize,
    pub edges_failed: usize,
    pub files_skipped: usize,
}

pub struct BulkLoader<S: GraphStore> {
    store: S,
    data_dir: PathBuf,
    settle: Duration,
    probe: bool,
}

impl<S: GraphStore> BulkLoader<S> {
    pub fn new(store: S, data_dir: PathBuf, settle: Duration, probe: bool) -> Self {
        Self {
            store,
            data_dir,
            settle,
            probe,
        }
    }

    /// Run the three phases to completion. Individual statement failures and
    /// unreadable record files are counted, not fatal.
    pub async fn run(&mut self) -> Result<LoadReport> {
        self.create_schema().await?;
        self.wait_for_schema().await?;

        let mut report = LoadReport::default();
        self.load_vertices(&mut report).await?;
        self.load_edges(&mut report).await?;

        info!(
            "Load complete: {} vertices inserted ({} failed), {} edges inserted ({} failed), {} files skipped",
            report.vertices_inserted,
            report.vertices_failed,
            report.edges_inserted,
            report.edges_failed,
            report.files_skipped
        );
        Ok(report)
    }

    /// Schema failures are logged but not fatal: on a rerun the store may
    /// answer "already exists", which is indistinguishable from a genuine
    /// failure without parsing the message.
    async fn create_schema(&mut self) -> Result<()> {
        info!("Creating schema...");
        let outcome = self.store.execute(&schema_statement()).await?;
        if !outcome.is_success() {
            error!("schema create failure {}", outcome.message);
        }
        Ok(())
    }

    /// The store applies schema changes asynchronously. Poll a trivial probe
    /// until it succeeds or the settle bound elapses; with probing disabled,
    /// sleep for the full bound unconditionally.
    async fn wait_for_schema(&mut self) -> Result<()> {
        if !self.probe {
            sleep(self.settle).await;
            return Ok(());
        }
        let deadline = Instant::now() + self.settle;
        loop {
            match self.store.execute(SCHEMA_PROBE).await {
                Ok(outcome) if outcome.is_success() => return Ok(()),
                Ok(_) => {}
                Err(e) => return Err(e.into()),
            }
            if Instant::now() >= deadline {
                warn!(
                    "schema not queryable after {:?}, proceeding anyway",
                    self.settle
                );
                return Ok(());
            }
            sleep(PROBE_INTERVAL).await;
        }
    }

    async fn load_vertices(&mut self, report: &mut LoadReport) -> Result<()> {
        info!("Loading vertices from {:?}...", self.data_dir);
        for file in data_files(&self.data_dir) {
            let statement = match read_vertex(&file) {
                Ok(statement) => statement,
                Err(e) => {
                    error!("skipping {:?}: {}", file, e);
                    report.files_skipped += 1;
                    continue;
                }
            };
            if self.submit(&statement).await? {
                report.vertices_inserted += 1;
            } else {
                report.vertices_failed += 1;
            }
        }
        Ok(())
    }

    async fn load_edges(&mut self, report: &mut LoadReport) -> Result<()> {
        info!("Loading edges from {:?}...", self.data_dir);
        for file in data_files(&self.data_dir) {
            let edges = match read_edges(&file) {
                Ok(edges) => edges,
                Err(_) => {
                    // Already reported during the vertex phase; skip quietly.
                    report.files_skipped += 1;
                    continue;
                }
            };
            for statement in edges {
                if self.submit(&statement).await? {
                    report.edges_inserted += 1;
                } else {
                    report.edges_failed += 1;
                }
            }
        }
        Ok(())
    }

    async fn submit(&mut self, statement: &str) -> Result<bool> {
        let outcome = self.store.execute(statement).await?;
        if outcome.is_success() {
            Ok(true)
        } else {
            error!("{} {}", statement, outcome.message);
            Ok(false)
        }
    }
}

/// Every regular file under the directory, recursively. Order is whatever the
/// filesystem yields.
fn data_files(dir: &Path) -> impl Iterator<Item = PathBuf> {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{ExecOutcome, StoreError};
    use async_trait::async_trait;
    use std::collections::{HashMap, HashSet};
    use std::fs;
    use tempfile::TempDir;

    /// In-memory store with NO OVERWRITE semantics: a vertex or edge insert
    /// whose key is already present is a silent no-op, and an edge whose
    /// endpoints are missing is rejected with a non-zero code.
    #[derive(Default)]
    struct MockStore {
        log: Vec<String>,
        vertices: HashMap<i64, String>,
        edges: HashSet<(i64, i64)>,
        reject_schema: bool,
    }

    impl MockStore {
        fn parse_vertex(statement: &str) -> Option<(i64, String)> {
            let rest = statement.strip_prefix("INSERT VERTEX NO OVERWRITE node(")?;
            let values = rest.split("VALUES ").nth(1)?;
            let (id, props) = values.split_once(":(")?;
            Some((id.trim().parse().ok()?, props.to_string()))
        }

        fn parse_edge(statement: &str) -> Option<(i64, i64)> {
            let rest = statement.strip_prefix("INSERT EDGE NO OVERWRITE related(")?;
            let values = rest.split("VALUES ").nth(1)?;
            let (pair, _) = values.split_once(":(")?;
            let (from, to) = pair.split_once("->")?;
            Some((from.trim().parse().ok()?, to.trim().parse().ok()?))
        }

        fn ok() -> ExecOutcome {
            ExecOutcome {
                code: 0,
                message: String::new(),
            }
        }

        fn fail(message: &str) -> ExecOutcome {
            ExecOutcome {
                code: -8,
                message: message.into(),
            }
        }
    }

    #[async_trait]
    impl GraphStore for MockStore {
        async fn execute(&mut self, statement: &str) -> Result<ExecOutcome, StoreError> {
            self.log.push(statement.to_string());
            if statement.starts_with("CREATE SPACE") {
                return Ok(if self.reject_schema {
                    Self::fail("schema rejected")
                } else {
                    Self::ok()
                });
            }
            if let Some((id, props)) = Self::parse_vertex(statement) {
                self.vertices.entry(id).or_insert(props);
                return Ok(Self::ok());
            }
            if let Some((from, to)) = Self::parse_edge(statement) {
                if !self.vertices.contains_key(&from) || !self.vertices.contains_key(&to) {
                    return Ok(Self::fail("vertex not found"));
                }
                self.edges.insert((from, to));
                return Ok(Self::ok());
            }
            Ok(Self::ok())
        }
    }

    fn write_record(dir: &Path, name: &str, body: &str) {
        fs::write(dir.join(name), body).unwrap();
    }

    fn loader(store: MockStore, dir: &TempDir) -> BulkLoader<MockStore> {
        BulkLoader::new(store, dir.path().to_path_buf(), Duration::ZERO, true)
    }

    fn sample_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        write_record(
            dir.path(),
            "42.json",
            r#"{"id": 42, "name": "Show A", "type": 2,
                "tags": [{"name":"drama"},{"name":"1990s"}],
                "rating": {"score": 8.5},
                "relations": [{"id": 7, "type": "sequel"}]}"#,
        );
        write_record(
            dir.path(),
            "7.json",
            r#"{"id": 7, "name": "Show B", "type": 2}"#,
        );
        dir
    }

    #[tokio::test]
    async fn vertices_are_submitted_before_any_edge() {
        let dir = sample_dir();
        let mut loader = loader(MockStore::default(), &dir);
        loader.run().await.unwrap();

        let log = &loader.store.log;
        let last_vertex = log
            .iter()
            .rposition(|s| s.starts_with("INSERT VERTEX"))
            .unwrap();
        let first_edge = log
            .iter()
            .position(|s| s.starts_with("INSERT EDGE"))
            .unwrap();
        assert!(last_vertex < first_edge);
    }

    #[tokio::test]
    async fn full_load_yields_expected_graph() {
        let dir = sample_dir();
        let mut loader = loader(MockStore::default(), &dir);
        let report = loader.run().await.unwrap();

        assert_eq!(report.vertices_inserted, 2);
        assert_eq!(report.edges_inserted, 1);
        assert_eq!(report.edges_failed, 0);
        assert!(loader.store.edges.contains(&(42, 7)));
        assert!(loader.store.vertices[&42].contains("drama|1990s"));
    }

    #[tokio::test]
    async fn dangling_edge_is_reported_and_run_completes() {
        let dir = TempDir::new().unwrap();
        write_record(
            dir.path(),
            "42.json",
            r#"{"id": 42, "name": "Show A", "type": 2,
                "relations": [{"id": 7, "type": "sequel"}]}"#,
        );
        write_record(
            dir.path(),
            "50.json",
            r#"{"id": 50, "name": "Show C", "type": 2,
                "relations": [{"id": 42, "type": "remake"}]}"#,
        );
        let mut loader = loader(MockStore::default(), &dir);
        let report = loader.run().await.unwrap();

        // 42 -> 7 has no target vertex and must fail; 50 -> 42 still loads.
        assert_eq!(report.edges_failed, 1);
        assert_eq!(report.edges_inserted, 1);
        assert!(loader.store.edges.contains(&(50, 42)));
    }

    #[tokio::test]
    async fn malformed_file_is_skipped_not_fatal() {
        let dir = sample_dir();
        write_record(dir.path(), "broken.json", "{ not json");
        let mut loader = loader(MockStore::default(), &dir);
        let report = loader.run().await.unwrap();

        assert_eq!(report.vertices_inserted, 2);
        assert_eq!(report.edges_inserted, 1);
        // Counted once per phase, both of which walk the same tree.
        assert_eq!(report.files_skipped, 2);
    }

    #[tokio::test]
    async fn schema_failure_is_not_fatal() {
        let dir = sample_dir();
        let store = MockStore {
            reject_schema: true,
            ..MockStore::default()
        };
        let mut loader = loader(store, &dir);
        let report = loader.run().await.unwrap();
        assert_eq!(report.vertices_inserted, 2);
    }

    #[tokio::test]
    async fn rerun_is_idempotent() {
        let dir = sample_dir();
        let mut loader = loader(MockStore::default(), &dir);
        loader.run().await.unwrap();
        let vertices_after_first = loader.store.vertices.len();
        let props_after_first = loader.store.vertices[&42].clone();
        let edges_after_first = loader.store.edges.len();

        loader.run().await.unwrap();
        assert_eq!(loader.store.vertices.len(), vertices_after_first);
        assert_eq!(loader.store.edges.len(), edges_after_first);
        assert_eq!(loader.store.vertices[&42], props_after_first);
    }

    #[tokio::test]
    async fn nested_directories_are_walked() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("a").join("b");
        fs::create_dir_all(&sub).unwrap();
        write_record(&sub, "9.json", r#"{"id": 9, "name": "Deep", "type": 1}"#);
        let mut loader = loader(MockStore::default(), &dir);
        let report = loader.run().await.unwrap();
        assert_eq!(report.vertices_inserted, 1);
    }

    #[tokio::test]
    async fn empty_directory_loads_nothing() {
        let dir = TempDir::new().unwrap();
        let mut loader = loader(MockStore::default(), &dir);
        let report = loader.run().await.unwrap();
        assert_eq!(report, LoadReport::default());
    }
}
