use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use uuid::Uuid;

use gauntlet_core::types::{
    Experiment, GraderKind, NewExperiment, NewRun, NewTestCase, RunRecord, RunRow, TestCase,
};

use crate::error::Result;
use crate::store::ExperimentStore;

/// SQLite-backed store for experiments, test cases, and run records.
///
/// Thread-safe via `Arc<Mutex<Connection>>`. All SQLite operations are
/// dispatched to a blocking thread via `tokio::task::spawn_blocking`.
/// List-valued columns (models, test case ids, run rows) are stored as JSON
/// text; the run record is the only place per-model responses live.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (or create) a SQLite database at the given path.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.create_tables()?;
        Ok(store)
    }

    /// Create an in-memory SQLite database (useful for tests).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.create_tables()?;
        Ok(store)
    }

    fn create_tables(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS experiments (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                system_prompt TEXT NOT NULL,
                models TEXT NOT NULL,
                test_case_ids TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS test_cases (
                id TEXT PRIMARY KEY,
                user_message TEXT NOT NULL,
                expected_output TEXT NOT NULL,
                grader_kind TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS runs (
                id TEXT PRIMARY KEY,
                experiment_id TEXT NOT NULL,
                started_at TEXT NOT NULL,
                finished_at TEXT NOT NULL,
                rows TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_runs_experiment
                ON runs(experiment_id, created_at);",
        )?;
        Ok(())
    }
}

fn parse_uuid(s: &str) -> Uuid {
    s.parse().unwrap_or_else(|_| Uuid::nil())
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    s.parse().unwrap_or_else(|_| Utc::now())
}

fn row_to_experiment(row: &rusqlite::Row<'_>) -> rusqlite::Result<Experiment> {
    let id: String = row.get(0)?;
    let name: String = row.get(1)?;
    let system_prompt: String = row.get(2)?;
    let models_json: String = row.get(3)?;
    let test_case_ids_json: String = row.get(4)?;
    let created_at: String = row.get(5)?;

    let models: Vec<String> = serde_json::from_str(&models_json).unwrap_or_default();
    let test_case_ids: Vec<Uuid> =
        serde_json::from_str(&test_case_ids_json).unwrap_or_default();

    Ok(Experiment {
        id: parse_uuid(&id),
        name,
        system_prompt,
        models,
        test_case_ids,
        created_at: parse_timestamp(&created_at),
    })
}

fn row_to_test_case(row: &rusqlite::Row<'_>) -> rusqlite::Result<TestCase> {
    let id: String = row.get(0)?;
    let user_message: String = row.get(1)?;
    let expected_output: String = row.get(2)?;
    let grader_kind: String = row.get(3)?;
    let created_at: String = row.get(4)?;

    Ok(TestCase {
        id: parse_uuid(&id),
        user_message,
        expected_output,
        grader_kind: GraderKind::from(grader_kind),
        created_at: parse_timestamp(&created_at),
    })
}

fn row_to_run(row: &rusqlite::Row<'_>) -> rusqlite::Result<RunRecord> {
    let id: String = row.get(0)?;
    let experiment_id: String = row.get(1)?;
    let started_at: String = row.get(2)?;
    let finished_at: String = row.get(3)?;
    let rows_json: String = row.get(4)?;
    let created_at: String = row.get(5)?;

    let rows: Vec<RunRow> = serde_json::from_str(&rows_json).unwrap_or_default();

    Ok(RunRecord {
        id: parse_uuid(&id),
        experiment_id: parse_uuid(&experiment_id),
        started_at: parse_timestamp(&started_at),
        finished_at: parse_timestamp(&finished_at),
        rows,
        created_at: parse_timestamp(&created_at),
    })
}

#[async_trait]
impl ExperimentStore for SqliteStore {
    async fn create_experiment(&self, new: NewExperiment) -> Result<Experiment> {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let experiment = Experiment {
                id: Uuid::new_v4(),
                name: new.name,
                system_prompt: new.system_prompt,
                models: new.models,
                test_case_ids: new.test_case_ids,
                created_at: Utc::now(),
            };
            let models_json = serde_json::to_string(&experiment.models)?;
            let test_case_ids_json = serde_json::to_string(&experiment.test_case_ids)?;

            let conn = conn.lock().unwrap();
            conn.execute(
                "INSERT INTO experiments (id, name, system_prompt, models, test_case_ids, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    experiment.id.to_string(),
                    experiment.name,
                    experiment.system_prompt,
                    models_json,
                    test_case_ids_json,
                    experiment.created_at.to_rfc3339(),
                ],
            )?;
            Ok(experiment)
        })
        .await?
    }

    async fn get_experiment(&self, id: Uuid) -> Result<Option<Experiment>> {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();
            let mut stmt = conn.prepare(
                "SELECT id, name, system_prompt, models, test_case_ids, created_at
                 FROM experiments WHERE id = ?1",
            )?;
            let result = stmt
                .query_row(params![id.to_string()], row_to_experiment)
                .optional()?;
            Ok(result)
        })
        .await?
    }

    async fn list_experiments(&self) -> Result<Vec<Experiment>> {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();
            let mut stmt = conn.prepare(
                "SELECT id, name, system_prompt, models, test_case_ids, created_at
                 FROM experiments ORDER BY created_at ASC",
            )?;
            let rows = stmt.query_map([], row_to_experiment)?;
            let mut experiments = Vec::new();
            for row in rows {
                experiments.push(row?);
            }
            Ok(experiments)
        })
        .await?
    }

    async fn create_test_case(&self, new: NewTestCase) -> Result<TestCase> {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let case = TestCase {
                id: Uuid::new_v4(),
                user_message: new.user_message,
                expected_output: new.expected_output,
                grader_kind: new.grader_kind,
                created_at: Utc::now(),
            };
            let conn = conn.lock().unwrap();
            conn.execute(
                "INSERT INTO test_cases (id, user_message, expected_output, grader_kind, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    case.id.to_string(),
                    case.user_message,
                    case.expected_output,
                    case.grader_kind.as_str(),
                    case.created_at.to_rfc3339(),
                ],
            )?;
            Ok(case)
        })
        .await?
    }

    async fn get_test_case(&self, id: Uuid) -> Result<Option<TestCase>> {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();
            let mut stmt = conn.prepare(
                "SELECT id, user_message, expected_output, grader_kind, created_at
                 FROM test_cases WHERE id = ?1",
            )?;
            let result = stmt
                .query_row(params![id.to_string()], row_to_test_case)
                .optional()?;
            Ok(result)
        })
        .await?
    }

    async fn list_test_cases(&self) -> Result<Vec<TestCase>> {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();
            let mut stmt = conn.prepare(
                "SELECT id, user_message, expected_output, grader_kind, created_at
                 FROM test_cases ORDER BY created_at ASC",
            )?;
            let rows = stmt.query_map([], row_to_test_case)?;
            let mut cases = Vec::new();
            for row in rows {
                cases.push(row?);
            }
            Ok(cases)
        })
        .await?
    }

    async fn create_run(&self, new: NewRun) -> Result<RunRecord> {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let record = RunRecord {
                id: Uuid::new_v4(),
                experiment_id: new.experiment_id,
                started_at: new.started_at,
                finished_at: new.finished_at,
                rows: new.rows,
                created_at: Utc::now(),
            };
            let rows_json = serde_json::to_string(&record.rows)?;

            let conn = conn.lock().unwrap();
            conn.execute(
                "INSERT INTO runs (id, experiment_id, started_at, finished_at, rows, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    record.id.to_string(),
                    record.experiment_id.to_string(),
                    record.started_at.to_rfc3339(),
                    record.finished_at.to_rfc3339(),
                    rows_json,
                    record.created_at.to_rfc3339(),
                ],
            )?;
            Ok(record)
        })
        .await?
    }

    async fn get_run(&self, id: Uuid) -> Result<Option<RunRecord>> {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();
            let mut stmt = conn.prepare(
                "SELECT id, experiment_id, started_at, finished_at, rows, created_at
                 FROM runs WHERE id = ?1",
            )?;
            let result = stmt
                .query_row(params![id.to_string()], row_to_run)
                .optional()?;
            Ok(result)
        })
        .await?
    }

    async fn list_runs(&self, experiment_id: Uuid) -> Result<Vec<RunRecord>> {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();
            let mut stmt = conn.prepare(
                "SELECT id, experiment_id, started_at, finished_at, rows, created_at
                 FROM runs WHERE experiment_id = ?1 ORDER BY created_at ASC",
            )?;
            let rows = stmt.query_map(params![experiment_id.to_string()], row_to_run)?;
            let mut records = Vec::new();
            for row in rows {
                records.push(row?);
            }
            Ok(records)
        })
        .await?
    }
}
