use async_trait::async_trait;
use uuid::Uuid;

use gauntlet_core::types::{
    Experiment, NewExperiment, NewRun, NewTestCase, RunRecord, TestCase,
};

use crate::error::Result;

/// Async document-store collaborator for experiments, test cases, and runs.
///
/// Ids and `created_at` audit timestamps are assigned by the store at write
/// time. Implementations must be thread-safe (`Send + Sync`). Point reads
/// return `Ok(None)` for unknown ids; run records are append-only.
#[async_trait]
pub trait ExperimentStore: Send + Sync {
    async fn create_experiment(&self, new: NewExperiment) -> Result<Experiment>;
    async fn get_experiment(&self, id: Uuid) -> Result<Option<Experiment>>;
    async fn list_experiments(&self) -> Result<Vec<Experiment>>;

    async fn create_test_case(&self, new: NewTestCase) -> Result<TestCase>;
    async fn get_test_case(&self, id: Uuid) -> Result<Option<TestCase>>;
    async fn list_test_cases(&self) -> Result<Vec<TestCase>>;

    async fn create_run(&self, new: NewRun) -> Result<RunRecord>;
    async fn get_run(&self, id: Uuid) -> Result<Option<RunRecord>>;

    /// Runs of one experiment, oldest first.
    async fn list_runs(&self, experiment_id: Uuid) -> Result<Vec<RunRecord>>;
}
