pub mod error;
pub mod invoker;
pub mod types;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::error::{GauntletError, ModelError, Result};
    pub use crate::invoker::{Completion, ModelInvoker};
    pub use crate::types::{
        Experiment, GraderKind, NewExperiment, NewRun, NewTestCase, ResponseMetrics, RunRecord,
        RunRow, TestCase, aggregate_score,
    };
}
