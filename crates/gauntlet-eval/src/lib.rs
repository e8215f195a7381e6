pub mod executor;
pub mod grader;
pub mod metrics;

pub mod prelude {
    pub use crate::executor::{ExecutorConfig, RunExecutor, RunOutcome};
    pub use crate::grader::{GradeOutcome, grade};
    pub use crate::metrics::{HttpMetricsEvaluator, MetricsEvaluator};
}
