use std::sync::Arc;

use gauntlet_core::invoker::ModelInvoker;
use gauntlet_eval::executor::ExecutorConfig;
use gauntlet_eval::metrics::MetricsEvaluator;
use gauntlet_store::ExperimentStore;

/// Shared application state.
///
/// Constructed once at the process entry point and injected into handlers;
/// tests build it over an in-memory store and a mock invoker.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ExperimentStore>,
    pub invoker: Arc<dyn ModelInvoker>,
    pub metrics: Option<Arc<dyn MetricsEvaluator>>,
    pub executor_config: ExecutorConfig,
}

impl AppState {
    pub fn new(store: Arc<dyn ExperimentStore>, invoker: Arc<dyn ModelInvoker>) -> Self {
        Self {
            store,
            invoker,
            metrics: None,
            executor_config: ExecutorConfig::default(),
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsEvaluator>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn with_executor_config(mut self, config: ExecutorConfig) -> Self {
        self.executor_config = config;
        self
    }
}
