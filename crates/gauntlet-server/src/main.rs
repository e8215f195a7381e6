use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gauntlet_eval::executor::ExecutorConfig;
use gauntlet_eval::metrics::HttpMetricsEvaluator;
use gauntlet_llm::groq::GroqClient;
use gauntlet_server::state::AppState;
use gauntlet_store::SqliteStore;

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gauntlet_server=info".into()),
        )
        .init();

    let api_key = std::env::var("GROQ_API_KEY").expect("GROQ_API_KEY must be set");
    let invoker = Arc::new(GroqClient::new(api_key));

    let store = match std::env::var("GAUNTLET_DB") {
        Ok(path) => {
            tracing::info!(path, "using SQLite database");
            SqliteStore::new(path).expect("failed to open database")
        }
        Err(_) => {
            tracing::warn!("GAUNTLET_DB not set, using in-memory database");
            SqliteStore::in_memory().expect("failed to open in-memory database")
        }
    };

    let mut state = AppState::new(Arc::new(store), invoker).with_executor_config(executor_config());
    if let Ok(url) = std::env::var("GAUNTLET_METRICS_URL") {
        tracing::info!(url, "metrics evaluator enabled");
        state = state.with_metrics(Arc::new(HttpMetricsEvaluator::new(url)));
    }

    let app = gauntlet_server::app_router(state);

    let addr = std::env::var("GAUNTLET_ADDR").unwrap_or_else(|_| "0.0.0.0:3001".into());
    tracing::info!("Gauntlet server listening on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}

fn executor_config() -> ExecutorConfig {
    let mut config = ExecutorConfig::default();
    if let Ok(value) = std::env::var("GAUNTLET_MAX_CONCURRENCY") {
        match value.parse::<usize>() {
            Ok(n) if n > 0 => config.max_concurrency = n,
            _ => tracing::warn!(value, "ignoring invalid GAUNTLET_MAX_CONCURRENCY"),
        }
    }
    if let Ok(value) = std::env::var("GAUNTLET_RUN_DEADLINE_SECS") {
        match value.parse::<u64>() {
            Ok(secs) if secs > 0 => config.run_deadline = Some(Duration::from_secs(secs)),
            _ => tracing::warn!(value, "ignoring invalid GAUNTLET_RUN_DEADLINE_SECS"),
        }
    }
    tracing::info!(
        max_concurrency = config.max_concurrency,
        run_deadline = ?config.run_deadline,
        "executor configured"
    );
    config
}
