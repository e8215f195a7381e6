pub mod api;
pub mod dto;
pub mod error;
pub mod state;

use axum::{Router, routing::get};
use tower_http::cors::{Any, CorsLayer};

use crate::state::AppState;

pub fn app_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .merge(api::experiments::routes())
        .merge(api::test_cases::routes())
        .merge(api::runs::routes())
        .with_state(state)
        .layer(cors)
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use async_trait::async_trait;

    use gauntlet_core::error::{GauntletError, ModelError, Result};
    use gauntlet_core::invoker::{Completion, ModelInvoker};
    use gauntlet_store::SqliteStore;

    use crate::state::AppState;

    /// Echoes the user message back as the model response.
    pub struct EchoInvoker;

    #[async_trait]
    impl ModelInvoker for EchoInvoker {
        async fn invoke(
            &self,
            _model: &str,
            _system_prompt: &str,
            user_message: &str,
        ) -> Result<Completion> {
            Ok(Completion {
                content: user_message.to_owned(),
                latency_seconds: 0.001,
            })
        }
    }

    /// Fails every invocation with a provider error.
    pub struct FailingInvoker;

    #[async_trait]
    impl ModelInvoker for FailingInvoker {
        async fn invoke(&self, _: &str, _: &str, _: &str) -> Result<Completion> {
            Err(GauntletError::Model(ModelError::ApiRequest(
                "HTTP 503: service unavailable".into(),
            )))
        }
    }

    /// Hangs far past any test deadline before answering.
    pub struct SlowInvoker;

    #[async_trait]
    impl ModelInvoker for SlowInvoker {
        async fn invoke(&self, _: &str, _: &str, user_message: &str) -> Result<Completion> {
            tokio::time::sleep(std::time::Duration::from_secs(30)).await;
            Ok(Completion {
                content: user_message.to_owned(),
                latency_seconds: 30.0,
            })
        }
    }

    pub fn test_state() -> AppState {
        AppState::new(
            Arc::new(SqliteStore::in_memory().unwrap()),
            Arc::new(EchoInvoker),
        )
    }

    pub fn failing_state() -> AppState {
        AppState::new(
            Arc::new(SqliteStore::in_memory().unwrap()),
            Arc::new(FailingInvoker),
        )
    }

    pub fn slow_state() -> AppState {
        AppState::new(
            Arc::new(SqliteStore::in_memory().unwrap()),
            Arc::new(SlowInvoker),
        )
    }
}
