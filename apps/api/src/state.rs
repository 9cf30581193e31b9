use std::sync::Arc;

use tokio::sync::Mutex;

use crate::config::Config;
use crate::llm_client::LlmClient;
use crate::workflow::state::RunState;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub llm: LlmClient,
    pub config: Config,
    /// The single live run. Held for the whole of an action, including the
    /// provider call, so actions never overlap.
    pub run: Arc<Mutex<RunState>>,
}

impl AppState {
    pub fn new(llm: LlmClient, config: Config) -> Self {
        Self {
            llm,
            config,
            run: Arc::new(Mutex::new(RunState::new())),
        }
    }
}
