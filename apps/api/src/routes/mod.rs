pub mod health;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::state::AppState;
use crate::workflow::handlers;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/run", get(handlers::handle_get_run))
        .route(
            "/api/v1/run/transcript",
            put(handlers::handle_edit_transcript),
        )
        .route(
            "/api/v1/run/questions",
            post(handlers::handle_generate_questions),
        )
        .route(
            "/api/v1/run/scores/:number",
            put(handlers::handle_set_score),
        )
        .route(
            "/api/v1/run/assessment",
            post(handlers::handle_submit_assessment),
        )
        .route("/api/v1/run/draft", post(handlers::handle_generate_draft))
        .route("/api/v1/run/back", post(handlers::handle_back))
        .route("/api/v1/run/reset", post(handlers::handle_reset))
        .with_state(state)
}
