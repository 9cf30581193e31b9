use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::llm_client::LlmError;
use crate::workflow::machine::WorkflowError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Workflow(e) => match e {
                WorkflowError::Llm(LlmError::Blocked(_)) => StatusCode::UNPROCESSABLE_ENTITY,
                WorkflowError::Llm(_) => StatusCode::BAD_GATEWAY,
                WorkflowError::ParseFailure { .. } | WorkflowError::UnexpectedLabel { .. } => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                WorkflowError::MissingPrerequisite(_) => StatusCode::INTERNAL_SERVER_ERROR,
                WorkflowError::InvalidTransition { .. } => StatusCode::CONFLICT,
                WorkflowError::Validation(_) => StatusCode::BAD_REQUEST,
            },
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Workflow(e) => e.code(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();
        let message = self.to_string();

        if status.is_server_error() {
            tracing::error!("{code}: {message}");
        }

        let mut error = json!({
            "code": code,
            "message": message,
        });
        if let AppError::Workflow(e) = &self {
            if let Some(raw) = e.raw_output() {
                error["raw_output"] = json!(raw);
            }
        }

        (status, Json(json!({ "error": error }))).into_response()
    }
}
