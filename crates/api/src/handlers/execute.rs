//! Handler for sandboxed script execution.

use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::HeaderMap;
use axum::Json;
use sandrun_core::scripting::executor::ExecutionOutcome;
use sandrun_core::validation;
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Body of a successful execution.
#[derive(Debug, Serialize)]
pub struct ExecuteResponse {
    /// Value returned by the script's `main()`.
    pub result: serde_json::Value,
    /// Text the script printed to stdout.
    pub stdout: String,
}

/// POST /execute
///
/// The body is taken as raw bytes so every rejection carries the
/// validator's message instead of a generic extractor error. A body that
/// cannot be buffered (over the size limit) still gets a JSON error.
pub async fn execute_script(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> AppResult<Json<ExecuteResponse>> {
    let body = body?;
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok());

    let request = validation::validate_request(content_type, &body).map_err(|err| {
        tracing::debug!(error = %err, "Rejected execution request");
        err
    })?;

    let outcome = state.runner.run(&request).await?;
    tracing::info!(
        outcome = outcome.kind(),
        script_bytes = request.script.len(),
        "Script execution finished"
    );

    outcome_to_response(outcome)
}

/// Map an [`ExecutionOutcome`] onto the response contract.
pub fn outcome_to_response(outcome: ExecutionOutcome) -> AppResult<Json<ExecuteResponse>> {
    match outcome {
        ExecutionOutcome::Success { result, stdout } => Ok(Json(ExecuteResponse { result, stdout })),
        ExecutionOutcome::UserError { message } => Err(AppError::UserCode(message)),
        ExecutionOutcome::InfrastructureError {
            message,
            stdout,
            stderr,
        } => Err(AppError::Infrastructure {
            message,
            stdout,
            stderr,
        }),
        ExecutionOutcome::Timeout { limit } => Err(AppError::Timeout(limit)),
    }
}
