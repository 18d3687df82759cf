use std::time::Duration;

use axum::extract::rejection::BytesRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use sandrun_core::scripting::executor::ExecutorError;
use sandrun_core::validation::ValidationError;
use serde_json::json;

/// Generic message for failures in request handling itself.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

/// Application-level error type for HTTP handlers.
///
/// Every non-success response body is `{"error": ...}`; infrastructure
/// errors add the raw streams for operator diagnosis.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// The request was rejected before execution.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The submitted code failed on the sandboxed side.
    #[error("{0}")]
    UserCode(String),

    /// The execution exceeded its wall-clock limit.
    #[error("Script execution timeout ({}s limit)", .0.as_secs())]
    Timeout(Duration),

    /// The subprocess output violated the wrapper protocol.
    #[error("{message}")]
    Infrastructure {
        message: String,
        stdout: String,
        stderr: String,
    },

    /// The execution could not be started.
    #[error(transparent)]
    Executor(#[from] ExecutorError),

    /// The request body could not be read (e.g. it exceeds the size limit).
    #[error(transparent)]
    Body(#[from] BytesRejection),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            AppError::Validation(err) => (StatusCode::BAD_REQUEST, json!({ "error": err.to_string() })),
            AppError::UserCode(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            AppError::Timeout(_) => (
                StatusCode::REQUEST_TIMEOUT,
                json!({ "error": self.to_string() }),
            ),
            AppError::Infrastructure {
                message,
                stdout,
                stderr,
            } => {
                tracing::error!(error = %message, "Sandbox output protocol violated");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": message, "stdout": stdout, "stderr": stderr }),
                )
            }
            AppError::Executor(err) => {
                tracing::error!(error = %err, "Executor failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": INTERNAL_ERROR_MESSAGE }),
                )
            }
            AppError::Body(rejection) => {
                tracing::debug!(error = %rejection, "Rejected request body");
                (rejection.status(), json!({ "error": rejection.body_text() }))
            }
        };

        (status, axum::Json(body)).into_response()
    }
}
