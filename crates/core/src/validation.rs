//! Request validation for `POST /execute`.
//!
//! Checks run in a fixed order and the first failure wins. Nothing here
//! touches the filesystem or spawns a process, so a rejected request never
//! reaches the executor.

use serde_json::Value;

/// Substring that marks the required zero-argument entry point.
///
/// This is a cheap pre-filter, not a parse: syntax errors are reported by the
/// interpreter itself once the script runs.
pub const ENTRY_POINT_MARKER: &str = "def main()";

/// A request that passed every check and is ready to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionRequest {
    /// Submitted source text, unmodified.
    pub script: String,
}

/// Reasons a request is rejected before execution.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Content-Type must be application/json")]
    BadContentType,

    #[error("Request body must be a JSON object")]
    InvalidBody,

    #[error("Missing 'script' field in request body")]
    MissingField,

    #[error("'script' must be a string")]
    WrongType,

    #[error("'script' cannot be empty")]
    EmptyScript,

    #[error("Script must contain a 'def main():' function")]
    MissingEntryPoint,
}

/// Validate a raw request given its `Content-Type` header and body bytes.
pub fn validate_request(
    content_type: Option<&str>,
    body: &[u8],
) -> Result<ExecutionRequest, ValidationError> {
    if !content_type.is_some_and(is_json_content_type) {
        return Err(ValidationError::BadContentType);
    }

    let payload: Value =
        serde_json::from_slice(body).map_err(|_| ValidationError::InvalidBody)?;

    validate_payload(payload)
}

/// Validate an already-parsed JSON payload.
pub fn validate_payload(payload: Value) -> Result<ExecutionRequest, ValidationError> {
    let Value::Object(mut fields) = payload else {
        return Err(ValidationError::InvalidBody);
    };

    let script = match fields.remove("script") {
        None => return Err(ValidationError::MissingField),
        Some(Value::String(script)) => script,
        Some(_) => return Err(ValidationError::WrongType),
    };

    if script.trim().is_empty() {
        return Err(ValidationError::EmptyScript);
    }

    if !script.contains(ENTRY_POINT_MARKER) {
        return Err(ValidationError::MissingEntryPoint);
    }

    Ok(ExecutionRequest { script })
}

/// Whether a `Content-Type` value denotes JSON.
///
/// Accepts `application/json` and `application/<anything>+json`, ignoring
/// parameters such as `charset` and letter case.
pub fn is_json_content_type(value: &str) -> bool {
    let mime = value
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    match mime.strip_prefix("application/") {
        Some("json") => true,
        Some(subtype) => subtype.ends_with("+json"),
        None => false,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
