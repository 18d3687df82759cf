//! Interpretation of a finished wrapped-program process.
//!
//! The wrapper writes its structured payload as the last non-empty line of
//! stdout (see [`super::wrapper`]). Error payloads use stdout as well; stderr
//! is never parsed and only travels back as raw diagnostics.

use serde_json::Value;

use super::executor::ExecutionOutcome;

/// Message for a zero exit whose output does not follow the protocol.
pub const PARSE_FAILURE_MESSAGE: &str = "Failed to parse script output";

/// Message for a non-zero exit without a recognizable error payload.
pub const EXECUTION_FAILURE_MESSAGE: &str = "Script execution failed";

/// Message for a process whose stdout or stderr went past the capture cap.
pub const OUTPUT_LIMIT_MESSAGE: &str = "Script output exceeded 10 MiB limit";

/// Largest tail of each raw stream carried in an infrastructure error.
pub const MAX_EXCERPT_BYTES: usize = 64 * 1024;

/// Raw result of a process that ran to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Process exit code (`-1` if killed by a signal).
    pub exit_code: i32,
    /// Complete captured stdout.
    pub stdout: String,
    /// Complete captured stderr.
    pub stderr: String,
    /// Whether either stream was cut off at the capture cap.
    pub overflowed: bool,
}

/// Map a completed process onto an [`ExecutionOutcome`].
pub fn interpret(output: ProcessOutput) -> ExecutionOutcome {
    if output.overflowed {
        return infrastructure_error(OUTPUT_LIMIT_MESSAGE, output);
    }

    let payload = last_line_object(&output.stdout);

    if output.exit_code == 0 {
        if let Some((result, stdout)) = payload.as_ref().and_then(success_fields) {
            return ExecutionOutcome::Success { result, stdout };
        }
        return infrastructure_error(PARSE_FAILURE_MESSAGE, output);
    }

    if let Some(message) = payload.as_ref().and_then(error_message) {
        return ExecutionOutcome::UserError { message };
    }
    infrastructure_error(EXECUTION_FAILURE_MESSAGE, output)
}

/// Parse the last non-empty line of `stdout` as a JSON object.
fn last_line_object(stdout: &str) -> Option<serde_json::Map<String, Value>> {
    let line = stdout.lines().rev().find(|line| !line.trim().is_empty())?;
    match serde_json::from_str(line.trim()) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

fn success_fields(payload: &serde_json::Map<String, Value>) -> Option<(Value, String)> {
    let result = payload.get("result")?.clone();
    let stdout = payload.get("stdout")?.as_str()?.to_string();
    Some((result, stdout))
}

fn error_message(payload: &serde_json::Map<String, Value>) -> Option<String> {
    payload.get("error")?.as_str().map(str::to_string)
}

fn infrastructure_error(message: &str, output: ProcessOutput) -> ExecutionOutcome {
    ExecutionOutcome::InfrastructureError {
        message: message.to_string(),
        stdout: excerpt(output.stdout),
        stderr: excerpt(output.stderr),
    }
}

/// Keep at most the last [`MAX_EXCERPT_BYTES`] of `text`, cut on a char
/// boundary. Tracebacks and trailing output live at the end.
fn excerpt(text: String) -> String {
    if text.len() <= MAX_EXCERPT_BYTES {
        return text;
    }
    let mut start = text.len() - MAX_EXCERPT_BYTES;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    text[start..].to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
