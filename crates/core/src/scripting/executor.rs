//! Script execution interface and the sandbox-backed implementation.
//!
//! Defines [`ScriptRunner`], the seam the HTTP layer calls, along with
//! [`ExecutionOutcome`], [`ExecutorError`], and [`SandboxExecutor`].

use std::io::Write;
use std::time::Duration;

use serde_json::Value;

use super::protocol;
use super::sandbox::SandboxConfig;
use super::subprocess::{self, RunResult};
use super::wrapper::WrappedProgram;
use crate::validation::ExecutionRequest;

/// Tagged result of one execution attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionOutcome {
    /// `main()` returned a JSON-serializable value.
    Success {
        /// Value returned by `main()`.
        result: Value,
        /// Text the script printed to stdout.
        stdout: String,
    },
    /// The user code raised or returned something unserializable.
    UserError {
        /// Message produced on the sandboxed side.
        message: String,
    },
    /// The process output violated the wrapper protocol.
    InfrastructureError {
        /// Short description of the violation.
        message: String,
        /// Raw captured stdout.
        stdout: String,
        /// Raw captured stderr.
        stderr: String,
    },
    /// The wall-clock limit elapsed and the process was killed.
    Timeout {
        /// The limit that was exceeded.
        limit: Duration,
    },
}

impl ExecutionOutcome {
    /// Short label used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Success { .. } => "success",
            Self::UserError { .. } => "user_error",
            Self::InfrastructureError { .. } => "infrastructure_error",
            Self::Timeout { .. } => "timeout",
        }
    }
}

/// Failures that prevent an execution attempt from happening at all.
#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    /// The scratch file could not be created or written.
    #[error("Failed to prepare scratch file: {0}")]
    Scratch(#[source] std::io::Error),

    /// The sandbox process could not be spawned or waited on.
    #[error("Failed to launch sandbox: {0}")]
    Launch(#[source] std::io::Error),
}

/// Runs a validated request and reports its outcome.
///
/// Implemented by [`SandboxExecutor`]; tests substitute doubles to observe
/// whether a launch happened at all.
#[async_trait::async_trait]
pub trait ScriptRunner: Send + Sync {
    /// Execute `request` once. Never retried.
    async fn run(&self, request: &ExecutionRequest) -> Result<ExecutionOutcome, ExecutorError>;
}

/// Executes scripts in a fresh sandboxed interpreter per request.
#[derive(Debug, Clone)]
pub struct SandboxExecutor {
    config: SandboxConfig,
}

impl SandboxExecutor {
    /// Create an executor with the given launch configuration.
    pub fn new(config: SandboxConfig) -> Self {
        Self { config }
    }

    /// Wrap, materialize, invoke, and parse `script`.
    ///
    /// The scratch file is removed before this returns on every path,
    /// including timeout and launch failure.
    pub async fn execute(&self, script: &str) -> Result<ExecutionOutcome, ExecutorError> {
        let program = WrappedProgram::new(script);
        let scratch = self.write_scratch(&program)?;

        tracing::debug!(
            script_path = %scratch.path().display(),
            program_bytes = program.len(),
            "Launching sandboxed script"
        );

        let mut cmd = self.config.command(scratch.path());
        let run = subprocess::run_command(&mut cmd, self.config.timeout).await;

        let scratch_path = scratch.path().to_path_buf();
        if let Err(e) = scratch.close() {
            tracing::warn!(
                script_path = %scratch_path.display(),
                error = %e,
                "Failed to remove scratch file"
            );
        }

        let outcome = match run.map_err(ExecutorError::Launch)? {
            RunResult::Completed {
                output,
                duration_ms,
            } => {
                tracing::debug!(exit_code = output.exit_code, duration_ms, "Script finished");
                protocol::interpret(output)
            }
            RunResult::TimedOut { elapsed_ms } => {
                tracing::warn!(elapsed_ms, "Script timed out, process group killed");
                ExecutionOutcome::Timeout {
                    limit: self.config.timeout,
                }
            }
        };

        Ok(outcome)
    }

    /// Create a uniquely named scratch file and write `program` into it.
    ///
    /// The returned handle deletes the file when dropped.
    fn write_scratch(
        &self,
        program: &WrappedProgram,
    ) -> Result<tempfile::NamedTempFile, ExecutorError> {
        let mut file = tempfile::Builder::new()
            .prefix("sandrun-")
            .suffix(".py")
            .tempfile_in(&self.config.scratch_dir)
            .map_err(ExecutorError::Scratch)?;

        file.write_all(program.source().as_bytes())
            .and_then(|()| file.flush())
            .map_err(ExecutorError::Scratch)?;

        Ok(file)
    }
}

#[async_trait::async_trait]
impl ScriptRunner for SandboxExecutor {
    async fn run(&self, request: &ExecutionRequest) -> Result<ExecutionOutcome, ExecutorError> {
        self.execute(&request.script).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
