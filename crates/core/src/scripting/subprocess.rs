//! Process spawning, output capture, and timeout enforcement.
//!
//! Provides [`run_command`], which takes a fully configured
//! [`tokio::process::Command`], runs it in its own process group, and
//! returns the captured streams. When the timeout fires, once the child has
//! exited, or when the calling future is dropped, the whole group is
//! SIGKILLed so no descendant outlives the call.

use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

use super::protocol::ProcessOutput;

/// Maximum stdout or stderr size captured per stream (10 MiB).
///
/// A stream that goes past this limit is cut off and flagged in
/// [`ProcessOutput::overflowed`]; the reader stops draining it.
pub const MAX_OUTPUT_BYTES: usize = 10 * 1024 * 1024;

/// How a supervised process ended.
#[derive(Debug)]
pub enum RunResult {
    /// The process exited on its own.
    Completed {
        /// Exit code and captured streams.
        output: ProcessOutput,
        /// Wall-clock duration in milliseconds.
        duration_ms: u64,
    },
    /// The timeout elapsed and the process group was killed.
    TimedOut {
        /// Elapsed wall-clock time before the group was killed.
        elapsed_ms: u64,
    },
}

/// Spawn `cmd` with stdin closed and stdout/stderr piped, wait at most
/// `timeout`, and capture both streams.
///
/// The caller sets program, arguments, and environment. Spawn and wait
/// failures are returned as I/O errors.
pub async fn run_command(cmd: &mut Command, timeout: Duration) -> std::io::Result<RunResult> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .process_group(0)
        .kill_on_drop(true);

    let start = Instant::now();

    let mut child = cmd.spawn()?;
    // Declared after `child` so it runs first if this future is dropped;
    // `kill_on_drop` alone would only reach the group leader.
    let mut group = ProcessGroupGuard::new(child.id());

    // Read stdout/stderr in spawned tasks so we can still call
    // `child.wait()` (which borrows `&mut child`).
    let stdout_task = tokio::spawn(read_stream(child.stdout.take()));
    let stderr_task = tokio::spawn(read_stream(child.stderr.take()));

    let wait_result = tokio::time::timeout(timeout, child.wait()).await;

    // Reap stragglers in both cases: background descendants would otherwise
    // survive the request and hold the pipes open.
    group.kill();

    match wait_result {
        Ok(Ok(status)) => {
            let duration_ms = start.elapsed().as_millis() as u64;
            let stdout = stdout_task.await.unwrap_or_default();
            let stderr = stderr_task.await.unwrap_or_default();
            if stdout.overflowed || stderr.overflowed {
                tracing::warn!(limit = MAX_OUTPUT_BYTES, "Process output exceeded capture limit");
            }

            Ok(RunResult::Completed {
                output: ProcessOutput {
                    exit_code: status.code().unwrap_or(-1),
                    stdout: String::from_utf8_lossy(&stdout.bytes).into_owned(),
                    stderr: String::from_utf8_lossy(&stderr.bytes).into_owned(),
                    overflowed: stdout.overflowed || stderr.overflowed,
                },
                duration_ms,
            })
        }
        Ok(Err(e)) => {
            stdout_task.abort();
            stderr_task.abort();
            Err(e)
        }
        Err(_elapsed) => {
            // The group is already signalled; reap the leader so it does not
            // linger as a zombie.
            let _ = child.kill().await;
            stdout_task.abort();
            stderr_task.abort();
            Ok(RunResult::TimedOut {
                elapsed_ms: start.elapsed().as_millis() as u64,
            })
        }
    }
}

/// Kills the child's process group when dropped, unless [`kill`](Self::kill)
/// already did.
struct ProcessGroupGuard {
    pgid: Option<u32>,
}

impl ProcessGroupGuard {
    fn new(pgid: Option<u32>) -> Self {
        Self { pgid }
    }

    /// Kill the group now and disarm the guard.
    fn kill(&mut self) {
        if let Some(pgid) = self.pgid.take() {
            kill_process_group(pgid);
        }
    }
}

impl Drop for ProcessGroupGuard {
    fn drop(&mut self) {
        if let Some(pgid) = self.pgid {
            tracing::debug!(pgid, "Supervising future dropped, killing process group");
        }
        self.kill();
    }
}

/// Send SIGKILL to every process in the group led by `pgid`.
///
/// `ESRCH` (group already gone) is expected and ignored.
fn kill_process_group(pgid: u32) {
    let Ok(pgid) = libc::pid_t::try_from(pgid) else {
        return;
    };
    // SAFETY: kill(2) with a negative pid only signals the process group the
    // child was placed in via `process_group(0)`; it touches no memory.
    let rc = unsafe { libc::kill(-pgid, libc::SIGKILL) };
    if rc != 0 {
        let err = std::io::Error::last_os_error();
        if err.raw_os_error() != Some(libc::ESRCH) {
            tracing::warn!(pgid, error = %err, "Failed to kill process group");
        }
    }
}

/// Bytes read from one output stream.
#[derive(Debug, Default)]
struct CapturedStream {
    bytes: Vec<u8>,
    overflowed: bool,
}

/// Read an output stream into a byte buffer, capped at [`MAX_OUTPUT_BYTES`].
///
/// One byte past the cap is requested so a stream of exactly the limit is
/// not mistaken for an overflowing one.
async fn read_stream<R: AsyncRead + Unpin>(handle: Option<R>) -> CapturedStream {
    let mut bytes = Vec::new();
    if let Some(mut h) = handle {
        let _ = (&mut h)
            .take(MAX_OUTPUT_BYTES as u64 + 1)
            .read_to_end(&mut bytes)
            .await;
    }
    let overflowed = bytes.len() > MAX_OUTPUT_BYTES;
    bytes.truncate(MAX_OUTPUT_BYTES);
    CapturedStream { bytes, overflowed }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
