//! Sandboxed execution of submitted Python scripts.
//!
//! The pipeline is wrap ([`wrapper`]) → materialize + invoke
//! ([`executor`], [`sandbox`], [`subprocess`]) → parse ([`protocol`]).
//! All subprocess management is pure (no HTTP types) and lives in the
//! `core` crate for isolation and testability.

pub mod executor;
pub mod protocol;
pub mod sandbox;
pub mod subprocess;
pub mod wrapper;

/// Shared test helpers for executor tests.
#[cfg(test)]
pub(crate) mod test_helpers {
    use std::time::Duration;

    use super::sandbox::{Isolation, SandboxConfig};

    /// Whether a `python3` interpreter is available on this host.
    ///
    /// Tests that run real scripts return early when it is not.
    pub fn python_available() -> bool {
        std::process::Command::new("python3")
            .arg("--version")
            .output()
            .map(|out| out.status.success())
            .unwrap_or(false)
    }

    /// Direct (unjailed) launch of `python3` with the given timeout, writing
    /// scratch files into `scratch_dir`.
    pub fn direct_config(scratch_dir: &std::path::Path, timeout: Duration) -> SandboxConfig {
        SandboxConfig {
            python_bin: "python3".into(),
            isolation: Isolation::None,
            scratch_dir: scratch_dir.to_path_buf(),
            timeout,
        }
    }
}
