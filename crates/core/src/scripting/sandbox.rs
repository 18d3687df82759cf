//! How the interpreter is launched: isolation wrapper, environment, limits.
//!
//! The jail itself (namespaces, cgroups, seccomp, mounts) is owned by the
//! external isolation tool and its config file. This module only builds the
//! command line that hands the interpreter to it.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::process::Command;

/// Environment handed to the sandboxed interpreter. Nothing else is inherited.
pub const ENV_ALLOW_LIST: &[(&str, &str)] = &[
    ("OPENBLAS_NUM_THREADS", "1"),
    ("OMP_NUM_THREADS", "1"),
    ("MKL_NUM_THREADS", "1"),
    ("PYTHONDONTWRITEBYTECODE", "1"),
    ("PYTHONUNBUFFERED", "1"),
];

/// Default wall-clock limit for one execution.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Isolation mechanism wrapped around the interpreter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Isolation {
    /// Launch the interpreter directly. Only for trusted hosts and tests.
    None,
    /// Launch the interpreter inside nsjail.
    Nsjail {
        /// Path to the `nsjail` binary.
        binary: PathBuf,
        /// Path to the nsjail configuration file.
        config: PathBuf,
    },
}

/// Everything needed to launch one wrapped program.
#[derive(Debug, Clone)]
pub struct SandboxConfig {
    /// Python interpreter, as seen from inside the sandbox.
    pub python_bin: PathBuf,
    /// Isolation wrapper.
    pub isolation: Isolation,
    /// Directory where per-request scratch files are created.
    pub scratch_dir: PathBuf,
    /// Hard wall-clock limit; the process group is killed when it elapses.
    pub timeout: Duration,
}

impl SandboxConfig {
    /// Build the launch command for the program stored at `script_path`.
    ///
    /// The environment is cleared on the outer process in every mode; under
    /// nsjail the allow-list is additionally passed with `--env` because the
    /// jail does not forward its own environment.
    pub fn command(&self, script_path: &Path) -> Command {
        let mut cmd = match &self.isolation {
            Isolation::None => {
                let mut cmd = Command::new(&self.python_bin);
                cmd.arg(script_path);
                cmd
            }
            Isolation::Nsjail { binary, config } => {
                let mut cmd = Command::new(binary);
                cmd.arg("--config").arg(config).arg("--quiet");
                for (key, value) in ENV_ALLOW_LIST {
                    cmd.arg("--env").arg(format!("{key}={value}"));
                }
                cmd.arg("--").arg(&self.python_bin).arg(script_path);
                cmd
            }
        };

        cmd.env_clear();
        cmd.envs(ENV_ALLOW_LIST.iter().copied());
        cmd
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
