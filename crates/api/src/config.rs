use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use sandrun_core::scripting::sandbox::{Isolation, SandboxConfig};

/// Errors raised while loading configuration at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A variable is set but cannot be parsed.
    #[error("{key} has an invalid value '{value}': expected {expected}")]
    Invalid {
        key: &'static str,
        value: String,
        expected: &'static str,
    },

    /// The HTTP request ceiling would cut executions short.
    #[error(
        "REQUEST_TIMEOUT_SECS ({request}) must be greater than EXECUTION_TIMEOUT_SECS ({execution})"
    )]
    TimeoutOrdering { request: u64, execution: u64 },
}

/// Server configuration loaded from environment variables.
///
/// All fields have defaults matching the production container layout.
/// Override via environment variables (a `.env` file is honoured).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `8080`).
    pub port: u16,
    /// HTTP request timeout in seconds (default: `60`).
    ///
    /// A ceiling for the whole request; must exceed the execution limit so
    /// the executor's own timeout response wins.
    pub request_timeout_secs: u64,
    /// Maximum accepted request body size in bytes (default: 1 MiB).
    pub max_body_bytes: usize,
    /// Interpreter launch settings handed to the executor.
    pub sandbox: SandboxConfig,
}

impl ServerConfig {
    /// Load configuration from the process environment.
    ///
    /// | Env Var                  | Default                  |
    /// |--------------------------|--------------------------|
    /// | `HOST`                   | `0.0.0.0`                |
    /// | `PORT`                   | `8080`                   |
    /// | `REQUEST_TIMEOUT_SECS`   | `60`                     |
    /// | `MAX_BODY_BYTES`         | `1048576`                |
    /// | `EXECUTION_TIMEOUT_SECS` | `30`                     |
    /// | `PYTHON_BIN`             | `/usr/local/bin/python3` |
    /// | `SANDBOX_MODE`           | `nsjail` (or `none`)     |
    /// | `NSJAIL_BIN`             | `/usr/sbin/nsjail`       |
    /// | `NSJAIL_CONFIG`          | `/app/nsjail.cfg`        |
    /// | `SCRATCH_DIR`            | system temp directory    |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = parse_or(&lookup, "PORT", 8080, "a port number")?;
        let request_timeout_secs: u64 =
            parse_or(&lookup, "REQUEST_TIMEOUT_SECS", 60, "a number of seconds")?;
        let max_body_bytes: usize =
            parse_or(&lookup, "MAX_BODY_BYTES", 1024 * 1024, "a byte count")?;
        let execution_timeout_secs: u64 =
            parse_or(&lookup, "EXECUTION_TIMEOUT_SECS", 30, "a number of seconds")?;

        if request_timeout_secs <= execution_timeout_secs {
            return Err(ConfigError::TimeoutOrdering {
                request: request_timeout_secs,
                execution: execution_timeout_secs,
            });
        }

        let isolation = match lookup("SANDBOX_MODE").as_deref() {
            None | Some("nsjail") => Isolation::Nsjail {
                binary: path_or(&lookup, "NSJAIL_BIN", "/usr/sbin/nsjail"),
                config: path_or(&lookup, "NSJAIL_CONFIG", "/app/nsjail.cfg"),
            },
            Some("none") => Isolation::None,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    key: "SANDBOX_MODE",
                    value: other.to_string(),
                    expected: "'nsjail' or 'none'",
                })
            }
        };

        let sandbox = SandboxConfig {
            python_bin: path_or(&lookup, "PYTHON_BIN", "/usr/local/bin/python3"),
            isolation,
            scratch_dir: lookup("SCRATCH_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(std::env::temp_dir),
            timeout: Duration::from_secs(execution_timeout_secs),
        };

        Ok(Self {
            host,
            port,
            request_timeout_secs,
            max_body_bytes,
            sandbox,
        })
    }
}

fn parse_or<F, T>(
    lookup: &F,
    key: &'static str,
    default: T,
    expected: &'static str,
) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
            key,
            value,
            expected,
        }),
    }
}

fn path_or<F>(lookup: &F, key: &str, default: &str) -> PathBuf
where
    F: Fn(&str) -> Option<String>,
{
    PathBuf::from(lookup(key).unwrap_or_else(|| default.to_string()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
