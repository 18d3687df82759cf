#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use sandrun_core::scripting::executor::{
    ExecutionOutcome, ExecutorError, SandboxExecutor, ScriptRunner,
};
use sandrun_core::scripting::sandbox::{Isolation, SandboxConfig};
use sandrun_core::validation::ExecutionRequest;
use tower::ServiceExt;

use sandrun_api::config::ServerConfig;
use sandrun_api::router::build_app_router;
use sandrun_api::state::AppState;

/// Build a test `ServerConfig` with safe defaults.
///
/// Runs `python3` from `PATH` without a jail and writes scratch files into
/// `scratch_dir`.
pub fn test_config(scratch_dir: &Path, execution_timeout: Duration) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        request_timeout_secs: execution_timeout.as_secs() + 30,
        max_body_bytes: 1024 * 1024,
        sandbox: SandboxConfig {
            python_bin: "python3".into(),
            isolation: Isolation::None,
            scratch_dir: scratch_dir.to_path_buf(),
            timeout: execution_timeout,
        },
    }
}

/// Build the full application router around an arbitrary runner.
///
/// Goes through [`build_app_router`] so integration tests exercise the
/// same middleware stack (request ID, timeout, tracing, panic recovery)
/// that production uses.
pub fn build_test_app(config: ServerConfig, runner: Arc<dyn ScriptRunner>) -> Router {
    let state = AppState {
        config: Arc::new(config),
        runner,
    };
    build_app_router(state)
}

/// Build the application with the real sandbox executor.
pub fn build_sandbox_app(scratch_dir: &Path, execution_timeout: Duration) -> Router {
    let config = test_config(scratch_dir, execution_timeout);
    let executor = SandboxExecutor::new(config.sandbox.clone());
    build_test_app(config, Arc::new(executor))
}

/// Whether a `python3` interpreter is available; sandbox-backed tests
/// return early without it.
pub fn python_available() -> bool {
    std::process::Command::new("python3")
        .arg("--version")
        .output()
        .map(|out| out.status.success())
        .unwrap_or(false)
}

/// Runner double that counts launches and returns a fixed outcome.
pub struct CountingRunner {
    launches: AtomicUsize,
    outcome: ExecutionOutcome,
}

impl CountingRunner {
    pub fn new(outcome: ExecutionOutcome) -> Arc<Self> {
        Arc::new(Self {
            launches: AtomicUsize::new(0),
            outcome,
        })
    }

    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ScriptRunner for CountingRunner {
    async fn run(&self, _request: &ExecutionRequest) -> Result<ExecutionOutcome, ExecutorError> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        Ok(self.outcome.clone())
    }
}

/// Runner double that always fails to launch.
pub struct FailingRunner;

#[async_trait::async_trait]
impl ScriptRunner for FailingRunner {
    async fn run(&self, _request: &ExecutionRequest) -> Result<ExecutionOutcome, ExecutorError> {
        Err(ExecutorError::Launch(std::io::Error::other(
            "nsjail: /usr/sbin/nsjail not found",
        )))
    }
}

/// Runner double that panics, to exercise panic recovery.
pub struct PanickingRunner;

#[async_trait::async_trait]
impl ScriptRunner for PanickingRunner {
    async fn run(&self, _request: &ExecutionRequest) -> Result<ExecutionOutcome, ExecutorError> {
        panic!("runner exploded");
    }
}

/// A successful outcome for runner doubles.
pub fn success_outcome() -> ExecutionOutcome {
    ExecutionOutcome::Success {
        result: serde_json::json!("ok"),
        stdout: String::new(),
    }
}

/// Issue a GET request.
pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// POST a JSON body with `Content-Type: application/json`.
pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    post_raw(app, uri, Some("application/json"), body.to_string()).await
}

/// POST a raw body with an optional content type.
pub async fn post_raw(
    app: Router,
    uri: &str,
    content_type: Option<&str>,
    body: impl Into<Body>,
) -> Response<Body> {
    let mut builder = Request::builder().method(Method::POST).uri(uri);
    if let Some(content_type) = content_type {
        builder = builder.header("content-type", content_type);
    }
    app.oneshot(builder.body(body.into()).unwrap())
        .await
        .unwrap()
}

/// POST `{"script": script}` to `/execute`.
pub async fn execute(app: Router, script: &str) -> Response<Body> {
    post_json(app, "/execute", serde_json::json!({ "script": script })).await
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
