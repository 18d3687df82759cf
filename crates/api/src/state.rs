use std::sync::Arc;

use sandrun_core::scripting::executor::ScriptRunner;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`). Requests share no
/// mutable state through it.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Runs validated scripts; the sandbox executor in production.
    pub runner: Arc<dyn ScriptRunner>,
}
