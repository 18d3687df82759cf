use axum::routing::post;
use axum::Router;

use crate::handlers;
use crate::state::AppState;

/// Mount the script execution route.
///
/// ```text
/// POST /execute     validate, run in the sandbox, return result + stdout
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/execute", post(handlers::execute::execute_script))
}
