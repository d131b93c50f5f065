//! Route definitions for consistency checking.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::consistency;
use crate::state::AppState;

/// Consistency routes mounted at `/consistency`.
///
/// ```text
/// GET  /report      -> report
/// POST /remediate   -> remediate
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/report", get(consistency::report))
        .route("/remediate", post(consistency::remediate))
}
