use axum::routing::post;
use axum::Router;

use crate::handlers::webhook;
use crate::state::AppState;

/// Intake routes mounted at `/webhook`.
///
/// ```text
/// POST /ticket   -> receive_ticket
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/ticket", post(webhook::receive_ticket))
}
