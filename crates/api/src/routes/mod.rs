pub mod consistency;
pub mod dashboard;
pub mod health;
pub mod tickets;
pub mod webhook;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /tickets                      list, create
/// /tickets/{id}                 get, update
///
/// /webhook/ticket               external intake (POST)
///
/// /dashboard/summary            aggregated metrics (GET)
///
/// /consistency/report           run the checker (GET, ?include_drift)
/// /consistency/remediate        operator repair (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/tickets", tickets::router())
        .nest("/webhook", webhook::router())
        .nest("/dashboard", dashboard::router())
        .nest("/consistency", consistency::router())
}
