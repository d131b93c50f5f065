//! Handler for the ticket dashboard summary.

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;

use ticketdesk_core::analytics;
use ticketdesk_db::repositories::TicketRepo;

use crate::error::AppResult;
use crate::query::DashboardParams;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// GET /dashboard/summary
// ---------------------------------------------------------------------------

/// Aggregate metrics over the tickets matching the query filters.
pub async fn summary(
    State(state): State<AppState>,
    Query(params): Query<DashboardParams>,
) -> AppResult<impl IntoResponse> {
    let (filter, latest) = params.into_filter()?;
    let tickets = TicketRepo::list_all(&state.pool).await?;
    let summary = analytics::summarize(&tickets, &filter, latest);

    tracing::debug!(
        scanned = tickets.len(),
        selected = summary.total,
        "Dashboard summary computed",
    );

    Ok(Json(DataResponse { data: summary }))
}
