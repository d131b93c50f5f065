//! Handler for ticket intake from external systems.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use ticketdesk_db::models::ticket::WebhookTicket;

use crate::error::AppResult;
use crate::handlers::tickets::insert_resolved;
use crate::middleware::actor::RequestActor;
use crate::response::MessageResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// POST /webhook/ticket
// ---------------------------------------------------------------------------

/// Accept a ticket from an external source. Priority defaults to `medium`.
pub async fn receive_ticket(
    actor: RequestActor,
    State(state): State<AppState>,
    Json(input): Json<WebhookTicket>,
) -> AppResult<impl IntoResponse> {
    let proposed = input.into_changes()?;
    let ticket = insert_resolved(&state.pool, &proposed, &actor, "webhook").await?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "Ticket created successfully",
            data: ticket,
        }),
    ))
}
