//! Handlers for ticket intake, listing and updates.
//!
//! Every write runs through the rule engine before it reaches storage, so
//! assignment and status automation apply no matter which endpoint a
//! change arrives from.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;

use ticketdesk_core::error::CoreError;
use ticketdesk_core::rules::{self, Rule};
use ticketdesk_core::search::{clamp_limit, clamp_offset};
use ticketdesk_core::ticket::{NewTicket, Ticket, TicketChanges, TicketPriority, TicketStatus};
use ticketdesk_core::types::DbId;
use ticketdesk_db::models::ticket::{CreateTicket, TicketListParams, UpdateTicket};
use ticketdesk_db::repositories::TicketRepo;
use ticketdesk_db::DbPool;

use crate::error::{AppError, AppResult};
use crate::middleware::actor::RequestActor;
use crate::response::DataResponse;
use crate::state::AppState;

/// Default page size for `GET /tickets`.
const DEFAULT_LIST_LIMIT: i64 = 100;

/// Largest page size for `GET /tickets`.
const MAX_LIST_LIMIT: i64 = 500;

/// Attempts at a conditional update before reporting a conflict.
const MAX_UPDATE_ATTEMPTS: usize = 3;

// ---------------------------------------------------------------------------
// GET /tickets
// ---------------------------------------------------------------------------

/// List tickets, newest first, with optional status and priority filters.
pub async fn list_tickets(
    State(state): State<AppState>,
    Query(params): Query<TicketListParams>,
) -> AppResult<impl IntoResponse> {
    let status = params
        .status
        .as_deref()
        .map(str::parse::<TicketStatus>)
        .transpose()?;
    let priority = params
        .priority
        .as_deref()
        .map(str::parse::<TicketPriority>)
        .transpose()?;

    let limit = clamp_limit(params.limit, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT);
    let offset = clamp_offset(params.offset);

    let tickets = TicketRepo::list_filtered(&state.pool, status, priority, limit, offset).await?;

    Ok(Json(DataResponse { data: tickets }))
}

// ---------------------------------------------------------------------------
// GET /tickets/{id}
// ---------------------------------------------------------------------------

pub async fn get_ticket(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let ticket = find_ticket(&state.pool, id).await?;
    Ok(Json(DataResponse { data: ticket }))
}

// ---------------------------------------------------------------------------
// POST /tickets
// ---------------------------------------------------------------------------

/// Create a ticket. Title, description and priority are required.
pub async fn create_ticket(
    actor: RequestActor,
    State(state): State<AppState>,
    Json(input): Json<CreateTicket>,
) -> AppResult<impl IntoResponse> {
    let proposed = input.into_changes()?;
    let ticket = insert_resolved(&state.pool, &proposed, &actor, "api").await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: ticket })))
}

/// Resolve a creation through the rule engine and store it.
pub(crate) async fn insert_resolved(
    pool: &DbPool,
    proposed: &TicketChanges,
    actor: &RequestActor,
    source: &'static str,
) -> AppResult<Ticket> {
    let now = Utc::now();
    let resolution = rules::resolve_with_rules(None, proposed, now);
    let new_ticket = NewTicket::from_resolved(resolution.changes, now)?;
    let ticket = TicketRepo::create(pool, &new_ticket).await?;

    log_fired_rules(ticket.id, &resolution.fired, actor);
    tracing::info!(
        ticket_id = ticket.id,
        priority = %ticket.priority,
        status = %ticket.status,
        assigned_to = ticket.assigned_to.as_deref(),
        actor = %actor,
        source,
        outcome = "success",
        "Ticket created",
    );

    Ok(ticket)
}

// ---------------------------------------------------------------------------
// PUT /tickets/{id}
// ---------------------------------------------------------------------------

/// Apply a partial update.
///
/// The resolved change is written with a conditional update on the ticket's
/// version. If another writer got there first, the current row is re-read
/// and the rules are re-run against it, up to [`MAX_UPDATE_ATTEMPTS`] times.
pub async fn update_ticket(
    actor: RequestActor,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateTicket>,
) -> AppResult<impl IntoResponse> {
    let proposed = input.into_changes()?;
    if proposed.is_empty() {
        return Err(AppError::BadRequest("No fields to update".into()));
    }

    for attempt in 1..=MAX_UPDATE_ATTEMPTS {
        let current = find_ticket(&state.pool, id).await?;
        let resolution = rules::resolve_with_rules(Some(&current), &proposed, Utc::now());

        match TicketRepo::update(&state.pool, id, current.version, &resolution.changes).await? {
            Some(ticket) => {
                log_fired_rules(ticket.id, &resolution.fired, &actor);
                tracing::info!(
                    ticket_id = ticket.id,
                    version = ticket.version,
                    status = %ticket.status,
                    priority = %ticket.priority,
                    assigned_to = ticket.assigned_to.as_deref(),
                    actor = %actor,
                    outcome = "success",
                    "Ticket updated",
                );
                return Ok(Json(DataResponse { data: ticket }));
            }
            None => {
                tracing::debug!(
                    ticket_id = id,
                    attempt,
                    expected_version = current.version,
                    "Concurrent ticket update detected, retrying",
                );
            }
        }
    }

    tracing::warn!(
        ticket_id = id,
        actor = %actor,
        attempts = MAX_UPDATE_ATTEMPTS,
        "Ticket update gave up after repeated conflicts",
    );
    Err(AppError::Core(CoreError::Conflict(format!(
        "Ticket {id} was modified concurrently; retry the update"
    ))))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn find_ticket(pool: &DbPool, id: DbId) -> AppResult<Ticket> {
    TicketRepo::find_by_id(pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Ticket",
            id,
        }))
}

fn log_fired_rules(ticket_id: DbId, fired: &[Rule], actor: &RequestActor) {
    for rule in fired {
        tracing::info!(ticket_id, rule = %rule, actor = %actor, "Automation rule applied");
    }
}
