//! Handlers for consistency reporting and operator remediation.
//!
//! Reports never modify data. Remediation runs only when explicitly
//! requested through `POST /consistency/remediate`.

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use ticketdesk_core::consistency::{self, CheckOptions, Remediation};
use ticketdesk_core::types::DbId;
use ticketdesk_db::repositories::TicketRepo;

use crate::error::AppResult;
use crate::middleware::actor::RequestActor;
use crate::query::ConsistencyReportParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for `POST /consistency/remediate`.
#[derive(Debug, Deserialize)]
pub struct RemediateRequest {
    pub action: String,
}

/// Outcome of a remediation run.
#[derive(Debug, Serialize)]
pub struct RemediationResult {
    pub action: Remediation,
    pub affected: usize,
    pub ticket_ids: Vec<DbId>,
}

// ---------------------------------------------------------------------------
// GET /consistency/report
// ---------------------------------------------------------------------------

/// Run the consistency checker over every stored ticket.
pub async fn report(
    State(state): State<AppState>,
    Query(params): Query<ConsistencyReportParams>,
) -> AppResult<impl IntoResponse> {
    let options = CheckOptions {
        freshness_window: state.config.freshness_window(),
        include_drift: params.include_drift,
    };
    let snapshots = TicketRepo::scan(&state.pool).await?;
    let report = consistency::check(&snapshots, Utc::now(), &options);

    tracing::info!(
        tickets_scanned = report.tickets_scanned,
        violations = report.violations.len(),
        include_drift = options.include_drift,
        "Consistency report generated",
    );

    Ok(Json(DataResponse { data: report }))
}

// ---------------------------------------------------------------------------
// POST /consistency/remediate
// ---------------------------------------------------------------------------

/// Run one named remediation and return the affected ticket ids.
pub async fn remediate(
    actor: RequestActor,
    State(state): State<AppState>,
    Json(input): Json<RemediateRequest>,
) -> AppResult<impl IntoResponse> {
    let action: Remediation = input.action.trim().parse()?;

    let ticket_ids = TicketRepo::remediate(
        &state.pool,
        action,
        state.config.freshness_window(),
        Utc::now(),
    )
    .await?;

    tracing::info!(
        action = %action,
        repairs = %action.repairs(),
        affected = ticket_ids.len(),
        actor = %actor,
        outcome = "success",
        "Remediation applied",
    );

    Ok(Json(DataResponse {
        data: RemediationResult {
            action,
            affected: ticket_ids.len(),
            ticket_ids,
        },
    }))
}
