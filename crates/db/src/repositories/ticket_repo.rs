//! Repository for the `tickets` table.

use chrono::Duration;
use sqlx::PgPool;
use ticketdesk_core::consistency::{Remediation, TicketSnapshot};
use ticketdesk_core::ticket::{
    NewTicket, Ticket, TicketChanges, TicketField, TicketPriority, TicketStatus, JUNIOR_ANALYST,
    SUPPORT_BOT,
};
use ticketdesk_core::types::{DbId, Timestamp};

use crate::models::ticket::{TicketRow, TicketScanRow};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str =
    "id, title, description, status, priority, created_at, updated_at, assigned_to, version";

/// Columns read by consistency scans.
const SCAN_COLUMNS: &str =
    "id, title, description, status, priority, created_at, updated_at, assigned_to";

/// Provides storage operations for tickets.
pub struct TicketRepo;

impl TicketRepo {
    /// Insert a resolved ticket, returning the stored row.
    pub async fn create(pool: &PgPool, input: &NewTicket) -> Result<Ticket, sqlx::Error> {
        let query = format!(
            "INSERT INTO tickets \
                (title, description, status, priority, created_at, updated_at, assigned_to) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, TicketRow>(&query)
            .bind(&input.title)
            .bind(&input.description)
            .bind(input.status.as_str())
            .bind(input.priority.as_str())
            .bind(input.created_at)
            .bind(input.updated_at)
            .bind(&input.assigned_to)
            .fetch_one(pool)
            .await?;
        into_ticket(row)
    }

    /// Find a ticket by ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Ticket>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM tickets WHERE id = $1");
        sqlx::query_as::<_, TicketRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await?
            .map(into_ticket)
            .transpose()
    }

    /// Every ticket, ordered by ID.
    pub async fn list_all(pool: &PgPool) -> Result<Vec<Ticket>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM tickets ORDER BY id");
        sqlx::query_as::<_, TicketRow>(&query)
            .fetch_all(pool)
            .await?
            .into_iter()
            .map(into_ticket)
            .collect()
    }

    /// List tickets with optional status and priority filters, newest first.
    pub async fn list_filtered(
        pool: &PgPool,
        status: Option<TicketStatus>,
        priority: Option<TicketPriority>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Ticket>, sqlx::Error> {
        let mut conditions: Vec<String> = Vec::new();
        let mut param_idx: usize = 1;

        if status.is_some() {
            conditions.push(format!("status = ${param_idx}"));
            param_idx += 1;
        }
        if priority.is_some() {
            conditions.push(format!("priority = ${param_idx}"));
            param_idx += 1;
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let query = format!(
            "SELECT {COLUMNS} FROM tickets {where_clause} \
             ORDER BY created_at DESC, id DESC \
             LIMIT ${param_idx} OFFSET ${}",
            param_idx + 1
        );

        let mut q = sqlx::query_as::<_, TicketRow>(&query);
        if let Some(s) = status {
            q = q.bind(s.as_str());
        }
        if let Some(p) = priority {
            q = q.bind(p.as_str());
        }
        q = q.bind(limit).bind(offset);

        q.fetch_all(pool)
            .await?
            .into_iter()
            .map(into_ticket)
            .collect()
    }

    /// Apply `changes` to ticket `id` only if its stored `version` still
    /// equals `expected_version`. The version is bumped on success.
    ///
    /// Returns `None` if the ticket does not exist or was modified
    /// concurrently; callers tell the two apart by re-reading.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        expected_version: i64,
        changes: &TicketChanges,
    ) -> Result<Option<Ticket>, sqlx::Error> {
        let fields = changes.fields();

        // $1 = id, $2 = expected version; field values follow.
        let mut assignments: Vec<String> = fields
            .iter()
            .enumerate()
            .map(|(i, field)| format!("{} = ${}", field.column(), i + 3))
            .collect();
        assignments.push("version = version + 1".to_string());

        let query = format!(
            "UPDATE tickets SET {} WHERE id = $1 AND version = $2 RETURNING {COLUMNS}",
            assignments.join(", ")
        );

        let mut q = sqlx::query_as::<_, TicketRow>(&query)
            .bind(id)
            .bind(expected_version);
        for field in fields {
            q = match field {
                TicketField::Title => q.bind(changes.title.clone()),
                TicketField::Description => q.bind(changes.description.clone()),
                TicketField::Status => q.bind(changes.status.map(TicketStatus::as_str)),
                TicketField::Priority => q.bind(changes.priority.map(TicketPriority::as_str)),
                TicketField::AssignedTo => q.bind(changes.assigned_to.clone().flatten()),
                TicketField::UpdatedAt => q.bind(changes.updated_at),
            };
        }

        q.fetch_optional(pool).await?.map(into_ticket).transpose()
    }

    /// Read every ticket for a consistency scan, ordered by ID.
    pub async fn scan(pool: &PgPool) -> Result<Vec<TicketSnapshot>, sqlx::Error> {
        let query = format!("SELECT {SCAN_COLUMNS} FROM tickets ORDER BY id");
        let rows = sqlx::query_as::<_, TicketScanRow>(&query)
            .fetch_all(pool)
            .await?;
        Ok(rows.into_iter().map(TicketSnapshot::from).collect())
    }

    /// Re-stamp closed tickets last updated before `cutoff` with `now`.
    ///
    /// Returns the affected ticket IDs in ascending order.
    pub async fn refresh_stale_closed(
        pool: &PgPool,
        cutoff: Timestamp,
        now: Timestamp,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        let mut ids: Vec<DbId> = sqlx::query_scalar(
            "UPDATE tickets SET updated_at = GREATEST(updated_at, $1), version = version + 1 \
             WHERE status = $2 AND updated_at < $3 \
             RETURNING id",
        )
        .bind(now)
        .bind(TicketStatus::Closed.as_str())
        .bind(cutoff)
        .fetch_all(pool)
        .await?;
        ids.sort_unstable();
        Ok(ids)
    }

    /// Hand low-priority tickets that are in progress but still owned by the
    /// bot to the Junior Analyst.
    ///
    /// Returns the affected ticket IDs in ascending order.
    pub async fn reassign_bot_escalations(
        pool: &PgPool,
        now: Timestamp,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        let mut ids: Vec<DbId> = sqlx::query_scalar(
            "UPDATE tickets SET assigned_to = $1, updated_at = GREATEST(updated_at, $2), \
                version = version + 1 \
             WHERE priority = $3 AND status = $4 AND assigned_to = $5 \
             RETURNING id",
        )
        .bind(JUNIOR_ANALYST)
        .bind(now)
        .bind(TicketPriority::Low.as_str())
        .bind(TicketStatus::InProgress.as_str())
        .bind(SUPPORT_BOT)
        .fetch_all(pool)
        .await?;
        ids.sort_unstable();
        Ok(ids)
    }

    /// Run one operator remediation. `window` is the closed-ticket
    /// freshness window used by [`Remediation::RefreshStaleClosed`].
    pub async fn remediate(
        pool: &PgPool,
        action: Remediation,
        window: Duration,
        now: Timestamp,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        match action {
            Remediation::RefreshStaleClosed => match now.checked_sub_signed(window) {
                Some(cutoff) => Self::refresh_stale_closed(pool, cutoff, now).await,
                // No representable instant lies outside the window.
                None => Ok(Vec::new()),
            },
            Remediation::ReassignBotEscalations => Self::reassign_bot_escalations(pool, now).await,
        }
    }
}

fn into_ticket(row: TicketRow) -> Result<Ticket, sqlx::Error> {
    Ticket::try_from(row).map_err(|e| sqlx::Error::Decode(Box::new(e)))
}
