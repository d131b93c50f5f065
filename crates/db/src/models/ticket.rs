//! Ticket row models and DTOs.

use std::str::FromStr;

use serde::Deserialize;
use sqlx::FromRow;
use ticketdesk_core::consistency::TicketSnapshot;
use ticketdesk_core::error::CoreError;
use ticketdesk_core::ticket::{
    deserialize_present, Ticket, TicketChanges, TicketPriority, TicketStatus,
};
use ticketdesk_core::types::{DbId, Timestamp};
use validator::{Validate, ValidationErrors};

/// Maximum ticket title length (characters).
pub const MAX_TITLE_LENGTH: u64 = 200;

// ---------------------------------------------------------------------------
// Rows
// ---------------------------------------------------------------------------

/// A row from the `tickets` table.
#[derive(Debug, Clone, FromRow)]
pub struct TicketRow {
    pub id: DbId,
    pub title: String,
    pub description: String,
    pub status: String,
    pub priority: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub assigned_to: Option<String>,
    pub version: i64,
}

impl TryFrom<TicketRow> for Ticket {
    type Error = CoreError;

    fn try_from(row: TicketRow) -> Result<Self, Self::Error> {
        Ok(Ticket {
            id: row.id,
            title: row.title,
            description: row.description,
            status: row.status.parse()?,
            priority: row.priority.parse()?,
            created_at: row.created_at,
            updated_at: row.updated_at,
            assigned_to: row.assigned_to,
            version: row.version,
        })
    }
}

/// A `tickets` row read for consistency scanning. Every column is optional
/// and unrecognised enum text is kept as `None` rather than failing the scan.
#[derive(Debug, Clone, FromRow)]
pub struct TicketScanRow {
    pub id: DbId,
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub created_at: Option<Timestamp>,
    pub updated_at: Option<Timestamp>,
    pub assigned_to: Option<String>,
}

impl From<TicketScanRow> for TicketSnapshot {
    fn from(row: TicketScanRow) -> Self {
        let mut unrecognised = Vec::new();
        let status = parse_stored(row.status, "status", &mut unrecognised);
        let priority = parse_stored(row.priority, "priority", &mut unrecognised);
        TicketSnapshot {
            id: row.id,
            title: row.title,
            description: row.description,
            status,
            priority,
            created_at: row.created_at,
            updated_at: row.updated_at,
            assigned_to: row.assigned_to,
            unrecognised,
        }
    }
}

/// Parse a stored enum column, recording `field` when the text is present
/// but not a known value.
fn parse_stored<T: FromStr>(
    raw: Option<String>,
    field: &'static str,
    unrecognised: &mut Vec<&'static str>,
) -> Option<T> {
    match raw?.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            unrecognised.push(field);
            None
        }
    }
}

// ---------------------------------------------------------------------------
// DTOs
// ---------------------------------------------------------------------------

/// DTO for `POST /tickets`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateTicket {
    #[validate(
        required(message = "Missing required field: title"),
        length(min = 1, max = MAX_TITLE_LENGTH, message = "title must be 1-200 characters")
    )]
    pub title: Option<String>,
    #[validate(
        required(message = "Missing required field: description"),
        length(min = 1, message = "description must not be empty")
    )]
    pub description: Option<String>,
    #[validate(required(message = "Missing required field: priority"))]
    pub priority: Option<String>,
}

impl CreateTicket {
    /// Validate the payload and convert it into a change set for the rule engine.
    pub fn into_changes(self) -> Result<TicketChanges, CoreError> {
        self.validate().map_err(validation_error)?;
        Ok(TicketChanges {
            title: self.title,
            description: self.description,
            priority: self
                .priority
                .as_deref()
                .map(str::parse::<TicketPriority>)
                .transpose()?,
            ..Default::default()
        })
    }
}

/// DTO for `POST /webhook/ticket`. Priority defaults to `medium`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct WebhookTicket {
    #[validate(
        required(message = "Missing required field: title"),
        length(min = 1, max = MAX_TITLE_LENGTH, message = "title must be 1-200 characters")
    )]
    pub title: Option<String>,
    #[validate(
        required(message = "Missing required field: description"),
        length(min = 1, message = "description must not be empty")
    )]
    pub description: Option<String>,
    pub priority: Option<String>,
}

impl WebhookTicket {
    pub fn into_changes(self) -> Result<TicketChanges, CoreError> {
        self.validate().map_err(validation_error)?;
        let priority = match self.priority.as_deref() {
            Some(p) => p.parse()?,
            None => TicketPriority::Medium,
        };
        Ok(TicketChanges {
            title: self.title,
            description: self.description,
            priority: Some(priority),
            ..Default::default()
        })
    }
}

/// DTO for `PUT /tickets/{id}`. All fields are optional; keys outside this
/// set are ignored.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateTicket {
    #[validate(length(
        min = 1,
        max = MAX_TITLE_LENGTH,
        message = "title must be 1-200 characters"
    ))]
    pub title: Option<String>,
    #[validate(length(min = 1, message = "description must not be empty"))]
    pub description: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    /// Absent leaves the assignee alone; `null` clears it.
    #[serde(default, deserialize_with = "deserialize_present")]
    pub assigned_to: Option<Option<String>>,
}

impl UpdateTicket {
    pub fn into_changes(self) -> Result<TicketChanges, CoreError> {
        self.validate().map_err(validation_error)?;
        Ok(TicketChanges {
            title: self.title,
            description: self.description,
            status: self
                .status
                .as_deref()
                .map(str::parse::<TicketStatus>)
                .transpose()?,
            priority: self
                .priority
                .as_deref()
                .map(str::parse::<TicketPriority>)
                .transpose()?,
            assigned_to: self.assigned_to,
            updated_at: None,
        })
    }
}

/// Query parameters for `GET /tickets`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TicketListParams {
    pub status: Option<String>,
    pub priority: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Flatten `validator` errors into a single deterministic message.
pub fn validation_error(errors: ValidationErrors) -> CoreError {
    let mut messages: Vec<String> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| match &e.message {
                Some(message) => message.to_string(),
                None => format!("{field}: {}", e.code),
            })
        })
        .collect();
    messages.sort();
    CoreError::Validation(messages.join("; "))
}
