//! Ticket entity, lifecycle enums and the typed partial-update structure.
//!
//! [`TicketChanges`] is the only way a mutation travels from the HTTP layer
//! through the rule engine into storage. Storage turns it into SQL through
//! the fixed [`TicketField`] allow-list, so a payload can never name a
//! column that is not listed here.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Assignee constants
// ---------------------------------------------------------------------------

/// Owner of every high-priority ticket at creation or escalation.
pub const SENIOR_ANALYST: &str = "Senior Analyst";
/// Human analyst that takes over a low-priority ticket once work starts.
pub const JUNIOR_ANALYST: &str = "Junior Analyst";
/// Automated responder that owns new low-priority tickets.
pub const SUPPORT_BOT: &str = "SupportBot";
/// Display label for tickets with no assignee.
pub const UNASSIGNED: &str = "Unassigned";

// ---------------------------------------------------------------------------
// Status / priority
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Open,
    InProgress,
    Closed,
}

impl TicketStatus {
    pub const ALL: [TicketStatus; 3] = [Self::Open, Self::InProgress, Self::Closed];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::InProgress => "in_progress",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TicketStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| {
                CoreError::Validation(format!(
                    "Invalid ticket status '{s}'. Must be one of: open, in_progress, closed"
                ))
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketPriority {
    Low,
    Medium,
    High,
}

impl TicketPriority {
    pub const ALL: [TicketPriority; 3] = [Self::Low, Self::Medium, Self::High];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for TicketPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TicketPriority {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|priority| priority.as_str() == s)
            .ok_or_else(|| {
                CoreError::Validation(format!(
                    "Invalid ticket priority '{s}'. Must be one of: low, medium, high"
                ))
            })
    }
}

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

/// A persisted ticket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ticket {
    pub id: DbId,
    pub title: String,
    pub description: String,
    pub status: TicketStatus,
    pub priority: TicketPriority,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub assigned_to: Option<String>,
    /// Incremented by every stored update; used for conditional writes.
    pub version: i64,
}

/// A fully-resolved ticket ready to be inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTicket {
    pub title: String,
    pub description: String,
    pub status: TicketStatus,
    pub priority: TicketPriority,
    pub assigned_to: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl NewTicket {
    /// Build an insertable ticket from the output of
    /// [`crate::rules::resolve`] for a creation.
    ///
    /// `created_at` is taken from the resolved `updated_at` so both
    /// timestamps start equal.
    pub fn from_resolved(changes: TicketChanges, now: Timestamp) -> Result<Self, CoreError> {
        let title = changes
            .title
            .ok_or_else(|| missing_field(TicketField::Title))?;
        let description = changes
            .description
            .ok_or_else(|| missing_field(TicketField::Description))?;
        let priority = changes
            .priority
            .ok_or_else(|| missing_field(TicketField::Priority))?;
        let stamped = changes.updated_at.unwrap_or(now);

        Ok(Self {
            title,
            description,
            status: changes.status.unwrap_or(TicketStatus::Open),
            priority,
            assigned_to: changes.assigned_to.flatten(),
            created_at: stamped,
            updated_at: stamped,
        })
    }
}

fn missing_field(field: TicketField) -> CoreError {
    CoreError::Validation(format!("Missing required field: {}", field.column()))
}

// ---------------------------------------------------------------------------
// Partial updates
// ---------------------------------------------------------------------------

/// The fixed set of columns a mutation may touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketField {
    Title,
    Description,
    Status,
    Priority,
    AssignedTo,
    UpdatedAt,
}

impl TicketField {
    pub const ALL: [TicketField; 6] = [
        Self::Title,
        Self::Description,
        Self::Status,
        Self::Priority,
        Self::AssignedTo,
        Self::UpdatedAt,
    ];

    /// Column name in the `tickets` table.
    pub fn column(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Description => "description",
            Self::Status => "status",
            Self::Priority => "priority",
            Self::AssignedTo => "assigned_to",
            Self::UpdatedAt => "updated_at",
        }
    }
}

/// A partial ticket: only the fields a caller wants to change.
///
/// `assigned_to` is tri-state: `None` leaves the assignee untouched,
/// `Some(None)` clears it, `Some(Some(name))` sets it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TicketChanges {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TicketStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<TicketPriority>,
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub assigned_to: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<Timestamp>,
}

impl TicketChanges {
    /// Fields carried by this change set, in allow-list order.
    pub fn fields(&self) -> Vec<TicketField> {
        TicketField::ALL
            .into_iter()
            .filter(|field| self.has(*field))
            .collect()
    }

    pub fn has(&self, field: TicketField) -> bool {
        match field {
            TicketField::Title => self.title.is_some(),
            TicketField::Description => self.description.is_some(),
            TicketField::Status => self.status.is_some(),
            TicketField::Priority => self.priority.is_some(),
            TicketField::AssignedTo => self.assigned_to.is_some(),
            TicketField::UpdatedAt => self.updated_at.is_some(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields().is_empty()
    }

    /// Merge these changes over `ticket`, as storage would.
    pub fn apply_to(&self, ticket: &Ticket) -> Ticket {
        Ticket {
            id: ticket.id,
            title: self.title.clone().unwrap_or_else(|| ticket.title.clone()),
            description: self
                .description
                .clone()
                .unwrap_or_else(|| ticket.description.clone()),
            status: self.status.unwrap_or(ticket.status),
            priority: self.priority.unwrap_or(ticket.priority),
            created_at: ticket.created_at,
            updated_at: self.updated_at.unwrap_or(ticket.updated_at),
            assigned_to: match &self.assigned_to {
                Some(assignee) => assignee.clone(),
                None => ticket.assigned_to.clone(),
            },
            version: ticket.version + 1,
        }
    }
}

/// Deserialize a field that is present in the payload (even as `null`)
/// into `Some(..)`. Combined with `#[serde(default)]` this distinguishes an
/// absent key from an explicit `null`.
pub fn deserialize_present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}
