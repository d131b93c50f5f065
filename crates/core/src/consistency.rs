//! Read-only consistency checks over the full ticket set.
//!
//! [`check`] reports violations as data; it never repairs anything.
//! Remediation is a separate operator action in the storage layer.

use std::fmt;
use std::str::FromStr;

use chrono::Duration;
use serde::Serialize;

use crate::error::CoreError;
use crate::ticket::{Ticket, TicketPriority, TicketStatus, SENIOR_ANALYST, SUPPORT_BOT};
use crate::types::{DbId, Timestamp};

/// Closed tickets must have been touched within this many days.
pub const FRESHNESS_WINDOW_DAYS: i64 = 30;

/// Upper bound on a configured freshness window (100 years).
pub const MAX_FRESHNESS_WINDOW_DAYS: i64 = 36_500;

/// A ticket as scanned from storage, with every required field optional so
/// that incomplete rows can still be reported.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TicketSnapshot {
    pub id: DbId,
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TicketStatus>,
    pub priority: Option<TicketPriority>,
    pub created_at: Option<Timestamp>,
    pub updated_at: Option<Timestamp>,
    pub assigned_to: Option<String>,
    /// Fields whose stored value was present but could not be parsed.
    pub unrecognised: Vec<&'static str>,
}

impl From<&Ticket> for TicketSnapshot {
    fn from(ticket: &Ticket) -> Self {
        Self {
            id: ticket.id,
            title: Some(ticket.title.clone()),
            description: Some(ticket.description.clone()),
            status: Some(ticket.status),
            priority: Some(ticket.priority),
            created_at: Some(ticket.created_at),
            updated_at: Some(ticket.updated_at),
            assigned_to: ticket.assigned_to.clone(),
            unrecognised: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Invariant {
    /// Title, description, status, priority and both timestamps are set.
    RequiredFields,
    /// `updated_at >= created_at`.
    TimestampOrder,
    /// Closed tickets were updated inside the freshness window.
    ClosedFreshness,
    /// High-priority tickets have left `open` and have an owner.
    HighPriorityAssignment,
    /// Low-priority tickets in progress are not still owned by the bot.
    LowPriorityEscalation,
}

impl Invariant {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RequiredFields => "required_fields",
            Self::TimestampOrder => "timestamp_order",
            Self::ClosedFreshness => "closed_freshness",
            Self::HighPriorityAssignment => "high_priority_assignment",
            Self::LowPriorityEscalation => "low_priority_escalation",
        }
    }
}

impl fmt::Display for Invariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Violation {
    pub ticket_id: DbId,
    pub invariant: Invariant,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub checked_at: Timestamp,
    pub tickets_scanned: usize,
    pub violations: Vec<Violation>,
}

impl Report {
    /// `true` when no violations were found.
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn count_for(&self, invariant: Invariant) -> usize {
        self.violations
            .iter()
            .filter(|v| v.invariant == invariant)
            .count()
    }

    /// Ids of tickets violating `invariant`, in scan order.
    pub fn ticket_ids(&self, invariant: Invariant) -> Vec<DbId> {
        self.violations
            .iter()
            .filter(|v| v.invariant == invariant)
            .map(|v| v.ticket_id)
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckOptions {
    pub freshness_window: Duration,
    /// Also report drift from the assignment rules (invariants 4 and 5).
    pub include_drift: bool,
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self {
            freshness_window: Duration::days(FRESHNESS_WINDOW_DAYS),
            include_drift: false,
        }
    }
}

/// Validate a freshness window given in days.
pub fn freshness_window(days: i64) -> Result<Duration, CoreError> {
    if !(1..=MAX_FRESHNESS_WINDOW_DAYS).contains(&days) {
        return Err(CoreError::Validation(format!(
            "Freshness window must be between 1 and {MAX_FRESHNESS_WINDOW_DAYS} days, got {days}"
        )));
    }
    Ok(Duration::days(days))
}

/// An operator repair for a class of violations. Never run implicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Remediation {
    /// Re-stamp closed tickets that fell outside the freshness window.
    RefreshStaleClosed,
    /// Hand in-progress low-priority tickets from the bot to the Junior Analyst.
    ReassignBotEscalations,
}

impl Remediation {
    pub const ALL: [Remediation; 2] = [Self::RefreshStaleClosed, Self::ReassignBotEscalations];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::RefreshStaleClosed => "refresh_stale_closed",
            Self::ReassignBotEscalations => "reassign_bot_escalations",
        }
    }

    /// The invariant this remediation clears.
    pub fn repairs(self) -> Invariant {
        match self {
            Self::RefreshStaleClosed => Invariant::ClosedFreshness,
            Self::ReassignBotEscalations => Invariant::LowPriorityEscalation,
        }
    }
}

impl fmt::Display for Remediation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Remediation {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| {
                let known: Vec<&str> = Self::ALL.iter().map(|r| r.as_str()).collect();
                CoreError::Validation(format!(
                    "Unknown remediation '{s}'. Must be one of: {}",
                    known.join(", ")
                ))
            })
    }
}

/// Scan `tickets` and report every violated invariant.
pub fn check(tickets: &[TicketSnapshot], now: Timestamp, options: &CheckOptions) -> Report {
    let mut violations = Vec::new();

    for ticket in tickets {
        check_required_fields(ticket, &mut violations);
        check_timestamp_order(ticket, &mut violations);
        check_closed_freshness(ticket, now, options.freshness_window, &mut violations);
        if options.include_drift {
            check_high_priority_assignment(ticket, &mut violations);
            check_low_priority_escalation(ticket, &mut violations);
        }
    }

    Report {
        checked_at: now,
        tickets_scanned: tickets.len(),
        violations,
    }
}

fn check_required_fields(ticket: &TicketSnapshot, out: &mut Vec<Violation>) {
    let missing: Vec<&str> = [
        ("title", ticket.title.is_none()),
        ("description", ticket.description.is_none()),
        ("status", ticket.status.is_none()),
        ("priority", ticket.priority.is_none()),
        ("created_at", ticket.created_at.is_none()),
        ("updated_at", ticket.updated_at.is_none()),
    ]
    .into_iter()
    .filter_map(|(name, absent)| absent.then_some(name))
    .filter(|name| !ticket.unrecognised.contains(name))
    .collect();

    let mut problems = Vec::new();
    if !missing.is_empty() {
        problems.push(format!("Missing required fields: {}", missing.join(", ")));
    }
    if !ticket.unrecognised.is_empty() {
        let fields = ticket.unrecognised.join(", ");
        problems.push(format!("Unrecognised values for: {fields}"));
    }

    if !problems.is_empty() {
        out.push(Violation {
            ticket_id: ticket.id,
            invariant: Invariant::RequiredFields,
            message: problems.join("; "),
        });
    }
}

fn check_timestamp_order(ticket: &TicketSnapshot, out: &mut Vec<Violation>) {
    if let (Some(created), Some(updated)) = (ticket.created_at, ticket.updated_at) {
        if updated < created {
            out.push(Violation {
                ticket_id: ticket.id,
                invariant: Invariant::TimestampOrder,
                message: format!("updated_at {updated} is earlier than created_at {created}"),
            });
        }
    }
}

fn check_closed_freshness(
    ticket: &TicketSnapshot,
    now: Timestamp,
    window: Duration,
    out: &mut Vec<Violation>,
) {
    if ticket.status != Some(TicketStatus::Closed) {
        return;
    }
    if let Some(updated) = ticket.updated_at {
        let age = now - updated;
        if age > window {
            out.push(Violation {
                ticket_id: ticket.id,
                invariant: Invariant::ClosedFreshness,
                message: format!(
                    "Closed ticket last updated {} days ago (window is {} days)",
                    age.num_days(),
                    window.num_days()
                ),
            });
        }
    }
}

fn check_high_priority_assignment(ticket: &TicketSnapshot, out: &mut Vec<Violation>) {
    if ticket.priority != Some(TicketPriority::High) {
        return;
    }
    let message = if ticket.status == Some(TicketStatus::Open) {
        format!(
            "High-priority ticket is still open; expected in_progress with {SENIOR_ANALYST}"
        )
    } else if ticket.assigned_to.is_none() {
        "High-priority ticket has no assignee".to_string()
    } else {
        return;
    };
    out.push(Violation {
        ticket_id: ticket.id,
        invariant: Invariant::HighPriorityAssignment,
        message,
    });
}

fn check_low_priority_escalation(ticket: &TicketSnapshot, out: &mut Vec<Violation>) {
    if ticket.priority == Some(TicketPriority::Low)
        && ticket.status == Some(TicketStatus::InProgress)
        && ticket.assigned_to.as_deref() == Some(SUPPORT_BOT)
    {
        out.push(Violation {
            ticket_id: ticket.id,
            invariant: Invariant::LowPriorityEscalation,
            message: format!(
                "Low-priority ticket in progress is still assigned to {SUPPORT_BOT}"
            ),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::{TimeZone, Utc};

    fn now() -> Timestamp {
        Utc.with_ymd_and_hms(2026, 6, 30, 8, 0, 0).unwrap()
    }

    fn snapshot(id: DbId, status: TicketStatus, priority: TicketPriority) -> TicketSnapshot {
        let created = now() - Duration::days(60);
        TicketSnapshot {
            id,
            title: Some("Disk full".into()),
            description: Some("Build agent out of space".into()),
            status: Some(status),
            priority: Some(priority),
            created_at: Some(created),
            updated_at: Some(now() - Duration::days(1)),
            assigned_to: Some("Dana".into()),
            unrecognised: Vec::new(),
        }
    }

    #[test]
    fn consistent_set_produces_clean_report() {
        let tickets = vec![
            snapshot(1, TicketStatus::Open, TicketPriority::Medium),
            snapshot(2, TicketStatus::Closed, TicketPriority::Low),
            snapshot(3, TicketStatus::InProgress, TicketPriority::High),
        ];
        let report = check(&tickets, now(), &CheckOptions::default());
        assert!(report.is_clean());
        assert_eq!(report.tickets_scanned, 3);
        assert_eq!(report.checked_at, now());
    }

    #[test]
    fn empty_set_is_clean() {
        let report = check(&[], now(), &CheckOptions::default());
        assert!(report.is_clean());
        assert_eq!(report.tickets_scanned, 0);
    }

    #[test]
    fn closed_ticket_older_than_window_is_flagged() {
        let mut stale = snapshot(5, TicketStatus::Closed, TicketPriority::Medium);
        stale.updated_at = Some(now() - Duration::days(31));
        let mut fresh = snapshot(6, TicketStatus::Closed, TicketPriority::Medium);
        fresh.updated_at = Some(now() - Duration::days(29));

        let report = check(&[stale, fresh], now(), &CheckOptions::default());
        assert_eq!(report.ticket_ids(Invariant::ClosedFreshness), vec![5]);
        assert!(report.violations[0].message.contains("31 days"));
    }

    #[test]
    fn freshness_boundary_is_exclusive() {
        let mut edge = snapshot(7, TicketStatus::Closed, TicketPriority::Medium);
        edge.updated_at = Some(now() - Duration::days(30));
        let report = check(&[edge], now(), &CheckOptions::default());
        assert!(report.is_clean());
    }

    #[test]
    fn stale_open_ticket_is_not_a_freshness_violation() {
        let mut old = snapshot(8, TicketStatus::Open, TicketPriority::Medium);
        old.updated_at = Some(now() - Duration::days(90));
        old.created_at = Some(now() - Duration::days(91));
        let report = check(&[old], now(), &CheckOptions::default());
        assert!(report.is_clean());
    }

    #[test]
    fn custom_window_is_honoured() {
        let mut closed = snapshot(9, TicketStatus::Closed, TicketPriority::Medium);
        closed.updated_at = Some(now() - Duration::days(8));
        let options = CheckOptions {
            freshness_window: Duration::days(7),
            ..CheckOptions::default()
        };
        let report = check(&[closed], now(), &options);
        assert_eq!(report.count_for(Invariant::ClosedFreshness), 1);
    }

    #[test]
    fn any_null_required_field_is_flagged_regardless_of_status() {
        let mut no_title = snapshot(10, TicketStatus::Open, TicketPriority::High);
        no_title.title = None;
        let mut no_priority = snapshot(11, TicketStatus::Closed, TicketPriority::Low);
        no_priority.priority = None;
        let bare = TicketSnapshot {
            id: 12,
            ..Default::default()
        };

        let report = check(
            &[no_title, no_priority, bare],
            now(),
            &CheckOptions::default(),
        );
        assert_eq!(
            report.ticket_ids(Invariant::RequiredFields),
            vec![10, 11, 12]
        );
        let bare_violation = &report.violations[2];
        assert_matches!(bare_violation.invariant, Invariant::RequiredFields);
        assert_eq!(
            bare_violation.message,
            "Missing required fields: title, description, status, priority, created_at, updated_at"
        );
    }

    #[test]
    fn updated_before_created_is_flagged() {
        let mut backwards = snapshot(13, TicketStatus::Open, TicketPriority::Medium);
        backwards.created_at = Some(now());
        backwards.updated_at = Some(now() - Duration::seconds(1));

        let report = check(&[backwards], now(), &CheckOptions::default());
        assert_eq!(report.ticket_ids(Invariant::TimestampOrder), vec![13]);
    }

    #[test]
    fn drift_checks_are_opt_in() {
        let mut high_open = snapshot(20, TicketStatus::Open, TicketPriority::High);
        high_open.assigned_to = None;
        let mut bot_started = snapshot(21, TicketStatus::InProgress, TicketPriority::Low);
        bot_started.assigned_to = Some(SUPPORT_BOT.into());
        let tickets = vec![high_open, bot_started];

        assert!(check(&tickets, now(), &CheckOptions::default()).is_clean());

        let options = CheckOptions {
            include_drift: true,
            ..CheckOptions::default()
        };
        let report = check(&tickets, now(), &options);
        assert_eq!(
            report.ticket_ids(Invariant::HighPriorityAssignment),
            vec![20]
        );
        assert_eq!(
            report.ticket_ids(Invariant::LowPriorityEscalation),
            vec![21]
        );
    }

    #[test]
    fn unassigned_high_ticket_in_progress_is_drift() {
        let mut orphan = snapshot(22, TicketStatus::InProgress, TicketPriority::High);
        orphan.assigned_to = None;
        let options = CheckOptions {
            include_drift: true,
            ..CheckOptions::default()
        };
        let report = check(&[orphan], now(), &options);
        assert_eq!(report.violations.len(), 1);
        assert_eq!(
            report.violations[0].message,
            "High-priority ticket has no assignee"
        );
    }

    #[test]
    fn snapshot_from_ticket_is_complete() {
        let ticket = Ticket {
            id: 30,
            title: "t".into(),
            description: "d".into(),
            status: TicketStatus::Closed,
            priority: TicketPriority::Medium,
            created_at: now() - Duration::days(2),
            updated_at: now() - Duration::days(1),
            assigned_to: None,
            version: 3,
        };
        let snapshots = [TicketSnapshot::from(&ticket)];
        let report = check(&snapshots, now(), &CheckOptions::default());
        assert!(report.is_clean());
    }

    #[test]
    fn remediation_parses_known_actions_only() {
        assert_eq!(
            "refresh_stale_closed".parse::<Remediation>().unwrap(),
            Remediation::RefreshStaleClosed
        );
        assert_eq!(
            Remediation::ReassignBotEscalations.repairs(),
            Invariant::LowPriorityEscalation
        );
        assert_matches!(
            "delete_everything".parse::<Remediation>(),
            Err(CoreError::Validation(msg)) if msg.contains("delete_everything")
        );
    }

    #[test]
    fn freshness_window_rejects_out_of_range_days() {
        assert_eq!(freshness_window(14).unwrap(), Duration::days(14));
        assert_eq!(
            freshness_window(MAX_FRESHNESS_WINDOW_DAYS).unwrap(),
            Duration::days(MAX_FRESHNESS_WINDOW_DAYS)
        );
        for days in [0, -3, MAX_FRESHNESS_WINDOW_DAYS + 1, 100_000_000, 200_000_000_000] {
            assert_matches!(freshness_window(days), Err(CoreError::Validation(_)));
        }
    }

    #[test]
    fn unrecognised_values_are_not_reported_as_missing() {
        let mut odd = snapshot(40, TicketStatus::Open, TicketPriority::Medium);
        odd.status = None;
        odd.unrecognised = vec!["status"];
        let mut partial = odd.clone();
        partial.id = 41;
        partial.description = None;

        let report = check(&[odd, partial], now(), &CheckOptions::default());
        assert_eq!(
            report.violations[0].message,
            "Unrecognised values for: status"
        );
        assert_eq!(
            report.violations[1].message,
            "Missing required fields: description; Unrecognised values for: status"
        );
    }
}
