//! Ticket lifecycle automation.
//!
//! Given the stored ticket (or `None` for an insert) and the change a caller
//! asked for, [`resolve`] computes the change that must actually be
//! persisted. The engine never rejects input and has no side effects;
//! persistence and validation belong to the caller.
//!
//! Rules:
//! - **Creation defaults**: status `open`; `high` goes straight to
//!   `in_progress` with the Senior Analyst; `low` goes to SupportBot; every
//!   other priority starts unassigned. Caller-supplied status/assignee are
//!   replaced on insert.
//! - **Low priority started**: a `low` ticket moving into `in_progress`
//!   without an explicit assignee is handed to the Junior Analyst.
//! - **Escalation to high**: a priority change *into* `high` forces the
//!   Senior Analyst, and moves the ticket to `in_progress` if it would
//!   otherwise be `open`.

use std::fmt;

use serde::Serialize;

use crate::ticket::{
    Ticket, TicketChanges, TicketPriority, TicketStatus, JUNIOR_ANALYST, SENIOR_ANALYST,
    SUPPORT_BOT,
};
use crate::types::Timestamp;

/// An automation rule that altered the caller's change set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    HighPriorityIntake,
    LowPriorityIntake,
    LowPriorityStarted,
    EscalatedToHigh,
}

impl Rule {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::HighPriorityIntake => "high_priority_intake",
            Self::LowPriorityIntake => "low_priority_intake",
            Self::LowPriorityStarted => "low_priority_started",
            Self::EscalatedToHigh => "escalated_to_high",
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The resolved change set together with the rules that fired.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub changes: TicketChanges,
    pub fired: Vec<Rule>,
}

/// Compute the change to persist for `proposed` against `current`.
///
/// `current` is `None` for an insert.
pub fn resolve(
    current: Option<&Ticket>,
    proposed: &TicketChanges,
    now: Timestamp,
) -> TicketChanges {
    resolve_with_rules(current, proposed, now).changes
}

/// Like [`resolve`], also reporting which rules fired.
pub fn resolve_with_rules(
    current: Option<&Ticket>,
    proposed: &TicketChanges,
    now: Timestamp,
) -> Resolution {
    let mut changes = proposed.clone();
    let mut fired = Vec::new();

    match current {
        None => {
            changes.updated_at = Some(now);
            apply_creation_defaults(&mut changes, &mut fired);
        }
        Some(current) => {
            // updated_at never moves backwards, even if the clock does.
            changes.updated_at = Some(now.max(current.updated_at));
            apply_low_priority_started(current, &mut changes, &mut fired);
            apply_escalation(current, &mut changes, &mut fired);
        }
    }

    Resolution { changes, fired }
}

fn apply_creation_defaults(changes: &mut TicketChanges, fired: &mut Vec<Rule>) {
    changes.status = Some(TicketStatus::Open);
    changes.assigned_to = Some(None);

    match changes.priority {
        Some(TicketPriority::High) => {
            changes.status = Some(TicketStatus::InProgress);
            changes.assigned_to = Some(Some(SENIOR_ANALYST.to_string()));
            fired.push(Rule::HighPriorityIntake);
        }
        Some(TicketPriority::Low) => {
            changes.assigned_to = Some(Some(SUPPORT_BOT.to_string()));
            fired.push(Rule::LowPriorityIntake);
        }
        Some(TicketPriority::Medium) | None => {}
    }
}

fn apply_low_priority_started(
    current: &Ticket,
    changes: &mut TicketChanges,
    fired: &mut Vec<Rule>,
) {
    let starting = current.priority == TicketPriority::Low
        && current.status != TicketStatus::InProgress
        && changes.status == Some(TicketStatus::InProgress);

    // Absent and explicit null both count as "no analyst named".
    let has_assignee = matches!(changes.assigned_to, Some(Some(_)));

    if starting && !has_assignee {
        changes.assigned_to = Some(Some(JUNIOR_ANALYST.to_string()));
        fired.push(Rule::LowPriorityStarted);
    }
}

fn apply_escalation(current: &Ticket, changes: &mut TicketChanges, fired: &mut Vec<Rule>) {
    let escalating =
        changes.priority == Some(TicketPriority::High) && current.priority != TicketPriority::High;
    if !escalating {
        return;
    }

    changes.assigned_to = Some(Some(SENIOR_ANALYST.to_string()));
    if changes.status.unwrap_or(current.status) == TicketStatus::Open {
        changes.status = Some(TicketStatus::InProgress);
    }
    fired.push(Rule::EscalatedToHigh);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn now() -> Timestamp {
        Utc.with_ymd_and_hms(2026, 5, 20, 12, 0, 0).unwrap()
    }

    fn stored(priority: TicketPriority, status: TicketStatus, assignee: Option<&str>) -> Ticket {
        let created = now() - Duration::days(3);
        Ticket {
            id: 11,
            title: "VPN drops".into(),
            description: "Connection resets every hour".into(),
            status,
            priority,
            created_at: created,
            updated_at: created,
            assigned_to: assignee.map(str::to_string),
            version: 1,
        }
    }

    fn intake(priority: TicketPriority) -> TicketChanges {
        TicketChanges {
            title: Some("Cannot log in".into()),
            description: Some("SSO loops back to the login page".into()),
            priority: Some(priority),
            ..Default::default()
        }
    }

    fn senior() -> Option<Option<String>> {
        Some(Some(SENIOR_ANALYST.to_string()))
    }

    // -- creation defaults ----------------------------------------------------

    #[test]
    fn high_priority_intake_starts_in_progress_with_senior() {
        let resolved = resolve(None, &intake(TicketPriority::High), now());
        assert_eq!(resolved.status, Some(TicketStatus::InProgress));
        assert_eq!(resolved.assigned_to, senior());
        assert_eq!(resolved.updated_at, Some(now()));
    }

    #[test]
    fn low_priority_intake_goes_to_support_bot() {
        let resolved = resolve(None, &intake(TicketPriority::Low), now());
        assert_eq!(resolved.status, Some(TicketStatus::Open));
        assert_eq!(resolved.assigned_to, Some(Some(SUPPORT_BOT.to_string())));
    }

    #[test]
    fn medium_priority_intake_is_open_and_unassigned() {
        let resolved = resolve(None, &intake(TicketPriority::Medium), now());
        assert_eq!(resolved.status, Some(TicketStatus::Open));
        assert_eq!(resolved.assigned_to, Some(None));
    }

    #[test]
    fn intake_overrides_caller_status_and_assignee() {
        let mut proposed = intake(TicketPriority::Medium);
        proposed.status = Some(TicketStatus::Closed);
        proposed.assigned_to = Some(Some("Mallory".into()));

        let resolved = resolve(None, &proposed, now());
        assert_eq!(resolved.status, Some(TicketStatus::Open));
        assert_eq!(resolved.assigned_to, Some(None));
        assert_eq!(resolved.title, proposed.title);
    }

    #[test]
    fn intake_without_priority_stays_open_and_unassigned() {
        let resolution = resolve_with_rules(None, &TicketChanges::default(), now());
        assert_eq!(resolution.changes.status, Some(TicketStatus::Open));
        assert_eq!(resolution.changes.assigned_to, Some(None));
        assert!(resolution.fired.is_empty());
    }

    // -- escalation -------------------------------------------------------------

    #[test]
    fn escalating_open_ticket_moves_it_in_progress() {
        let current = stored(TicketPriority::Medium, TicketStatus::Open, None);
        let proposed = TicketChanges {
            priority: Some(TicketPriority::High),
            ..Default::default()
        };

        let resolution = resolve_with_rules(Some(&current), &proposed, now());
        assert_eq!(resolution.changes.status, Some(TicketStatus::InProgress));
        assert_eq!(resolution.changes.assigned_to, senior());
        assert_eq!(resolution.fired, vec![Rule::EscalatedToHigh]);
    }

    #[test]
    fn escalation_keeps_an_explicit_non_open_status() {
        let current = stored(TicketPriority::Low, TicketStatus::Open, Some(SUPPORT_BOT));
        let proposed = TicketChanges {
            priority: Some(TicketPriority::High),
            status: Some(TicketStatus::Closed),
            ..Default::default()
        };

        let resolved = resolve(Some(&current), &proposed, now());
        assert_eq!(resolved.status, Some(TicketStatus::Closed));
        assert_eq!(resolved.assigned_to, senior());
    }

    #[test]
    fn escalation_overrides_an_explicit_assignee() {
        let current = stored(
            TicketPriority::Medium,
            TicketStatus::InProgress,
            Some("Dana"),
        );
        let proposed = TicketChanges {
            priority: Some(TicketPriority::High),
            assigned_to: Some(Some("Dana".into())),
            ..Default::default()
        };

        let resolved = resolve(Some(&current), &proposed, now());
        assert_eq!(resolved.assigned_to, senior());
        assert_eq!(resolved.status, None);
    }

    #[test]
    fn re_escalating_a_high_ticket_forces_nothing() {
        let current = stored(TicketPriority::High, TicketStatus::Open, Some("Dana"));
        let proposed = TicketChanges {
            priority: Some(TicketPriority::High),
            ..Default::default()
        };

        let resolution = resolve_with_rules(Some(&current), &proposed, now());
        assert_eq!(resolution.changes.assigned_to, None);
        assert_eq!(resolution.changes.status, None);
        assert!(resolution.fired.is_empty());
    }

    // -- low priority started ---------------------------------------------------

    #[test]
    fn starting_low_ticket_without_assignee_goes_to_junior() {
        let current = stored(TicketPriority::Low, TicketStatus::Open, Some(SUPPORT_BOT));
        let proposed = TicketChanges {
            status: Some(TicketStatus::InProgress),
            ..Default::default()
        };

        let resolution = resolve_with_rules(Some(&current), &proposed, now());
        assert_eq!(
            resolution.changes.assigned_to,
            Some(Some(JUNIOR_ANALYST.to_string()))
        );
        assert_eq!(resolution.fired, vec![Rule::LowPriorityStarted]);
    }

    #[test]
    fn starting_low_ticket_with_null_assignee_goes_to_junior() {
        let current = stored(TicketPriority::Low, TicketStatus::Open, Some(SUPPORT_BOT));
        let proposed = TicketChanges {
            status: Some(TicketStatus::InProgress),
            assigned_to: Some(None),
            ..Default::default()
        };

        let resolved = resolve(Some(&current), &proposed, now());
        assert_eq!(resolved.assigned_to, Some(Some(JUNIOR_ANALYST.to_string())));
    }

    #[test]
    fn explicit_assignee_is_respected_when_starting_low_ticket() {
        let current = stored(TicketPriority::Low, TicketStatus::Open, Some(SUPPORT_BOT));
        let proposed = TicketChanges {
            status: Some(TicketStatus::InProgress),
            assigned_to: senior(),
            ..Default::default()
        };

        let resolution = resolve_with_rules(Some(&current), &proposed, now());
        assert_eq!(resolution.changes.assigned_to, senior());
        assert!(resolution.fired.is_empty());
    }

    #[test]
    fn low_ticket_already_in_progress_is_left_alone() {
        let current = stored(
            TicketPriority::Low,
            TicketStatus::InProgress,
            Some(SUPPORT_BOT),
        );
        let proposed = TicketChanges {
            status: Some(TicketStatus::InProgress),
            ..Default::default()
        };

        let resolved = resolve(Some(&current), &proposed, now());
        assert_eq!(resolved.assigned_to, None);
    }

    #[test]
    fn escalation_wins_over_junior_assignment() {
        let current = stored(TicketPriority::Low, TicketStatus::Open, Some(SUPPORT_BOT));
        let proposed = TicketChanges {
            status: Some(TicketStatus::InProgress),
            priority: Some(TicketPriority::High),
            ..Default::default()
        };

        let resolution = resolve_with_rules(Some(&current), &proposed, now());
        assert_eq!(resolution.changes.assigned_to, senior());
        assert_eq!(
            resolution.fired,
            vec![Rule::LowPriorityStarted, Rule::EscalatedToHigh]
        );
    }

    // -- pass-through and timestamps ------------------------------------------

    #[test]
    fn unrelated_fields_pass_through() {
        let current = stored(TicketPriority::Medium, TicketStatus::Open, None);
        let proposed = TicketChanges {
            title: Some("VPN drops hourly".into()),
            description: Some("Updated repro".into()),
            status: Some(TicketStatus::Closed),
            ..Default::default()
        };

        let resolved = resolve(Some(&current), &proposed, now());
        assert_eq!(resolved.title, proposed.title);
        assert_eq!(resolved.description, proposed.description);
        assert_eq!(resolved.status, Some(TicketStatus::Closed));
        assert_eq!(resolved.assigned_to, None);
        assert_eq!(resolved.updated_at, Some(now()));
    }

    #[test]
    fn updated_at_never_moves_backwards() {
        let mut ticket = stored(TicketPriority::Medium, TicketStatus::Open, None);
        let clock = [
            now(),
            now() + Duration::minutes(5),
            now() - Duration::hours(2),
            now() + Duration::minutes(1),
            now() + Duration::days(1),
        ];

        let mut previous = ticket.updated_at;
        for tick in clock {
            let proposed = TicketChanges {
                description: Some(format!("touched at {tick}")),
                ..Default::default()
            };
            let resolved = resolve(Some(&ticket), &proposed, tick);
            ticket = resolved.apply_to(&ticket);
            assert!(ticket.updated_at >= previous);
            assert!(ticket.updated_at >= ticket.created_at);
            previous = ticket.updated_at;
        }
        assert_eq!(ticket.updated_at, now() + Duration::days(1));
    }
}
