//! Read-only ticket aggregation for the dashboard.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use serde::Serialize;

use crate::ticket::{Ticket, TicketPriority, TicketStatus, UNASSIGNED};
use crate::types::Timestamp;

/// Default number of tickets in the "latest" feed.
pub const DEFAULT_LATEST_LIMIT: usize = 10;

/// Ticket selection for a dashboard view. Empty sets mean "all".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardFilter {
    pub statuses: Vec<TicketStatus>,
    pub priorities: Vec<TicketPriority>,
    /// Inclusive lower bound on `created_at`.
    pub created_from: Option<Timestamp>,
    /// Exclusive upper bound on `created_at`.
    pub created_to: Option<Timestamp>,
}

impl DashboardFilter {
    pub fn matches(&self, ticket: &Ticket) -> bool {
        let created = ticket.created_at;
        (self.statuses.is_empty() || self.statuses.contains(&ticket.status))
            && (self.priorities.is_empty() || self.priorities.contains(&ticket.priority))
            && self.created_from.map_or(true, |from| created >= from)
            && self.created_to.map_or(true, |to| created < to)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssigneeLoad {
    pub assignee: String,
    pub tickets: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub tickets: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub total: usize,
    pub open: usize,
    pub high_priority: usize,
    pub high_priority_pct: f64,
    /// Mean `updated_at - created_at` over closed tickets.
    pub avg_resolution_hours: Option<f64>,
    pub by_status: BTreeMap<TicketStatus, usize>,
    pub by_priority: BTreeMap<TicketPriority, usize>,
    pub analyst_load: Vec<AssigneeLoad>,
    pub daily_created: Vec<DailyCount>,
    pub latest: Vec<Ticket>,
}

/// Aggregate the tickets selected by `filter`.
pub fn summarize(
    tickets: &[Ticket],
    filter: &DashboardFilter,
    latest_limit: usize,
) -> DashboardSummary {
    let selected: Vec<&Ticket> = tickets.iter().filter(|t| filter.matches(t)).collect();
    let total = selected.len();

    let mut by_status: BTreeMap<TicketStatus, usize> =
        TicketStatus::ALL.into_iter().map(|s| (s, 0)).collect();
    let mut by_priority: BTreeMap<TicketPriority, usize> =
        TicketPriority::ALL.into_iter().map(|p| (p, 0)).collect();
    let mut load: HashMap<&str, usize> = HashMap::new();
    let mut daily: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    let mut resolution_secs: Vec<i64> = Vec::new();

    for ticket in &selected {
        *by_status.entry(ticket.status).or_default() += 1;
        *by_priority.entry(ticket.priority).or_default() += 1;
        *load
            .entry(ticket.assigned_to.as_deref().unwrap_or(UNASSIGNED))
            .or_default() += 1;
        *daily.entry(ticket.created_at.date_naive()).or_default() += 1;
        if ticket.status == TicketStatus::Closed {
            resolution_secs.push((ticket.updated_at - ticket.created_at).num_seconds());
        }
    }

    let high_priority = by_priority[&TicketPriority::High];
    let high_priority_pct = if total == 0 {
        0.0
    } else {
        high_priority as f64 / total as f64 * 100.0
    };

    let avg_resolution_hours = (!resolution_secs.is_empty()).then(|| {
        let sum: i64 = resolution_secs.iter().sum();
        sum as f64 / resolution_secs.len() as f64 / 3600.0
    });

    let mut analyst_load: Vec<AssigneeLoad> = load
        .into_iter()
        .map(|(assignee, tickets)| AssigneeLoad {
            assignee: assignee.to_string(),
            tickets,
        })
        .collect();
    analyst_load.sort_by(|a, b| {
        b.tickets
            .cmp(&a.tickets)
            .then_with(|| a.assignee.cmp(&b.assignee))
    });

    let mut latest: Vec<Ticket> = selected.iter().map(|t| (*t).clone()).collect();
    latest.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.id.cmp(&a.id))
    });
    latest.truncate(latest_limit);

    DashboardSummary {
        total,
        open: by_status[&TicketStatus::Open],
        high_priority,
        high_priority_pct,
        avg_resolution_hours,
        by_status,
        by_priority,
        analyst_load,
        daily_created: daily
            .into_iter()
            .map(|(date, tickets)| DailyCount { date, tickets })
            .collect(),
        latest,
    }
}
