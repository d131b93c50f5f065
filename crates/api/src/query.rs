//! Shared query parameter types for API handlers.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use ticketdesk_core::analytics::{DashboardFilter, DEFAULT_LATEST_LIMIT};
use ticketdesk_core::error::CoreError;
use ticketdesk_core::types::Timestamp;

/// Upper bound on the dashboard "latest" feed.
pub const MAX_LATEST_LIMIT: usize = 100;

/// Query parameters for `GET /dashboard/summary`.
///
/// `status` and `priority` take comma-separated lists. `from` and `to`
/// accept RFC 3339 timestamps or `YYYY-MM-DD` dates (midnight UTC).
#[derive(Debug, Default, Deserialize)]
pub struct DashboardParams {
    pub status: Option<String>,
    pub priority: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub latest: Option<usize>,
}

impl DashboardParams {
    /// Parse into a filter and the clamped latest-feed length.
    pub fn into_filter(self) -> Result<(DashboardFilter, usize), CoreError> {
        let filter = DashboardFilter {
            statuses: parse_list(self.status.as_deref())?,
            priorities: parse_list(self.priority.as_deref())?,
            created_from: parse_bound("from", self.from.as_deref())?,
            created_to: parse_bound("to", self.to.as_deref())?,
        };

        if let (Some(from), Some(to)) = (filter.created_from, filter.created_to) {
            if from >= to {
                return Err(CoreError::Validation(
                    "'from' must be earlier than 'to'".into(),
                ));
            }
        }

        let latest = self
            .latest
            .unwrap_or(DEFAULT_LATEST_LIMIT)
            .clamp(1, MAX_LATEST_LIMIT);
        Ok((filter, latest))
    }
}

/// Query parameters for `GET /consistency/report`.
#[derive(Debug, Default, Deserialize)]
pub struct ConsistencyReportParams {
    #[serde(default)]
    pub include_drift: bool,
}

/// Parse a comma-separated list of enum values, ignoring blanks and repeats.
fn parse_list<T>(raw: Option<&str>) -> Result<Vec<T>, CoreError>
where
    T: FromStr<Err = CoreError> + PartialEq,
{
    let mut out = Vec::new();
    for part in raw.unwrap_or_default().split(',').map(str::trim) {
        if part.is_empty() {
            continue;
        }
        let value: T = part.parse()?;
        if !out.contains(&value) {
            out.push(value);
        }
    }
    Ok(out)
}

fn parse_bound(name: &str, raw: Option<&str>) -> Result<Option<Timestamp>, CoreError> {
    raw.map(|v| parse_instant(name, v)).transpose()
}

fn parse_instant(name: &str, raw: &str) -> Result<Timestamp, CoreError> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| {
            CoreError::Validation(format!(
                "Invalid '{name}' value '{raw}'. Expected RFC 3339 timestamp or YYYY-MM-DD"
            ))
        })
}
