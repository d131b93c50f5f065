//! Periodic consistency scan.
//!
//! Runs the checker over every stored ticket on a fixed interval and logs
//! what it finds. The scan only reads; repairs are left to an operator.

use std::time::Duration;

use chrono::Utc;
use sqlx::PgPool;
use ticketdesk_core::consistency::{self, CheckOptions, Report};
use ticketdesk_db::repositories::TicketRepo;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Run the scan loop until `cancel` is triggered.
///
/// The first scan happens immediately on start.
pub async fn run(
    pool: PgPool,
    interval: Duration,
    options: CheckOptions,
    cancel: CancellationToken,
) {
    tracing::info!(
        interval_secs = interval.as_secs(),
        freshness_window_days = options.freshness_window.num_days(),
        "Consistency scan job started"
    );

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Consistency scan job stopping");
                break;
            }
            _ = ticker.tick() => {
                match scan_once(&pool, &options).await {
                    Ok(report) => log_report(&report),
                    Err(e) => {
                        tracing::error!(error = %e, "Consistency scan: failed to read tickets");
                    }
                }
            }
        }
    }
}

/// Scan all tickets once.
pub async fn scan_once(pool: &PgPool, options: &CheckOptions) -> Result<Report, sqlx::Error> {
    let snapshots = TicketRepo::scan(pool).await?;
    Ok(consistency::check(&snapshots, Utc::now(), options))
}

fn log_report(report: &Report) {
    if report.is_clean() {
        tracing::info!(
            tickets_scanned = report.tickets_scanned,
            outcome = "success",
            "Consistency scan: all invariants hold"
        );
        return;
    }

    for violation in &report.violations {
        tracing::warn!(
            ticket_id = violation.ticket_id,
            invariant = %violation.invariant,
            detail = %violation.message,
            "Consistency violation"
        );
    }
    tracing::warn!(
        tickets_scanned = report.tickets_scanned,
        violations = report.violations.len(),
        "Consistency scan: violations found"
    );
}
