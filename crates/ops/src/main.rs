use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{fmt, EnvFilter};

use ticketdesk_core::consistency::{
    self, CheckOptions, Remediation, Report, FRESHNESS_WINDOW_DAYS,
};
use ticketdesk_db::repositories::TicketRepo;
use ticketdesk_db::DbPool;

#[derive(Parser)]
#[command(
    name = "ticketdesk-ops",
    version,
    about = "Operator tooling for the ticket store"
)]
struct Cli {
    /// PostgreSQL connection string
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    database_url: String,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the consistency checker. Exits 1 when violations are found.
    Check {
        /// Also report drift from the assignment rules
        #[arg(long)]
        include_drift: bool,
        /// Closed-ticket freshness window in days
        #[arg(long, env = "FRESHNESS_WINDOW_DAYS", default_value_t = FRESHNESS_WINDOW_DAYS)]
        window_days: i64,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Repair one class of violations
    Remediate {
        #[arg(value_enum)]
        action: Action,
        /// Closed-ticket freshness window in days
        #[arg(long, env = "FRESHNESS_WINDOW_DAYS", default_value_t = FRESHNESS_WINDOW_DAYS)]
        window_days: i64,
        /// List the tickets that would change without writing anything
        #[arg(long)]
        dry_run: bool,
    },
    /// Apply pending database migrations
    Migrate,
}

#[derive(Clone, Copy, ValueEnum)]
enum Action {
    /// Re-stamp closed tickets outside the freshness window
    StaleClosed,
    /// Move in-progress low-priority tickets from SupportBot to the Junior Analyst
    BotEscalations,
}

impl From<Action> for Remediation {
    fn from(action: Action) -> Self {
        match action {
            Action::StaleClosed => Remediation::RefreshStaleClosed,
            Action::BotEscalations => Remediation::ReassignBotEscalations,
        }
    }
}

fn init_tracing() {
    let _ = fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok();
    init_tracing();
    let cli = Cli::parse();

    let pool = ticketdesk_db::create_pool(&cli.database_url)
        .await
        .context("Failed to connect to database")?;

    match cli.cmd {
        Commands::Check {
            include_drift,
            window_days,
            json,
        } => {
            let options = CheckOptions {
                freshness_window: window(window_days)?,
                include_drift,
            };
            let report = run_check(&pool, &options).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }

            Ok(if report.is_clean() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Commands::Remediate {
            action,
            window_days,
            dry_run,
        } => {
            let remediation = Remediation::from(action);
            let freshness_window = window(window_days)?;

            let ids = if dry_run {
                let options = CheckOptions {
                    freshness_window,
                    include_drift: true,
                };
                run_check(&pool, &options)
                    .await?
                    .ticket_ids(remediation.repairs())
            } else {
                TicketRepo::remediate(&pool, remediation, freshness_window, Utc::now())
                    .await
                    .with_context(|| format!("Remediation {remediation} failed"))?
            };

            tracing::info!(
                action = %remediation,
                affected = ids.len(),
                dry_run,
                outcome = "success",
                "Remediation finished"
            );
            let verb = if dry_run { "would update" } else { "updated" };
            println!("{remediation}: {verb} {} ticket(s)", ids.len());
            for id in ids {
                println!("  #{id}");
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Migrate => {
            ticketdesk_db::run_migrations(&pool)
                .await
                .context("Failed to run migrations")?;
            println!("Migrations applied");
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn window(days: i64) -> Result<Duration> {
    consistency::freshness_window(days).context("Invalid --window-days")
}

async fn run_check(pool: &DbPool, options: &CheckOptions) -> Result<Report> {
    let snapshots = TicketRepo::scan(pool)
        .await
        .context("Failed to read tickets")?;
    Ok(consistency::check(&snapshots, Utc::now(), options))
}

fn print_report(report: &Report) {
    for violation in &report.violations {
        println!(
            "#{} [{}] {}",
            violation.ticket_id, violation.invariant, violation.message
        );
    }
    if report.is_clean() {
        println!(
            "Checked {} ticket(s): all invariants hold",
            report.tickets_scanned
        );
    } else {
        println!(
            "Checked {} ticket(s): {} violation(s)",
            report.tickets_scanned,
            report.violations.len()
        );
    }
}
