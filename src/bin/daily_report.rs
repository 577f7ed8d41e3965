//! One-shot daily report generator. Computes for the current date and
//! no-ops if that date is already covered.

use chrono::Utc;
use tracing_subscriber::EnvFilter;

use pharmacy_dispatch::config::Config;
use pharmacy_dispatch::db::Database;
use pharmacy_dispatch::error::AppError;
use pharmacy_dispatch::ops::report::{self, ReportOutcome};

fn main() -> Result<(), AppError> {
    let config = Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.log_level.clone()))
        .with_target(false)
        .compact()
        .init();

    let database = Database::open(&config.database_path)?;

    let today = Utc::now().date_naive();
    match report::generate_for(&database, today)? {
        ReportOutcome::Created(report) => {
            tracing::info!(
                date = %report.date,
                total = report.total_deliveries,
                successful = report.successful_deliveries,
                failed = report.failed_deliveries,
                success_rate = format!("{:.2}", report.success_rate),
                "daily report generated"
            );
        }
        ReportOutcome::AlreadyExists(report) => {
            tracing::warn!(date = %report.date, "report already exists, nothing to do");
        }
    }

    Ok(())
}
