//! Daily aggregation over the day's delivery attempts. One report per
//! calendar date; the date primary key guards against duplicates.

use chrono::{NaiveDate, Utc};

use crate::db::{attempt_repo, report_repo, Database};
use crate::error::AppError;
use crate::models::report::DailyReport;

pub enum ReportOutcome {
    Created(DailyReport),
    AlreadyExists(DailyReport),
}

/// Counts the day's attempts and writes the report row. A report that
/// already exists for the date makes this a no-op.
pub fn generate_for(db: &Database, date: NaiveDate) -> Result<ReportOutcome, AppError> {
    db.with_tx(|tx| {
        if let Some(existing) = report_repo::find_by_date(tx, date)? {
            return Ok(ReportOutcome::AlreadyExists(existing));
        }

        let day = date.format("%Y-%m-%d").to_string();
        let counts = attempt_repo::count_for_day(tx, &day)?;

        let report = DailyReport {
            date,
            total_deliveries: counts.total,
            successful_deliveries: counts.successful,
            failed_deliveries: counts.failed,
            success_rate: DailyReport::compute_rate(counts.successful, counts.total),
            notes: format!("automatically generated for {day}"),
            created_at: Utc::now(),
        };
        report_repo::insert(tx, &report)?;

        tracing::info!(
            date = %day,
            total = report.total_deliveries,
            successful = report.successful_deliveries,
            failed = report.failed_deliveries,
            "daily report created"
        );
        Ok(ReportOutcome::Created(report))
    })
}

pub fn list_reports(db: &Database) -> Result<Vec<DailyReport>, AppError> {
    db.with_conn(report_repo::list)
}

pub fn get_report(db: &Database, date: NaiveDate) -> Result<DailyReport, AppError> {
    db.with_conn(|conn| report_repo::find_by_date(conn, date))?
        .ok_or_else(|| AppError::NotFound(format!("no report for {date}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::profile::Role;
    use crate::ops::dispatch::{self, AttemptInput};
    use crate::ops::orders::{self, NewOrder};
    use crate::ops::testutil;

    fn record(state: &crate::state::AppState, principal: &crate::auth::Principal, outcome: &str) {
        let order = orders::create_order(
            state,
            principal,
            NewOrder {
                client_name: format!("client-{outcome}-{}", uuid::Uuid::new_v4()),
                client_address: "12 Elm St".to_string(),
                client_phone: None,
                notes: None,
                priority: None,
                order_type: None,
                status: None,
                origin_pharmacy_id: None,
                destination_pharmacy_id: None,
                courier_id: None,
                medicines: Vec::new(),
            },
        )
        .unwrap();

        dispatch::record_attempt(
            state,
            principal,
            order.id,
            AttemptInput {
                outcome: outcome.to_string(),
                courier_id: None,
                lat: None,
                lng: None,
                photo_path: None,
                notes: None,
            },
        )
        .unwrap();
    }

    #[test]
    fn report_counts_the_days_outcomes() {
        let state = testutil::state();
        let coordinator = testutil::principal(&state, "coord", Role::Coordinator, false);

        record(&state, &coordinator, "delivered");
        record(&state, &coordinator, "delivered");
        record(&state, &coordinator, "unavailable");
        record(&state, &coordinator, "error");

        let today = Utc::now().date_naive();
        let ReportOutcome::Created(report) = generate_for(&state.db, today).unwrap() else {
            panic!("expected a fresh report");
        };

        assert_eq!(report.total_deliveries, 4);
        assert_eq!(report.successful_deliveries, 2);
        assert_eq!(report.failed_deliveries, 2);
        assert_eq!(report.success_rate, 50.0);
    }

    #[test]
    fn second_generation_is_a_no_op() {
        let state = testutil::state();
        let today = Utc::now().date_naive();

        let ReportOutcome::Created(first) = generate_for(&state.db, today).unwrap() else {
            panic!("expected a fresh report");
        };
        let ReportOutcome::AlreadyExists(second) = generate_for(&state.db, today).unwrap() else {
            panic!("expected the existing report");
        };

        assert_eq!(first.date, second.date);
        assert_eq!(list_reports(&state.db).unwrap().len(), 1);
    }

    #[test]
    fn empty_day_reports_zero_rate() {
        let state = testutil::state();
        let today = Utc::now().date_naive();

        let ReportOutcome::Created(report) = generate_for(&state.db, today).unwrap() else {
            panic!("expected a fresh report");
        };

        assert_eq!(report.total_deliveries, 0);
        assert_eq!(report.success_rate, 0.0);
    }
}
