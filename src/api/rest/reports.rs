use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use chrono::{NaiveDate, Utc};
use serde::Serialize;

use crate::auth::Principal;
use crate::error::AppError;
use crate::models::report::DailyReport;
use crate::ops::report::{self, ReportOutcome};
use crate::ops::visibility;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/reports", get(list_reports))
        .route("/api/reports/generate", post(generate_report))
        .route("/api/reports/:date", get(get_report))
        .route("/api/dashboard", get(dashboard))
}

async fn list_reports(
    State(state): State<Arc<AppState>>,
    _principal: Principal,
) -> Result<Json<Vec<DailyReport>>, AppError> {
    Ok(Json(report::list_reports(&state.db)?))
}

async fn get_report(
    State(state): State<Arc<AppState>>,
    _principal: Principal,
    Path(date): Path<String>,
) -> Result<Json<DailyReport>, AppError> {
    let date = NaiveDate::parse_from_str(&date, "%Y-%m-%d")
        .map_err(|_| AppError::Validation(format!("invalid date: {date}")))?;
    Ok(Json(report::get_report(&state.db, date)?))
}

/// On-demand run of the daily aggregation for today. Returns 200 with
/// the existing row when the date is already covered.
async fn generate_report(
    State(state): State<Arc<AppState>>,
    principal: Principal,
) -> Result<(StatusCode, Json<DailyReport>), AppError> {
    if !principal.is_staff() {
        return Err(AppError::Permission(
            "only a coordinator or administrator may generate reports".to_string(),
        ));
    }

    let today = Utc::now().date_naive();
    match report::generate_for(&state.db, today)? {
        ReportOutcome::Created(report) => Ok((StatusCode::CREATED, Json(report))),
        ReportOutcome::AlreadyExists(report) => Ok((StatusCode::OK, Json(report))),
    }
}

#[derive(Serialize)]
struct DashboardResponse {
    total_orders: i64,
    orders_by_status: Vec<StatusCount>,
    total_attempts: i64,
    successful_deliveries: i64,
    failed_deliveries: i64,
    success_rate: f64,
    available_couriers: i64,
    available_vehicles: i64,
}

#[derive(Serialize)]
struct StatusCount {
    status: String,
    count: i64,
}

/// Operational summary. Order and attempt counts honor the caller's
/// visibility scope; fleet counts are global.
async fn dashboard(
    State(state): State<Arc<AppState>>,
    principal: Principal,
) -> Result<Json<DashboardResponse>, AppError> {
    let scope = visibility::courier_scope(&principal).map(|id| id.to_string());

    let response = state.db.with_conn(|conn| {
        let total_orders: i64 = conn.query_row(
            "SELECT COUNT(*) FROM orders WHERE (?1 IS NULL OR courier_id = ?1)",
            rusqlite::params![scope],
            |row| row.get(0),
        )?;

        let mut stmt = conn.prepare(
            "SELECT status, COUNT(*) FROM orders
             WHERE (?1 IS NULL OR courier_id = ?1)
             GROUP BY status ORDER BY status",
        )?;
        let orders_by_status = stmt
            .query_map(rusqlite::params![scope], |row| {
                Ok(StatusCount {
                    status: row.get(0)?,
                    count: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let (total_attempts, successful, failed): (i64, i64, i64) = conn.query_row(
            "SELECT COUNT(*),
                    COALESCE(SUM(outcome = 'delivered'), 0),
                    COALESCE(SUM(outcome IN ('unavailable', 'error')), 0)
             FROM delivery_attempts WHERE (?1 IS NULL OR courier_id = ?1)",
            rusqlite::params![scope],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;

        let available_couriers: i64 = conn.query_row(
            "SELECT COUNT(*) FROM profiles p JOIN accounts a ON a.id = p.account_id
             WHERE p.role = 'courier' AND p.active = 1 AND a.is_admin = 0
               AND p.shift_state = 'available'",
            [],
            |row| row.get(0),
        )?;

        let available_vehicles: i64 = conn.query_row(
            "SELECT COUNT(*) FROM vehicles WHERE active = 1 AND status = 'available'",
            [],
            |row| row.get(0),
        )?;

        let success_rate = if total_attempts > 0 {
            successful as f64 / total_attempts as f64 * 100.0
        } else {
            0.0
        };

        Ok(DashboardResponse {
            total_orders,
            orders_by_status,
            total_attempts,
            successful_deliveries: successful,
            failed_deliveries: failed,
            success_rate,
            available_couriers,
            available_vehicles,
        })
    })?;

    Ok(Json(response))
}
