use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::{now_text, parse_date, parse_ts};
use crate::error::AppError;
use crate::models::report::DailyReport;

fn report_from_row(row: &Row<'_>) -> rusqlite::Result<DailyReport> {
    let successful: u32 = row.get("successful_deliveries")?;
    let total: u32 = row.get("total_deliveries")?;

    Ok(DailyReport {
        date: parse_date(&row.get::<_, String>("report_date")?)?,
        total_deliveries: total,
        successful_deliveries: successful,
        failed_deliveries: row.get("failed_deliveries")?,
        success_rate: DailyReport::compute_rate(successful, total),
        notes: row.get("notes")?,
        created_at: parse_ts(&row.get::<_, String>("created_at")?)?,
    })
}

pub fn insert(conn: &Connection, report: &DailyReport) -> Result<(), AppError> {
    conn.execute(
        "INSERT INTO daily_reports (report_date, total_deliveries, successful_deliveries,
         failed_deliveries, notes, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            report.date.format("%Y-%m-%d").to_string(),
            report.total_deliveries,
            report.successful_deliveries,
            report.failed_deliveries,
            report.notes,
            now_text(report.created_at),
        ],
    )?;
    Ok(())
}

pub fn find_by_date(conn: &Connection, date: NaiveDate) -> Result<Option<DailyReport>, AppError> {
    let report = conn
        .query_row(
            "SELECT report_date, total_deliveries, successful_deliveries, failed_deliveries,
             notes, created_at
             FROM daily_reports WHERE report_date = ?1",
            params![date.format("%Y-%m-%d").to_string()],
            report_from_row,
        )
        .optional()?;
    Ok(report)
}

pub fn list(conn: &Connection) -> Result<Vec<DailyReport>, AppError> {
    let mut stmt = conn.prepare(
        "SELECT report_date, total_deliveries, successful_deliveries, failed_deliveries,
         notes, created_at
         FROM daily_reports ORDER BY report_date DESC",
    )?;

    let rows = stmt.query_map([], report_from_row)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}
