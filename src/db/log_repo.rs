//! Status log entries. Insert and read only; the audit trail has no
//! update or delete path.

use rusqlite::{params, Connection, Row};
use uuid::Uuid;

use crate::db::{bad_enum, now_text, parse_opt_uuid, parse_ts, parse_uuid};
use crate::error::AppError;
use crate::models::log::StatusLogEntry;
use crate::models::order::OrderStatus;

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<StatusLogEntry> {
    let status: String = row.get("status")?;

    Ok(StatusLogEntry {
        id: parse_uuid(&row.get::<_, String>("id")?)?,
        order_id: parse_uuid(&row.get::<_, String>("order_id")?)?,
        status: OrderStatus::parse(&status).ok_or_else(|| bad_enum("status", &status))?,
        description: row.get("description")?,
        courier_id: parse_opt_uuid(row.get("courier_id")?)?,
        attempt_id: parse_opt_uuid(row.get("attempt_id")?)?,
        created_at: parse_ts(&row.get::<_, String>("created_at")?)?,
    })
}

pub fn append(conn: &Connection, entry: &StatusLogEntry) -> Result<(), AppError> {
    conn.execute(
        "INSERT INTO status_log (id, order_id, status, description, courier_id, attempt_id,
         created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            entry.id.to_string(),
            entry.order_id.to_string(),
            entry.status.as_str(),
            entry.description,
            entry.courier_id.map(|id| id.to_string()),
            entry.attempt_id.map(|id| id.to_string()),
            now_text(entry.created_at),
        ],
    )?;
    Ok(())
}

pub fn list_for_order(conn: &Connection, order_id: Uuid) -> Result<Vec<StatusLogEntry>, AppError> {
    let mut stmt = conn.prepare(
        "SELECT id, order_id, status, description, courier_id, attempt_id, created_at
         FROM status_log WHERE order_id = ?1 ORDER BY created_at DESC",
    )?;

    let rows = stmt.query_map(params![order_id.to_string()], entry_from_row)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}
