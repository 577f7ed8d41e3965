//! Delivery attempts. Sequence numbers are per order and the "latest"
//! attempt is always the one with the highest sequence number, never
//! the most recently inserted row.

use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::db::{bad_enum, now_text, parse_opt_uuid, parse_ts, parse_uuid};
use crate::error::AppError;
use crate::models::attempt::{AttemptLabel, AttemptOutcome, DeliveryAttempt};

const ATTEMPT_COLUMNS: &str = "id, order_id, seq, courier_id, label, outcome, lat, lng, \
     photo_path, notes, recorded_at";

fn attempt_from_row(row: &Row<'_>) -> rusqlite::Result<DeliveryAttempt> {
    let label: String = row.get("label")?;
    let outcome: String = row.get("outcome")?;

    Ok(DeliveryAttempt {
        id: parse_uuid(&row.get::<_, String>("id")?)?,
        order_id: parse_uuid(&row.get::<_, String>("order_id")?)?,
        seq: row.get("seq")?,
        courier_id: parse_opt_uuid(row.get("courier_id")?)?,
        label: AttemptLabel::parse(&label).ok_or_else(|| bad_enum("label", &label))?,
        outcome: AttemptOutcome::parse(&outcome).ok_or_else(|| bad_enum("outcome", &outcome))?,
        lat: row.get("lat")?,
        lng: row.get("lng")?,
        photo_path: row.get("photo_path")?,
        notes: row.get("notes")?,
        recorded_at: parse_ts(&row.get::<_, String>("recorded_at")?)?,
    })
}

/// Next sequence number for the order: highest existing + 1, first = 1.
/// Callers run this and the insert in one transaction; the UNIQUE
/// (order_id, seq) constraint backstops the computation.
pub fn next_seq(conn: &Connection, order_id: Uuid) -> Result<u32, AppError> {
    let next = conn.query_row(
        "SELECT COALESCE(MAX(seq), 0) + 1 FROM delivery_attempts WHERE order_id = ?1",
        params![order_id.to_string()],
        |row| row.get(0),
    )?;
    Ok(next)
}

pub fn insert(conn: &Connection, attempt: &DeliveryAttempt) -> Result<(), AppError> {
    conn.execute(
        "INSERT INTO delivery_attempts (id, order_id, seq, courier_id, label, outcome,
         lat, lng, photo_path, notes, recorded_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            attempt.id.to_string(),
            attempt.order_id.to_string(),
            attempt.seq,
            attempt.courier_id.map(|id| id.to_string()),
            attempt.label.as_str(),
            attempt.outcome.as_str(),
            attempt.lat,
            attempt.lng,
            attempt.photo_path,
            attempt.notes,
            now_text(attempt.recorded_at),
        ],
    )?;
    Ok(())
}

pub fn find_by_id(
    conn: &Connection,
    id: Uuid,
    scope: Option<Uuid>,
) -> Result<Option<DeliveryAttempt>, AppError> {
    let attempt = conn
        .query_row(
            &format!(
                "SELECT {ATTEMPT_COLUMNS} FROM delivery_attempts
                 WHERE id = ?1 AND (?2 IS NULL OR courier_id = ?2)"
            ),
            params![id.to_string(), scope.map(|id| id.to_string())],
            attempt_from_row,
        )
        .optional()?;
    Ok(attempt)
}

pub fn list_for_order(conn: &Connection, order_id: Uuid) -> Result<Vec<DeliveryAttempt>, AppError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ATTEMPT_COLUMNS} FROM delivery_attempts
         WHERE order_id = ?1 ORDER BY seq"
    ))?;

    let rows = stmt.query_map(params![order_id.to_string()], attempt_from_row)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

/// The order's latest attempt by maximum sequence number.
pub fn latest_for_order(
    conn: &Connection,
    order_id: Uuid,
) -> Result<Option<DeliveryAttempt>, AppError> {
    let attempt = conn
        .query_row(
            &format!(
                "SELECT {ATTEMPT_COLUMNS} FROM delivery_attempts
                 WHERE order_id = ?1 ORDER BY seq DESC LIMIT 1"
            ),
            params![order_id.to_string()],
            attempt_from_row,
        )
        .optional()?;
    Ok(attempt)
}

pub struct LatestAttempt {
    pub attempt: DeliveryAttempt,
    pub total_attempts: u32,
}

/// One row per order that has attempts: the max-sequence attempt plus
/// the order's attempt count. Outcome filtering applies after the
/// latest attempt is picked, matching the dispatch overview listing.
pub fn list_latest(
    conn: &Connection,
    outcome: Option<AttemptOutcome>,
    scope: Option<Uuid>,
) -> Result<Vec<LatestAttempt>, AppError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ATTEMPT_COLUMNS},
                (SELECT COUNT(*) FROM delivery_attempts c
                 WHERE c.order_id = delivery_attempts.order_id) AS total_attempts
         FROM delivery_attempts
         WHERE seq = (SELECT MAX(b.seq) FROM delivery_attempts b
                      WHERE b.order_id = delivery_attempts.order_id)
           AND (?1 IS NULL OR outcome = ?1)
           AND (?2 IS NULL OR courier_id = ?2)
         ORDER BY recorded_at DESC"
    ))?;

    let rows = stmt.query_map(
        params![
            outcome.map(|outcome| outcome.as_str()),
            scope.map(|id| id.to_string()),
        ],
        |row| {
            Ok(LatestAttempt {
                attempt: attempt_from_row(row)?,
                total_attempts: row.get("total_attempts")?,
            })
        },
    )?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

/// Supplementary fields only; sequence, outcome and label never change
/// once recorded.
pub fn update_extras(
    conn: &Connection,
    id: Uuid,
    lat: Option<f64>,
    lng: Option<f64>,
    photo_path: Option<&str>,
    notes: Option<&str>,
) -> Result<(), AppError> {
    conn.execute(
        "UPDATE delivery_attempts SET
             lat = COALESCE(?2, lat),
             lng = COALESCE(?3, lng),
             photo_path = COALESCE(?4, photo_path),
             notes = COALESCE(?5, notes)
         WHERE id = ?1",
        params![id.to_string(), lat, lng, photo_path, notes],
    )?;
    Ok(())
}

/// Attempt counts for one day, keyed on the date prefix of the stored
/// RFC 3339 timestamp.
pub struct DayCounts {
    pub total: u32,
    pub successful: u32,
    pub failed: u32,
}

pub fn count_for_day(conn: &Connection, day: &str) -> Result<DayCounts, AppError> {
    let counts = conn.query_row(
        "SELECT COUNT(*),
                COALESCE(SUM(outcome = 'delivered'), 0),
                COALESCE(SUM(outcome IN ('unavailable', 'error')), 0)
         FROM delivery_attempts
         WHERE substr(recorded_at, 1, 10) = ?1",
        params![day],
        |row| {
            Ok(DayCounts {
                total: row.get(0)?,
                successful: row.get(1)?,
                failed: row.get(2)?,
            })
        },
    )?;
    Ok(counts)
}
