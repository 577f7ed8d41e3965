//! Vehicle rows. Reads join the holding profile so the derived
//! `assigned_courier_id` is always current.

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::db::{bad_enum, now_text, parse_opt_date, parse_opt_uuid, parse_ts, parse_uuid};
use crate::error::AppError;
use crate::models::vehicle::{Vehicle, VehicleStatus};

const VEHICLE_COLUMNS: &str = "v.id, v.plate, v.make, v.model, v.year, v.status, v.active, \
     v.last_maintenance, v.next_maintenance, v.notes, p.id AS assigned_courier_id, v.created_at";

const VEHICLE_JOIN: &str = "FROM vehicles v LEFT JOIN profiles p ON p.vehicle_id = v.id";

fn vehicle_from_row(row: &Row<'_>) -> rusqlite::Result<Vehicle> {
    let status: String = row.get("status")?;

    Ok(Vehicle {
        id: parse_uuid(&row.get::<_, String>("id")?)?,
        plate: row.get("plate")?,
        make: row.get("make")?,
        model: row.get("model")?,
        year: row.get("year")?,
        status: VehicleStatus::parse(&status).ok_or_else(|| bad_enum("status", &status))?,
        active: row.get("active")?,
        last_maintenance: parse_opt_date(row.get("last_maintenance")?)?,
        next_maintenance: parse_opt_date(row.get("next_maintenance")?)?,
        notes: row.get("notes")?,
        assigned_courier_id: parse_opt_uuid(row.get("assigned_courier_id")?)?,
        created_at: parse_ts(&row.get::<_, String>("created_at")?)?,
    })
}

pub fn insert(conn: &Connection, vehicle: &Vehicle) -> Result<(), AppError> {
    conn.execute(
        "INSERT INTO vehicles (id, plate, make, model, year, status, active,
         last_maintenance, next_maintenance, notes, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            vehicle.id.to_string(),
            vehicle.plate,
            vehicle.make,
            vehicle.model,
            vehicle.year,
            vehicle.status.as_str(),
            vehicle.active,
            vehicle.last_maintenance.map(date_text),
            vehicle.next_maintenance.map(date_text),
            vehicle.notes,
            now_text(vehicle.created_at),
        ],
    )?;
    Ok(())
}

pub fn find_by_id(conn: &Connection, id: Uuid) -> Result<Option<Vehicle>, AppError> {
    let vehicle = conn
        .query_row(
            &format!("SELECT {VEHICLE_COLUMNS} {VEHICLE_JOIN} WHERE v.id = ?1"),
            params![id.to_string()],
            vehicle_from_row,
        )
        .optional()?;
    Ok(vehicle)
}

pub fn find_by_plate(conn: &Connection, plate: &str) -> Result<Option<Vehicle>, AppError> {
    let vehicle = conn
        .query_row(
            &format!("SELECT {VEHICLE_COLUMNS} {VEHICLE_JOIN} WHERE v.plate = ?1"),
            params![plate],
            vehicle_from_row,
        )
        .optional()?;
    Ok(vehicle)
}

pub fn list(
    conn: &Connection,
    status: Option<VehicleStatus>,
    active: Option<bool>,
) -> Result<Vec<Vehicle>, AppError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {VEHICLE_COLUMNS} {VEHICLE_JOIN}
         WHERE (?1 IS NULL OR v.status = ?1)
           AND (?2 IS NULL OR v.active = ?2)
         ORDER BY v.plate"
    ))?;

    let rows = stmt.query_map(
        params![status.map(|status| status.as_str()), active],
        vehicle_from_row,
    )?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

pub fn set_status(conn: &Connection, id: Uuid, status: VehicleStatus) -> Result<(), AppError> {
    conn.execute(
        "UPDATE vehicles SET status = ?2 WHERE id = ?1",
        params![id.to_string(), status.as_str()],
    )?;
    Ok(())
}

pub struct VehicleUpdate<'a> {
    pub make: Option<&'a str>,
    pub model: Option<&'a str>,
    pub year: Option<i32>,
    pub active: Option<bool>,
    pub notes: Option<&'a str>,
}

pub fn update_fields(
    conn: &Connection,
    id: Uuid,
    update: &VehicleUpdate<'_>,
) -> Result<(), AppError> {
    conn.execute(
        "UPDATE vehicles SET
             make = COALESCE(?2, make),
             model = COALESCE(?3, model),
             year = COALESCE(?4, year),
             active = COALESCE(?5, active),
             notes = COALESCE(?6, notes)
         WHERE id = ?1",
        params![
            id.to_string(),
            update.make,
            update.model,
            update.year,
            update.active,
            update.notes,
        ],
    )?;
    Ok(())
}

pub fn set_maintenance(
    conn: &Connection,
    id: Uuid,
    last_maintenance: Option<NaiveDate>,
    next_maintenance: Option<NaiveDate>,
    notes: Option<&str>,
) -> Result<(), AppError> {
    conn.execute(
        "UPDATE vehicles SET
             status = 'maintenance',
             last_maintenance = COALESCE(?2, last_maintenance),
             next_maintenance = COALESCE(?3, next_maintenance),
             notes = COALESCE(?4, notes)
         WHERE id = ?1",
        params![
            id.to_string(),
            last_maintenance.map(date_text),
            next_maintenance.map(date_text),
            notes,
        ],
    )?;
    Ok(())
}

pub fn count_in_use(conn: &Connection) -> Result<i64, AppError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM vehicles WHERE status = 'in_use'",
        [],
        |row| row.get(0),
    )?;
    Ok(count)
}

fn date_text(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
