use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::db::{now_text, parse_ts, parse_uuid};
use crate::error::AppError;
use crate::models::pharmacy::Pharmacy;

fn pharmacy_from_row(row: &Row<'_>) -> rusqlite::Result<Pharmacy> {
    Ok(Pharmacy {
        id: parse_uuid(&row.get::<_, String>("id")?)?,
        name: row.get("name")?,
        address: row.get("address")?,
        city: row.get("city")?,
        active: row.get("active")?,
        created_at: parse_ts(&row.get::<_, String>("created_at")?)?,
    })
}

pub fn insert(conn: &Connection, pharmacy: &Pharmacy) -> Result<(), AppError> {
    conn.execute(
        "INSERT INTO pharmacies (id, name, address, city, active, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            pharmacy.id.to_string(),
            pharmacy.name,
            pharmacy.address,
            pharmacy.city,
            pharmacy.active,
            now_text(pharmacy.created_at),
        ],
    )?;
    Ok(())
}

pub fn find_by_id(conn: &Connection, id: Uuid) -> Result<Option<Pharmacy>, AppError> {
    let pharmacy = conn
        .query_row(
            "SELECT id, name, address, city, active, created_at
             FROM pharmacies WHERE id = ?1",
            params![id.to_string()],
            pharmacy_from_row,
        )
        .optional()?;
    Ok(pharmacy)
}

pub fn find_by_name(conn: &Connection, name: &str) -> Result<Option<Pharmacy>, AppError> {
    let pharmacy = conn
        .query_row(
            "SELECT id, name, address, city, active, created_at
             FROM pharmacies WHERE name = ?1",
            params![name],
            pharmacy_from_row,
        )
        .optional()?;
    Ok(pharmacy)
}

pub fn list(
    conn: &Connection,
    city: Option<&str>,
    active: Option<bool>,
) -> Result<Vec<Pharmacy>, AppError> {
    let mut stmt = conn.prepare(
        "SELECT id, name, address, city, active, created_at
         FROM pharmacies
         WHERE (?1 IS NULL OR city = ?1)
           AND (?2 IS NULL OR active = ?2)
         ORDER BY name",
    )?;

    let rows = stmt.query_map(params![city, active], pharmacy_from_row)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

pub fn update_fields(
    conn: &Connection,
    id: Uuid,
    name: Option<&str>,
    address: Option<&str>,
    city: Option<&str>,
    active: Option<bool>,
) -> Result<(), AppError> {
    conn.execute(
        "UPDATE pharmacies SET
             name = COALESCE(?2, name),
             address = COALESCE(?3, address),
             city = COALESCE(?4, city),
             active = COALESCE(?5, active)
         WHERE id = ?1",
        params![id.to_string(), name, address, city, active],
    )?;
    Ok(())
}
