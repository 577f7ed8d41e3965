use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::db::{now_text, parse_opt_uuid, parse_ts, parse_uuid};
use crate::error::AppError;
use crate::models::route::Route;

fn route_from_row(row: &Row<'_>) -> rusqlite::Result<Route> {
    Ok(Route {
        id: parse_uuid(&row.get::<_, String>("id")?)?,
        name: row.get("name")?,
        description: row.get("description")?,
        zone: row.get("zone")?,
        vehicle_label: row.get("vehicle_label")?,
        courier_id: parse_opt_uuid(row.get("courier_id")?)?,
        active: row.get("active")?,
        order_ids: Vec::new(),
        created_at: parse_ts(&row.get::<_, String>("created_at")?)?,
    })
}

fn load_order_ids(conn: &Connection, route: &mut Route) -> Result<(), AppError> {
    let mut stmt = conn.prepare(
        "SELECT order_id FROM route_orders WHERE route_id = ?1 ORDER BY order_id",
    )?;
    let rows = stmt.query_map(params![route.id.to_string()], |row| {
        parse_uuid(&row.get::<_, String>(0)?)
    })?;
    route.order_ids = rows.collect::<Result<Vec<_>, _>>()?;
    Ok(())
}

pub fn insert(conn: &Connection, route: &Route) -> Result<(), AppError> {
    conn.execute(
        "INSERT INTO routes (id, name, description, zone, vehicle_label, courier_id, active,
         created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            route.id.to_string(),
            route.name,
            route.description,
            route.zone,
            route.vehicle_label,
            route.courier_id.map(|id| id.to_string()),
            route.active,
            now_text(route.created_at),
        ],
    )?;

    for order_id in &route.order_ids {
        conn.execute(
            "INSERT OR IGNORE INTO route_orders (route_id, order_id) VALUES (?1, ?2)",
            params![route.id.to_string(), order_id.to_string()],
        )?;
    }
    Ok(())
}

pub fn find_by_id(conn: &Connection, id: Uuid) -> Result<Option<Route>, AppError> {
    let route = conn
        .query_row(
            "SELECT id, name, description, zone, vehicle_label, courier_id, active, created_at
             FROM routes WHERE id = ?1",
            params![id.to_string()],
            route_from_row,
        )
        .optional()?;

    match route {
        Some(mut route) => {
            load_order_ids(conn, &mut route)?;
            Ok(Some(route))
        }
        None => Ok(None),
    }
}

pub fn find_by_name(conn: &Connection, name: &str) -> Result<Option<Route>, AppError> {
    let route = conn
        .query_row(
            "SELECT id, name, description, zone, vehicle_label, courier_id, active, created_at
             FROM routes WHERE name = ?1",
            params![name],
            route_from_row,
        )
        .optional()?;

    match route {
        Some(mut route) => {
            load_order_ids(conn, &mut route)?;
            Ok(Some(route))
        }
        None => Ok(None),
    }
}

pub fn list(
    conn: &Connection,
    zone: Option<&str>,
    active: Option<bool>,
) -> Result<Vec<Route>, AppError> {
    let mut stmt = conn.prepare(
        "SELECT id, name, description, zone, vehicle_label, courier_id, active, created_at
         FROM routes
         WHERE (?1 IS NULL OR zone = ?1)
           AND (?2 IS NULL OR active = ?2)
         ORDER BY created_at DESC",
    )?;

    let rows = stmt.query_map(params![zone, active], route_from_row)?;
    let mut routes = rows.collect::<Result<Vec<_>, _>>()?;

    for route in &mut routes {
        load_order_ids(conn, route)?;
    }
    Ok(routes)
}

pub fn update_fields(
    conn: &Connection,
    id: Uuid,
    name: Option<&str>,
    description: Option<&str>,
    zone: Option<&str>,
    vehicle_label: Option<&str>,
    courier_id: Option<Uuid>,
    active: Option<bool>,
) -> Result<(), AppError> {
    conn.execute(
        "UPDATE routes SET
             name = COALESCE(?2, name),
             description = COALESCE(?3, description),
             zone = COALESCE(?4, zone),
             vehicle_label = COALESCE(?5, vehicle_label),
             courier_id = COALESCE(?6, courier_id),
             active = COALESCE(?7, active)
         WHERE id = ?1",
        params![
            id.to_string(),
            name,
            description,
            zone,
            vehicle_label,
            courier_id.map(|id| id.to_string()),
            active,
        ],
    )?;
    Ok(())
}

/// Replaces the route's order membership.
pub fn set_orders(conn: &Connection, route_id: Uuid, order_ids: &[Uuid]) -> Result<(), AppError> {
    conn.execute(
        "DELETE FROM route_orders WHERE route_id = ?1",
        params![route_id.to_string()],
    )?;

    for order_id in order_ids {
        conn.execute(
            "INSERT INTO route_orders (route_id, order_id) VALUES (?1, ?2)",
            params![route_id.to_string(), order_id.to_string()],
        )?;
    }
    Ok(())
}
