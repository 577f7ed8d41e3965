//! Orders and their medicine lines.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::db::{bad_enum, now_text, parse_opt_uuid, parse_ts, parse_uuid};
use crate::error::AppError;
use crate::models::order::{MedicineLine, Order, OrderStatus, OrderType, Priority};

const ORDER_COLUMNS: &str = "id, client_name, client_address, client_phone, notes, priority, \
     order_type, status, origin_pharmacy_id, destination_pharmacy_id, courier_id, \
     created_at, updated_at";

fn order_from_row(row: &Row<'_>) -> rusqlite::Result<Order> {
    let priority: String = row.get("priority")?;
    let order_type: String = row.get("order_type")?;
    let status: String = row.get("status")?;

    Ok(Order {
        id: parse_uuid(&row.get::<_, String>("id")?)?,
        client_name: row.get("client_name")?,
        client_address: row.get("client_address")?,
        client_phone: row.get("client_phone")?,
        notes: row.get("notes")?,
        priority: Priority::parse(&priority).ok_or_else(|| bad_enum("priority", &priority))?,
        order_type: OrderType::parse(&order_type)
            .ok_or_else(|| bad_enum("order_type", &order_type))?,
        status: OrderStatus::parse(&status).ok_or_else(|| bad_enum("status", &status))?,
        origin_pharmacy_id: parse_opt_uuid(row.get("origin_pharmacy_id")?)?,
        destination_pharmacy_id: parse_opt_uuid(row.get("destination_pharmacy_id")?)?,
        courier_id: parse_opt_uuid(row.get("courier_id")?)?,
        created_at: parse_ts(&row.get::<_, String>("created_at")?)?,
        updated_at: parse_ts(&row.get::<_, String>("updated_at")?)?,
    })
}

fn medicine_from_row(row: &Row<'_>) -> rusqlite::Result<MedicineLine> {
    Ok(MedicineLine {
        id: parse_uuid(&row.get::<_, String>("id")?)?,
        order_id: parse_uuid(&row.get::<_, String>("order_id")?)?,
        code: row.get("code")?,
        name: row.get("name")?,
        quantity: row.get("quantity")?,
        notes: row.get("notes")?,
    })
}

pub fn insert(conn: &Connection, order: &Order) -> Result<(), AppError> {
    conn.execute(
        "INSERT INTO orders (id, client_name, client_address, client_phone, notes, priority,
         order_type, status, origin_pharmacy_id, destination_pharmacy_id, courier_id,
         created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        params![
            order.id.to_string(),
            order.client_name,
            order.client_address,
            order.client_phone,
            order.notes,
            order.priority.as_str(),
            order.order_type.as_str(),
            order.status.as_str(),
            order.origin_pharmacy_id.map(|id| id.to_string()),
            order.destination_pharmacy_id.map(|id| id.to_string()),
            order.courier_id.map(|id| id.to_string()),
            now_text(order.created_at),
            now_text(order.updated_at),
        ],
    )?;
    Ok(())
}

/// `scope` restricts access to orders whose responsible courier matches
/// (courier visibility); a scoped miss reads as absent.
pub fn find_by_id(
    conn: &Connection,
    id: Uuid,
    scope: Option<Uuid>,
) -> Result<Option<Order>, AppError> {
    let order = conn
        .query_row(
            &format!(
                "SELECT {ORDER_COLUMNS} FROM orders
                 WHERE id = ?1 AND (?2 IS NULL OR courier_id = ?2)"
            ),
            params![id.to_string(), scope.map(|id| id.to_string())],
            order_from_row,
        )
        .optional()?;
    Ok(order)
}

pub fn find_by_client(conn: &Connection, client_name: &str) -> Result<Option<Order>, AppError> {
    let order = conn
        .query_row(
            &format!("SELECT {ORDER_COLUMNS} FROM orders WHERE client_name = ?1"),
            params![client_name],
            order_from_row,
        )
        .optional()?;
    Ok(order)
}

#[derive(Debug, Default, Clone)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub priority: Option<Priority>,
    pub search: Option<String>,
}

pub fn list(
    conn: &Connection,
    filter: &OrderFilter,
    scope: Option<Uuid>,
) -> Result<Vec<Order>, AppError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders
         WHERE (?1 IS NULL OR status = ?1)
           AND (?2 IS NULL OR priority = ?2)
           AND (?3 IS NULL
                OR client_name LIKE '%' || ?3 || '%'
                OR client_address LIKE '%' || ?3 || '%'
                OR client_phone LIKE '%' || ?3 || '%')
           AND (?4 IS NULL OR courier_id = ?4)
         ORDER BY created_at DESC"
    ))?;

    let rows = stmt.query_map(
        params![
            filter.status.map(|status| status.as_str()),
            filter.priority.map(|priority| priority.as_str()),
            filter.search,
            scope.map(|id| id.to_string()),
        ],
        order_from_row,
    )?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

pub fn set_status(
    conn: &Connection,
    id: Uuid,
    status: OrderStatus,
    origin_pharmacy_id: Option<Uuid>,
    destination_pharmacy_id: Option<Uuid>,
    updated_at: DateTime<Utc>,
) -> Result<(), AppError> {
    conn.execute(
        "UPDATE orders SET status = ?2, origin_pharmacy_id = ?3, destination_pharmacy_id = ?4,
         updated_at = ?5 WHERE id = ?1",
        params![
            id.to_string(),
            status.as_str(),
            origin_pharmacy_id.map(|id| id.to_string()),
            destination_pharmacy_id.map(|id| id.to_string()),
            now_text(updated_at),
        ],
    )?;
    Ok(())
}

pub fn set_courier(
    conn: &Connection,
    id: Uuid,
    courier_id: Option<Uuid>,
    updated_at: DateTime<Utc>,
) -> Result<(), AppError> {
    conn.execute(
        "UPDATE orders SET courier_id = ?2, updated_at = ?3 WHERE id = ?1",
        params![
            id.to_string(),
            courier_id.map(|id| id.to_string()),
            now_text(updated_at),
        ],
    )?;
    Ok(())
}

pub struct OrderUpdate<'a> {
    pub client_name: Option<&'a str>,
    pub client_address: Option<&'a str>,
    pub client_phone: Option<&'a str>,
    pub notes: Option<&'a str>,
    pub priority: Option<Priority>,
    pub order_type: Option<OrderType>,
}

pub fn update_fields(
    conn: &Connection,
    id: Uuid,
    update: &OrderUpdate<'_>,
    updated_at: DateTime<Utc>,
) -> Result<(), AppError> {
    conn.execute(
        "UPDATE orders SET
             client_name = COALESCE(?2, client_name),
             client_address = COALESCE(?3, client_address),
             client_phone = COALESCE(?4, client_phone),
             notes = COALESCE(?5, notes),
             priority = COALESCE(?6, priority),
             order_type = COALESCE(?7, order_type),
             updated_at = ?8
         WHERE id = ?1",
        params![
            id.to_string(),
            update.client_name,
            update.client_address,
            update.client_phone,
            update.notes,
            update.priority.map(|priority| priority.as_str()),
            update.order_type.map(|order_type| order_type.as_str()),
            now_text(updated_at),
        ],
    )?;
    Ok(())
}

pub fn delete(conn: &Connection, id: Uuid) -> Result<bool, AppError> {
    let deleted = conn.execute("DELETE FROM orders WHERE id = ?1", params![id.to_string()])?;
    Ok(deleted > 0)
}

pub fn insert_medicine(conn: &Connection, line: &MedicineLine) -> Result<(), AppError> {
    conn.execute(
        "INSERT INTO medicine_lines (id, order_id, code, name, quantity, notes)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            line.id.to_string(),
            line.order_id.to_string(),
            line.code,
            line.name,
            line.quantity,
            line.notes,
        ],
    )?;
    Ok(())
}

pub fn list_medicines(conn: &Connection, order_id: Uuid) -> Result<Vec<MedicineLine>, AppError> {
    let mut stmt = conn.prepare(
        "SELECT id, order_id, code, name, quantity, notes
         FROM medicine_lines WHERE order_id = ?1 ORDER BY name",
    )?;

    let rows = stmt.query_map(params![order_id.to_string()], medicine_from_row)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

pub fn delete_medicine(conn: &Connection, order_id: Uuid, line_id: Uuid) -> Result<bool, AppError> {
    let deleted = conn.execute(
        "DELETE FROM medicine_lines WHERE id = ?1 AND order_id = ?2",
        params![line_id.to_string(), order_id.to_string()],
    )?;
    Ok(deleted > 0)
}
