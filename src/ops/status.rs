//! Order status transitions. Every transition persists the new status
//! and appends its audit entry in the same transaction; a failed append
//! rolls the status write back.

use chrono::Utc;
use rusqlite::Connection;
use uuid::Uuid;

use crate::auth::Principal;
use crate::db::{log_repo, order_repo, pharmacy_repo};
use crate::error::AppError;
use crate::models::log::StatusLogEntry;
use crate::models::order::{Order, OrderStatus};
use crate::ops::visibility;
use crate::state::AppState;

pub struct StatusChange {
    /// Requested status as supplied by the caller; parsed against the
    /// fixed enumeration here.
    pub status: String,
    pub description: Option<String>,
    pub origin_pharmacy_id: Option<Uuid>,
    pub destination_pharmacy_id: Option<Uuid>,
}

pub fn change_status(
    state: &AppState,
    principal: &Principal,
    order_id: Uuid,
    change: StatusChange,
) -> Result<Order, AppError> {
    let new_status = OrderStatus::parse(&change.status)
        .ok_or_else(|| AppError::Validation(format!("invalid status: {}", change.status)))?;

    let scope = visibility::courier_scope(principal);

    let order = state.db.with_tx(|tx| {
        let order = order_repo::find_by_id(tx, order_id, scope)?
            .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))?;

        let (origin, destination) = if new_status == OrderStatus::Transfer {
            let (origin, destination) = resolve_transfer_pharmacies(
                tx,
                change.origin_pharmacy_id.or(order.origin_pharmacy_id),
                change.destination_pharmacy_id.or(order.destination_pharmacy_id),
            )?;
            (Some(origin), Some(destination))
        } else {
            (order.origin_pharmacy_id, order.destination_pharmacy_id)
        };

        let now = Utc::now();
        order_repo::set_status(tx, order_id, new_status, origin, destination, now)?;

        let description = change
            .description
            .clone()
            .filter(|text| !text.trim().is_empty())
            .unwrap_or_else(|| {
                format!(
                    "status changed from {} to {}",
                    order.status.as_str(),
                    new_status.as_str()
                )
            });
        log_repo::append(
            tx,
            &StatusLogEntry {
                id: Uuid::new_v4(),
                order_id,
                status: new_status,
                description,
                courier_id: principal.is_courier().then_some(principal.profile.id),
                attempt_id: None,
                created_at: now,
            },
        )?;

        order_repo::find_by_id(tx, order_id, None)?
            .ok_or_else(|| AppError::Internal("order vanished during transition".to_string()))
    })?;

    state
        .metrics
        .status_changes_total
        .with_label_values(&[new_status.as_str()])
        .inc();
    tracing::info!(order_id = %order_id, status = new_status.as_str(), "order status changed");

    Ok(order)
}

/// A transfer moves stock between two pharmacies: both must be named,
/// distinct, known, and active.
pub(crate) fn resolve_transfer_pharmacies(
    conn: &Connection,
    origin: Option<Uuid>,
    destination: Option<Uuid>,
) -> Result<(Uuid, Uuid), AppError> {
    let origin = origin.ok_or_else(|| {
        AppError::Validation("origin pharmacy is required for a transfer".to_string())
    })?;
    let destination = destination.ok_or_else(|| {
        AppError::Validation("destination pharmacy is required for a transfer".to_string())
    })?;

    if origin == destination {
        return Err(AppError::Validation(
            "origin and destination pharmacies must differ".to_string(),
        ));
    }

    for (label, id) in [("origin", origin), ("destination", destination)] {
        let known = pharmacy_repo::find_by_id(conn, id)?.is_some_and(|pharmacy| pharmacy.active);
        if !known {
            return Err(AppError::Validation(format!(
                "{label} pharmacy {id} not found or inactive"
            )));
        }
    }

    Ok((origin, destination))
}

pub fn list_log(
    state: &AppState,
    principal: &Principal,
    order_id: Uuid,
) -> Result<Vec<StatusLogEntry>, AppError> {
    let scope = visibility::courier_scope(principal);
    state.db.with_conn(|conn| {
        order_repo::find_by_id(conn, order_id, scope)?
            .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))?;
        log_repo::list_for_order(conn, order_id)
    })
}
