//! Delivery-attempt recording. Sequence assignment, the attempt insert,
//! the order status update and the audit entry all commit together; the
//! connection lock serializes concurrent attempts for the same order.

use chrono::Utc;
use uuid::Uuid;

use crate::auth::Principal;
use crate::db::attempt_repo::{self, LatestAttempt};
use crate::db::{log_repo, order_repo};
use crate::error::AppError;
use crate::models::attempt::{AttemptLabel, AttemptOutcome, DeliveryAttempt};
use crate::models::log::StatusLogEntry;
use crate::models::order::OrderStatus;
use crate::ops::visibility;
use crate::state::AppState;

pub struct AttemptInput {
    /// Outcome as supplied by the caller; parsed against the recordable
    /// subset here.
    pub outcome: String,
    pub courier_id: Option<Uuid>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub photo_path: Option<String>,
    pub notes: Option<String>,
}

pub fn record_attempt(
    state: &AppState,
    principal: &Principal,
    order_id: Uuid,
    input: AttemptInput,
) -> Result<DeliveryAttempt, AppError> {
    let outcome = AttemptOutcome::parse(&input.outcome)
        .ok_or_else(|| AppError::Validation(format!("invalid outcome: {}", input.outcome)))?;
    if outcome == AttemptOutcome::Pending {
        // Reserved value: nothing transitions on it.
        return Err(AppError::Validation(
            "pending is not a recordable outcome".to_string(),
        ));
    }

    let scope = visibility::courier_scope(principal);

    let attempt = state.db.with_tx(|tx| {
        let order = order_repo::find_by_id(tx, order_id, scope)?
            .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))?;

        // Couriers record as themselves; staff may name the courier and
        // otherwise the order's responsible is credited.
        let courier_id = if principal.is_courier() {
            Some(principal.profile.id)
        } else {
            input.courier_id.or(order.courier_id)
        };

        let seq = attempt_repo::next_seq(tx, order_id)?;
        let label = if seq == 1 {
            AttemptLabel::Dispatch
        } else {
            AttemptLabel::ReDispatch
        };

        let now = Utc::now();
        let attempt = DeliveryAttempt {
            id: Uuid::new_v4(),
            order_id,
            seq,
            courier_id,
            label,
            outcome,
            lat: input.lat,
            lng: input.lng,
            photo_path: input.photo_path.clone(),
            notes: input.notes.clone().unwrap_or_default(),
            recorded_at: now,
        };
        attempt_repo::insert(tx, &attempt)?;

        let new_status = if outcome == AttemptOutcome::Delivered {
            OrderStatus::Dispatch
        } else {
            OrderStatus::ReDispatch
        };
        order_repo::set_status(
            tx,
            order_id,
            new_status,
            order.origin_pharmacy_id,
            order.destination_pharmacy_id,
            now,
        )?;

        log_repo::append(
            tx,
            &StatusLogEntry {
                id: Uuid::new_v4(),
                order_id,
                status: new_status,
                description: format!("attempt #{seq}: {}", outcome.as_str()),
                courier_id,
                attempt_id: Some(attempt.id),
                created_at: now,
            },
        )?;

        Ok(attempt)
    })?;

    state
        .metrics
        .delivery_attempts_total
        .with_label_values(&[outcome.as_str()])
        .inc();
    tracing::info!(
        order_id = %order_id,
        seq = attempt.seq,
        outcome = outcome.as_str(),
        "delivery attempt recorded"
    );

    Ok(attempt)
}

pub fn list_for_order(
    state: &AppState,
    principal: &Principal,
    order_id: Uuid,
) -> Result<Vec<DeliveryAttempt>, AppError> {
    let scope = visibility::courier_scope(principal);
    state.db.with_conn(|conn| {
        order_repo::find_by_id(conn, order_id, scope)?
            .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))?;
        attempt_repo::list_for_order(conn, order_id)
    })
}

/// The dispatch overview: for every order with attempts, the attempt
/// with the highest sequence number plus the order's attempt count.
pub fn list_latest(
    state: &AppState,
    principal: &Principal,
    outcome: Option<AttemptOutcome>,
) -> Result<Vec<LatestAttempt>, AppError> {
    let scope = visibility::courier_scope(principal);
    state
        .db
        .with_conn(|conn| attempt_repo::list_latest(conn, outcome, scope))
}

pub fn get_attempt(
    state: &AppState,
    principal: &Principal,
    attempt_id: Uuid,
) -> Result<DeliveryAttempt, AppError> {
    let scope = visibility::courier_scope(principal);
    state
        .db
        .with_conn(|conn| attempt_repo::find_by_id(conn, attempt_id, scope))?
        .ok_or_else(|| AppError::NotFound(format!("attempt {attempt_id} not found")))
}

pub struct AttemptExtras {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub photo_path: Option<String>,
    pub notes: Option<String>,
}

/// Supplementary fields only; the recorded outcome and sequence are
/// immutable.
pub fn update_extras(
    state: &AppState,
    principal: &Principal,
    attempt_id: Uuid,
    extras: AttemptExtras,
) -> Result<DeliveryAttempt, AppError> {
    let scope = visibility::courier_scope(principal);
    state.db.with_tx(|tx| {
        attempt_repo::find_by_id(tx, attempt_id, scope)?
            .ok_or_else(|| AppError::NotFound(format!("attempt {attempt_id} not found")))?;

        attempt_repo::update_extras(
            tx,
            attempt_id,
            extras.lat,
            extras.lng,
            extras.photo_path.as_deref(),
            extras.notes.as_deref(),
        )?;

        attempt_repo::find_by_id(tx, attempt_id, scope)?
            .ok_or_else(|| AppError::Internal("attempt vanished during update".to_string()))
    })
}
