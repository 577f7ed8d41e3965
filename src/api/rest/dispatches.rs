use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::Json;
use axum::Router;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::Principal;
use crate::error::AppError;
use crate::models::attempt::{AttemptOutcome, DeliveryAttempt};
use crate::ops::dispatch;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/attempts", get(list_latest))
        .route("/api/attempts/:id", get(get_attempt).patch(update_extras))
}

#[derive(Serialize)]
struct LatestAttemptResponse {
    #[serde(flatten)]
    attempt: DeliveryAttempt,
    total_attempts: u32,
}

#[derive(Deserialize)]
pub struct AttemptListQuery {
    pub outcome: Option<String>,
}

/// Latest attempt per order, resolved by sequence number.
async fn list_latest(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Query(query): Query<AttemptListQuery>,
) -> Result<Json<Vec<LatestAttemptResponse>>, AppError> {
    let outcome = query
        .outcome
        .map(|raw| {
            AttemptOutcome::parse(&raw)
                .ok_or_else(|| AppError::Validation(format!("invalid outcome: {raw}")))
        })
        .transpose()?;

    let latest = dispatch::list_latest(&state, &principal, outcome)?
        .into_iter()
        .map(|entry| LatestAttemptResponse {
            attempt: entry.attempt,
            total_attempts: entry.total_attempts,
        })
        .collect();
    Ok(Json(latest))
}

async fn get_attempt(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> Result<Json<DeliveryAttempt>, AppError> {
    Ok(Json(dispatch::get_attempt(&state, &principal, id)?))
}

#[derive(Deserialize)]
pub struct AttemptExtrasRequest {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub photo_path: Option<String>,
    pub notes: Option<String>,
}

async fn update_extras(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<Uuid>,
    Json(payload): Json<AttemptExtrasRequest>,
) -> Result<Json<DeliveryAttempt>, AppError> {
    let attempt = dispatch::update_extras(
        &state,
        &principal,
        id,
        dispatch::AttemptExtras {
            lat: payload.lat,
            lng: payload.lng,
            photo_path: payload.photo_path,
            notes: payload.notes,
        },
    )?;
    Ok(Json(attempt))
}
