use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::Principal;
use crate::db::pharmacy_repo;
use crate::error::AppError;
use crate::models::pharmacy::Pharmacy;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/pharmacies", post(create_pharmacy).get(list_pharmacies))
        .route("/api/pharmacies/:id", get(get_pharmacy).put(update_pharmacy))
}

#[derive(Deserialize)]
pub struct CreatePharmacyRequest {
    pub name: String,
    pub address: String,
    pub city: String,
}

async fn create_pharmacy(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Json(payload): Json<CreatePharmacyRequest>,
) -> Result<(StatusCode, Json<Pharmacy>), AppError> {
    if !principal.is_staff() {
        return Err(AppError::Permission(
            "only a coordinator or administrator may register pharmacies".to_string(),
        ));
    }
    if payload.name.trim().is_empty() {
        return Err(AppError::Validation("name cannot be empty".to_string()));
    }

    let pharmacy = Pharmacy {
        id: Uuid::new_v4(),
        name: payload.name.trim().to_string(),
        address: payload.address,
        city: payload.city,
        active: true,
        created_at: Utc::now(),
    };
    state
        .db
        .with_conn(|conn| pharmacy_repo::insert(conn, &pharmacy))?;

    Ok((StatusCode::CREATED, Json(pharmacy)))
}

#[derive(Deserialize)]
pub struct PharmacyListQuery {
    pub city: Option<String>,
    pub active: Option<bool>,
}

async fn list_pharmacies(
    State(state): State<Arc<AppState>>,
    _principal: Principal,
    Query(query): Query<PharmacyListQuery>,
) -> Result<Json<Vec<Pharmacy>>, AppError> {
    let pharmacies = state
        .db
        .with_conn(|conn| pharmacy_repo::list(conn, query.city.as_deref(), query.active))?;
    Ok(Json(pharmacies))
}

async fn get_pharmacy(
    State(state): State<Arc<AppState>>,
    _principal: Principal,
    Path(id): Path<Uuid>,
) -> Result<Json<Pharmacy>, AppError> {
    let pharmacy = state
        .db
        .with_conn(|conn| pharmacy_repo::find_by_id(conn, id))?
        .ok_or_else(|| AppError::NotFound(format!("pharmacy {id} not found")))?;
    Ok(Json(pharmacy))
}

#[derive(Deserialize)]
pub struct UpdatePharmacyRequest {
    pub name: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub active: Option<bool>,
}

async fn update_pharmacy(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdatePharmacyRequest>,
) -> Result<Json<Pharmacy>, AppError> {
    if !principal.is_staff() {
        return Err(AppError::Permission(
            "only a coordinator or administrator may edit pharmacies".to_string(),
        ));
    }

    let pharmacy = state.db.with_tx(|tx| {
        pharmacy_repo::find_by_id(tx, id)?
            .ok_or_else(|| AppError::NotFound(format!("pharmacy {id} not found")))?;

        pharmacy_repo::update_fields(
            tx,
            id,
            payload.name.as_deref(),
            payload.address.as_deref(),
            payload.city.as_deref(),
            payload.active,
        )?;

        pharmacy_repo::find_by_id(tx, id)?
            .ok_or_else(|| AppError::Internal("pharmacy vanished during update".to_string()))
    })?;
    Ok(Json(pharmacy))
}
