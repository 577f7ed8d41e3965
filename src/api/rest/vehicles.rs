use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::Principal;
use crate::error::AppError;
use crate::models::profile::UserProfile;
use crate::models::vehicle::{Vehicle, VehicleStatus};
use crate::ops::fleet;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/vehicles", post(create_vehicle).get(list_vehicles))
        .route("/api/vehicles/:id", get(get_vehicle).put(update_vehicle))
        .route("/api/vehicles/:id/assign", post(assign_vehicle))
        .route("/api/vehicles/:id/unassign", post(unassign_vehicle))
        .route("/api/vehicles/:id/maintenance", post(set_maintenance))
}

#[derive(Deserialize)]
pub struct CreateVehicleRequest {
    pub plate: String,
    pub make: String,
    pub model: String,
    pub year: i32,
    pub notes: Option<String>,
}

async fn create_vehicle(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Json(payload): Json<CreateVehicleRequest>,
) -> Result<(StatusCode, Json<Vehicle>), AppError> {
    let vehicle = fleet::create_vehicle(
        &state,
        &principal,
        fleet::NewVehicle {
            plate: payload.plate,
            make: payload.make,
            model: payload.model,
            year: payload.year,
            notes: payload.notes,
        },
    )?;
    Ok((StatusCode::CREATED, Json(vehicle)))
}

#[derive(Deserialize)]
pub struct VehicleListQuery {
    pub status: Option<String>,
    pub active: Option<bool>,
}

async fn list_vehicles(
    State(state): State<Arc<AppState>>,
    _principal: Principal,
    Query(query): Query<VehicleListQuery>,
) -> Result<Json<Vec<Vehicle>>, AppError> {
    let status = query
        .status
        .map(|raw| {
            VehicleStatus::parse(&raw)
                .ok_or_else(|| AppError::Validation(format!("invalid status: {raw}")))
        })
        .transpose()?;

    Ok(Json(fleet::list_vehicles(&state, status, query.active)?))
}

async fn get_vehicle(
    State(state): State<Arc<AppState>>,
    _principal: Principal,
    Path(id): Path<Uuid>,
) -> Result<Json<Vehicle>, AppError> {
    Ok(Json(fleet::get_vehicle(&state, id)?))
}

#[derive(Deserialize)]
pub struct UpdateVehicleRequest {
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    pub active: Option<bool>,
    pub notes: Option<String>,
}

async fn update_vehicle(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateVehicleRequest>,
) -> Result<Json<Vehicle>, AppError> {
    let vehicle = fleet::update_vehicle(
        &state,
        &principal,
        id,
        fleet::VehicleChanges {
            make: payload.make,
            model: payload.model,
            year: payload.year,
            active: payload.active,
            notes: payload.notes,
        },
    )?;
    Ok(Json(vehicle))
}

#[derive(Deserialize)]
pub struct AssignVehicleRequest {
    pub courier_id: Uuid,
}

#[derive(Serialize)]
struct AssignmentResponse {
    vehicle: Vehicle,
    courier: UserProfile,
}

async fn assign_vehicle(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<Uuid>,
    Json(payload): Json<AssignVehicleRequest>,
) -> Result<Json<AssignmentResponse>, AppError> {
    let (vehicle, courier) = fleet::assign_vehicle(&state, &principal, id, payload.courier_id)?;
    Ok(Json(AssignmentResponse { vehicle, courier }))
}

async fn unassign_vehicle(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> Result<Json<Vehicle>, AppError> {
    Ok(Json(fleet::unassign_vehicle(&state, &principal, id)?))
}

#[derive(Deserialize)]
pub struct MaintenanceRequest {
    pub last_maintenance: Option<NaiveDate>,
    pub next_maintenance: Option<NaiveDate>,
    pub notes: Option<String>,
}

async fn set_maintenance(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<Uuid>,
    Json(payload): Json<MaintenanceRequest>,
) -> Result<Json<Vehicle>, AppError> {
    let vehicle = fleet::set_maintenance(
        &state,
        &principal,
        id,
        fleet::MaintenanceInput {
            last_maintenance: payload.last_maintenance,
            next_maintenance: payload.next_maintenance,
            notes: payload.notes,
        },
    )?;
    Ok(Json(vehicle))
}
