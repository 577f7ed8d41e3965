use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::Principal;
use crate::db::profile_repo::ProfileFilter;
use crate::error::AppError;
use crate::models::profile::{Role, UserProfile};
use crate::ops::{profiles, shift};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/profiles", post(create_profile).get(list_profiles))
        .route("/api/profiles/:id", get(get_profile).patch(update_profile))
        .route("/api/profiles/:id/shift", post(change_shift))
        .route("/api/couriers", get(courier_pool))
}

#[derive(Deserialize)]
pub struct CreateProfileRequest {
    pub username: String,
    pub full_name: Option<String>,
    #[serde(default)]
    pub is_admin: bool,
    pub phone: Option<String>,
    pub role: Option<Role>,
}

async fn create_profile(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Json(payload): Json<CreateProfileRequest>,
) -> Result<(StatusCode, Json<UserProfile>), AppError> {
    let profile = profiles::create_account(
        &state,
        &principal,
        profiles::NewAccount {
            username: payload.username,
            full_name: payload.full_name,
            is_admin: payload.is_admin,
            phone: payload.phone,
            role: payload.role,
        },
    )?;
    Ok((StatusCode::CREATED, Json(profile)))
}

#[derive(Deserialize)]
pub struct ProfileListQuery {
    pub role: Option<String>,
    pub active: Option<bool>,
}

async fn list_profiles(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Query(query): Query<ProfileListQuery>,
) -> Result<Json<Vec<UserProfile>>, AppError> {
    let role = query
        .role
        .map(|raw| {
            Role::parse(&raw).ok_or_else(|| AppError::Validation(format!("invalid role: {raw}")))
        })
        .transpose()?;

    let filter = ProfileFilter {
        role,
        active: query.active,
    };
    Ok(Json(profiles::list_profiles(&state, &principal, &filter)?))
}

async fn get_profile(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> Result<Json<UserProfile>, AppError> {
    Ok(Json(profiles::get_profile(&state, &principal, id)?))
}

#[derive(Deserialize)]
pub struct UpdateProfileRequest {
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub role: Option<Role>,
    pub active: Option<bool>,
    pub photo_path: Option<String>,
}

async fn update_profile(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<UserProfile>, AppError> {
    let profile = profiles::update_profile(
        &state,
        &principal,
        id,
        profiles::ProfileChanges {
            full_name: payload.full_name,
            phone: payload.phone,
            role: payload.role,
            active: payload.active,
            photo_path: payload.photo_path,
        },
    )?;
    Ok(Json(profile))
}

#[derive(Deserialize)]
pub struct ShiftRequest {
    pub shift_state: String,
}

#[derive(Serialize)]
struct ShiftResponse {
    profile: UserProfile,
    break_expired: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    remaining_minutes: Option<i64>,
}

async fn change_shift(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<Uuid>,
    Json(payload): Json<ShiftRequest>,
) -> Result<Json<ShiftResponse>, AppError> {
    let requested = crate::models::profile::ShiftState::parse(&payload.shift_state)
        .ok_or_else(|| {
            AppError::Validation(format!("invalid shift state: {}", payload.shift_state))
        })?;

    let change = shift::change_shift(&state, &principal, id, requested, Utc::now())?;
    Ok(Json(ShiftResponse {
        profile: change.profile,
        break_expired: change.break_expired,
        remaining_minutes: change.remaining_minutes,
    }))
}

/// The assignable courier pool; admin accounts never show up here.
async fn courier_pool(
    State(state): State<Arc<AppState>>,
    principal: Principal,
) -> Result<Json<Vec<UserProfile>>, AppError> {
    if !principal.is_staff() {
        return Err(AppError::Permission(
            "only a coordinator or administrator may list the courier pool".to_string(),
        ));
    }
    Ok(Json(profiles::courier_pool(&state)?))
}
