use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::Json;
use axum::Router;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::Principal;
use crate::db::{order_repo, route_repo};
use crate::error::AppError;
use crate::models::route::Route;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/routes", post(create_route).get(list_routes))
        .route("/api/routes/:id", get(get_route).put(update_route))
        .route("/api/routes/:id/orders", put(set_orders))
}

fn require_staff(principal: &Principal) -> Result<(), AppError> {
    if !principal.is_staff() {
        return Err(AppError::Permission(
            "only a coordinator or administrator may manage routes".to_string(),
        ));
    }
    Ok(())
}

#[derive(Deserialize)]
pub struct CreateRouteRequest {
    pub name: String,
    pub description: Option<String>,
    pub zone: String,
    pub vehicle_label: Option<String>,
    pub courier_id: Option<Uuid>,
    #[serde(default)]
    pub order_ids: Vec<Uuid>,
}

async fn create_route(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Json(payload): Json<CreateRouteRequest>,
) -> Result<(StatusCode, Json<Route>), AppError> {
    require_staff(&principal)?;
    if payload.name.trim().is_empty() {
        return Err(AppError::Validation("name cannot be empty".to_string()));
    }

    let route = state.db.with_tx(|tx| {
        for order_id in &payload.order_ids {
            order_repo::find_by_id(tx, *order_id, None)?
                .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))?;
        }

        let route = Route {
            id: Uuid::new_v4(),
            name: payload.name.trim().to_string(),
            description: payload.description.clone().unwrap_or_default(),
            zone: payload.zone.clone(),
            vehicle_label: payload.vehicle_label.clone().unwrap_or_default(),
            courier_id: payload.courier_id,
            active: true,
            order_ids: payload.order_ids.clone(),
            created_at: Utc::now(),
        };
        route_repo::insert(tx, &route)?;
        Ok(route)
    })?;

    Ok((StatusCode::CREATED, Json(route)))
}

#[derive(Deserialize)]
pub struct RouteListQuery {
    pub zone: Option<String>,
    pub active: Option<bool>,
}

async fn list_routes(
    State(state): State<Arc<AppState>>,
    _principal: Principal,
    Query(query): Query<RouteListQuery>,
) -> Result<Json<Vec<Route>>, AppError> {
    let routes = state
        .db
        .with_conn(|conn| route_repo::list(conn, query.zone.as_deref(), query.active))?;
    Ok(Json(routes))
}

async fn get_route(
    State(state): State<Arc<AppState>>,
    _principal: Principal,
    Path(id): Path<Uuid>,
) -> Result<Json<Route>, AppError> {
    let route = state
        .db
        .with_conn(|conn| route_repo::find_by_id(conn, id))?
        .ok_or_else(|| AppError::NotFound(format!("route {id} not found")))?;
    Ok(Json(route))
}

#[derive(Deserialize)]
pub struct UpdateRouteRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub zone: Option<String>,
    pub vehicle_label: Option<String>,
    pub courier_id: Option<Uuid>,
    pub active: Option<bool>,
}

async fn update_route(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateRouteRequest>,
) -> Result<Json<Route>, AppError> {
    require_staff(&principal)?;

    let route = state.db.with_tx(|tx| {
        route_repo::find_by_id(tx, id)?
            .ok_or_else(|| AppError::NotFound(format!("route {id} not found")))?;

        route_repo::update_fields(
            tx,
            id,
            payload.name.as_deref(),
            payload.description.as_deref(),
            payload.zone.as_deref(),
            payload.vehicle_label.as_deref(),
            payload.courier_id,
            payload.active,
        )?;

        route_repo::find_by_id(tx, id)?
            .ok_or_else(|| AppError::Internal("route vanished during update".to_string()))
    })?;
    Ok(Json(route))
}

#[derive(Deserialize)]
pub struct SetOrdersRequest {
    pub order_ids: Vec<Uuid>,
}

/// Replaces the route's order membership.
async fn set_orders(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<Uuid>,
    Json(payload): Json<SetOrdersRequest>,
) -> Result<Json<Route>, AppError> {
    require_staff(&principal)?;

    let route = state.db.with_tx(|tx| {
        route_repo::find_by_id(tx, id)?
            .ok_or_else(|| AppError::NotFound(format!("route {id} not found")))?;

        for order_id in &payload.order_ids {
            order_repo::find_by_id(tx, *order_id, None)?
                .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))?;
        }

        route_repo::set_orders(tx, id, &payload.order_ids)?;
        route_repo::find_by_id(tx, id)?
            .ok_or_else(|| AppError::Internal("route vanished during update".to_string()))
    })?;
    Ok(Json(route))
}
