use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::Principal;
use crate::db::order_repo::OrderFilter;
use crate::error::AppError;
use crate::models::log::StatusLogEntry;
use crate::models::order::{MedicineLine, Order, OrderStatus, OrderType, Priority};
use crate::ops::{dispatch, orders, status};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/orders", post(create_order).get(list_orders))
        .route(
            "/api/orders/:id",
            get(get_order).put(update_order).delete(delete_order),
        )
        .route("/api/orders/:id/status", post(change_status))
        .route("/api/orders/:id/courier", post(assign_courier))
        .route(
            "/api/orders/:id/attempts",
            post(record_attempt).get(list_attempts),
        )
        .route("/api/orders/:id/log", get(list_log))
        .route(
            "/api/orders/:id/medicines",
            post(add_medicine).get(list_medicines),
        )
        .route("/api/orders/:id/medicines/:line_id", axum::routing::delete(remove_medicine))
}

#[derive(Deserialize)]
pub struct MedicineLineRequest {
    pub code: String,
    pub name: String,
    pub quantity: u32,
    pub notes: Option<String>,
}

impl From<MedicineLineRequest> for orders::NewMedicineLine {
    fn from(request: MedicineLineRequest) -> Self {
        Self {
            code: request.code,
            name: request.name,
            quantity: request.quantity,
            notes: request.notes,
        }
    }
}

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub client_name: String,
    pub client_address: String,
    pub client_phone: Option<String>,
    pub notes: Option<String>,
    pub priority: Option<Priority>,
    pub order_type: Option<OrderType>,
    pub status: Option<OrderStatus>,
    pub origin_pharmacy_id: Option<Uuid>,
    pub destination_pharmacy_id: Option<Uuid>,
    pub courier_id: Option<Uuid>,
    #[serde(default)]
    pub medicines: Vec<MedicineLineRequest>,
}

async fn create_order(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<Order>), AppError> {
    let order = orders::create_order(
        &state,
        &principal,
        orders::NewOrder {
            client_name: payload.client_name,
            client_address: payload.client_address,
            client_phone: payload.client_phone,
            notes: payload.notes,
            priority: payload.priority,
            order_type: payload.order_type,
            status: payload.status,
            origin_pharmacy_id: payload.origin_pharmacy_id,
            destination_pharmacy_id: payload.destination_pharmacy_id,
            courier_id: payload.courier_id,
            medicines: payload.medicines.into_iter().map(Into::into).collect(),
        },
    )?;

    Ok((StatusCode::CREATED, Json(order)))
}

#[derive(Deserialize)]
pub struct OrderListQuery {
    pub status: Option<String>,
    pub priority: Option<String>,
    pub search: Option<String>,
}

async fn list_orders(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Query(query): Query<OrderListQuery>,
) -> Result<Json<Vec<Order>>, AppError> {
    let status = query
        .status
        .map(|raw| {
            OrderStatus::parse(&raw)
                .ok_or_else(|| AppError::Validation(format!("invalid status: {raw}")))
        })
        .transpose()?;
    let priority = query
        .priority
        .map(|raw| {
            Priority::parse(&raw)
                .ok_or_else(|| AppError::Validation(format!("invalid priority: {raw}")))
        })
        .transpose()?;

    let filter = OrderFilter {
        status,
        priority,
        search: query.search,
    };
    Ok(Json(orders::list_orders(&state, &principal, &filter)?))
}

async fn get_order(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    Ok(Json(orders::get_order(&state, &principal, id)?))
}

#[derive(Deserialize)]
pub struct UpdateOrderRequest {
    pub client_name: Option<String>,
    pub client_address: Option<String>,
    pub client_phone: Option<String>,
    pub notes: Option<String>,
    pub priority: Option<Priority>,
    pub order_type: Option<OrderType>,
}

async fn update_order(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateOrderRequest>,
) -> Result<Json<Order>, AppError> {
    let order = orders::update_order(
        &state,
        &principal,
        id,
        orders::OrderChanges {
            client_name: payload.client_name,
            client_address: payload.client_address,
            client_phone: payload.client_phone,
            notes: payload.notes,
            priority: payload.priority,
            order_type: payload.order_type,
        },
    )?;
    Ok(Json(order))
}

async fn delete_order(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    orders::delete_order(&state, &principal, id)?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
pub struct ChangeStatusRequest {
    pub status: String,
    pub description: Option<String>,
    pub origin_pharmacy_id: Option<Uuid>,
    pub destination_pharmacy_id: Option<Uuid>,
}

async fn change_status(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<Uuid>,
    Json(payload): Json<ChangeStatusRequest>,
) -> Result<Json<Order>, AppError> {
    let order = status::change_status(
        &state,
        &principal,
        id,
        status::StatusChange {
            status: payload.status,
            description: payload.description,
            origin_pharmacy_id: payload.origin_pharmacy_id,
            destination_pharmacy_id: payload.destination_pharmacy_id,
        },
    )?;
    Ok(Json(order))
}

#[derive(Deserialize)]
pub struct AssignCourierRequest {
    pub courier_id: Uuid,
}

async fn assign_courier(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<Uuid>,
    Json(payload): Json<AssignCourierRequest>,
) -> Result<Json<Order>, AppError> {
    Ok(Json(orders::assign_courier(
        &state,
        &principal,
        id,
        payload.courier_id,
    )?))
}

#[derive(Deserialize)]
pub struct RecordAttemptRequest {
    pub outcome: String,
    pub courier_id: Option<Uuid>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub photo_path: Option<String>,
    pub notes: Option<String>,
}

async fn record_attempt(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<Uuid>,
    Json(payload): Json<RecordAttemptRequest>,
) -> Result<(StatusCode, Json<crate::models::attempt::DeliveryAttempt>), AppError> {
    let attempt = dispatch::record_attempt(
        &state,
        &principal,
        id,
        dispatch::AttemptInput {
            outcome: payload.outcome,
            courier_id: payload.courier_id,
            lat: payload.lat,
            lng: payload.lng,
            photo_path: payload.photo_path,
            notes: payload.notes,
        },
    )?;

    Ok((StatusCode::CREATED, Json(attempt)))
}

async fn list_attempts(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<crate::models::attempt::DeliveryAttempt>>, AppError> {
    Ok(Json(dispatch::list_for_order(&state, &principal, id)?))
}

async fn list_log(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<StatusLogEntry>>, AppError> {
    Ok(Json(status::list_log(&state, &principal, id)?))
}

async fn add_medicine(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<Uuid>,
    Json(payload): Json<MedicineLineRequest>,
) -> Result<(StatusCode, Json<MedicineLine>), AppError> {
    let medicine = orders::add_medicine(&state, &principal, id, payload.into())?;
    Ok((StatusCode::CREATED, Json(medicine)))
}

async fn list_medicines(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<MedicineLine>>, AppError> {
    Ok(Json(orders::list_medicines(&state, &principal, id)?))
}

async fn remove_medicine(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path((id, line_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    orders::remove_medicine(&state, &principal, id, line_id)?;
    Ok(StatusCode::NO_CONTENT)
}
