pub mod dispatches;
pub mod orders;
pub mod pharmacies;
pub mod profiles;
pub mod reports;
pub mod routes;
pub mod vehicles;

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Json;
use axum::Router;
use serde::Serialize;
use tower_http::cors::CorsLayer;

use crate::error::AppError;
use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(orders::router())
        .merge(dispatches::router())
        .merge(vehicles::router())
        .merge(profiles::router())
        .merge(pharmacies::router())
        .merge(routes::router())
        .merge(reports::router())
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    orders: i64,
    profiles: i64,
    vehicles: i64,
}

async fn health(State(state): State<Arc<AppState>>) -> Result<Json<HealthResponse>, AppError> {
    let (orders, profiles, vehicles) = state.db.with_conn(|conn| {
        let count = |table: &str| -> Result<i64, AppError> {
            Ok(conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                row.get(0)
            })?)
        };
        Ok((count("orders")?, count("profiles")?, count("vehicles")?))
    })?;

    Ok(Json(HealthResponse {
        status: "ok",
        orders,
        profiles,
        vehicles,
    }))
}

async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, err).into_response(),
    }
}
