use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Flat grouping of orders for a zone. No path computation happens here.
#[derive(Debug, Clone, Serialize)]
pub struct Route {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub zone: String,
    pub vehicle_label: String,
    pub courier_id: Option<Uuid>,
    pub active: bool,
    pub order_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}
