use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::order::OrderStatus;

/// Append-only audit record. Written on every status transition and
/// every recorded delivery attempt; there is no update or delete path.
#[derive(Debug, Clone, Serialize)]
pub struct StatusLogEntry {
    pub id: Uuid,
    pub order_id: Uuid,
    pub status: OrderStatus,
    pub description: String,
    pub courier_id: Option<Uuid>,
    pub attempt_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}
