use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct Pharmacy {
    pub id: Uuid,
    pub name: String,
    pub address: String,
    pub city: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}
