use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VehicleStatus {
    Available,
    InUse,
    Maintenance,
    OutOfService,
}

impl VehicleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleStatus::Available => "available",
            VehicleStatus::InUse => "in_use",
            VehicleStatus::Maintenance => "maintenance",
            VehicleStatus::OutOfService => "out_of_service",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "available" => Some(VehicleStatus::Available),
            "in_use" => Some(VehicleStatus::InUse),
            "maintenance" => Some(VehicleStatus::Maintenance),
            "out_of_service" => Some(VehicleStatus::OutOfService),
            _ => None,
        }
    }
}

/// `assigned_courier_id` is not a column; the holder is derived on read
/// from the profile that links to the vehicle.
#[derive(Debug, Clone, Serialize)]
pub struct Vehicle {
    pub id: Uuid,
    pub plate: String,
    pub make: String,
    pub model: String,
    pub year: i32,
    pub status: VehicleStatus,
    pub active: bool,
    pub last_maintenance: Option<NaiveDate>,
    pub next_maintenance: Option<NaiveDate>,
    pub notes: String,
    pub assigned_courier_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}
