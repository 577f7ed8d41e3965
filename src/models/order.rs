use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "high" => Some(Priority::High),
            "medium" => Some(Priority::Medium),
            "low" => Some(Priority::Low),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    HeldPrescription,
    Normal,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::HeldPrescription => "held_prescription",
            OrderType::Normal => "normal",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "held_prescription" => Some(OrderType::HeldPrescription),
            "normal" => Some(OrderType::Normal),
            _ => None,
        }
    }

    /// Priority applied when the caller does not supply one.
    pub fn default_priority(&self) -> Priority {
        match self {
            OrderType::HeldPrescription => Priority::High,
            OrderType::Normal => Priority::Medium,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    PrescriptionPickup,
    Transfer,
    Dispatch,
    ReDispatch,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::PrescriptionPickup => "prescription_pickup",
            OrderStatus::Transfer => "transfer",
            OrderStatus::Dispatch => "dispatch",
            OrderStatus::ReDispatch => "re_dispatch",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "prescription_pickup" => Some(OrderStatus::PrescriptionPickup),
            "transfer" => Some(OrderStatus::Transfer),
            "dispatch" => Some(OrderStatus::Dispatch),
            "re_dispatch" => Some(OrderStatus::ReDispatch),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub id: Uuid,
    pub client_name: String,
    pub client_address: String,
    pub client_phone: String,
    pub notes: String,
    pub priority: Priority,
    pub order_type: OrderType,
    pub status: OrderStatus,
    pub origin_pharmacy_id: Option<Uuid>,
    pub destination_pharmacy_id: Option<Uuid>,
    pub courier_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MedicineLine {
    pub id: Uuid,
    pub order_id: Uuid,
    pub code: String,
    pub name: String,
    pub quantity: u32,
    pub notes: String,
}
