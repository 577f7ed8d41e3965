use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Coordinator,
    Courier,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Coordinator => "coordinator",
            Role::Courier => "courier",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "admin" => Some(Role::Admin),
            "coordinator" => Some(Role::Coordinator),
            "courier" => Some(Role::Courier),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ShiftState {
    Available,
    Busy,
    OnBreak,
}

impl ShiftState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShiftState::Available => "available",
            ShiftState::Busy => "busy",
            ShiftState::OnBreak => "on_break",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "available" => Some(ShiftState::Available),
            "busy" => Some(ShiftState::Busy),
            "on_break" => Some(ShiftState::OnBreak),
            _ => None,
        }
    }
}

/// Identity record. Authentication resolves a username to one of these;
/// an unknown username is an unauthenticated request.
#[derive(Debug, Clone, Serialize)]
pub struct Account {
    pub id: Uuid,
    pub username: String,
    pub full_name: String,
    pub is_admin: bool,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// Operational profile, one per account. `username`, `full_name` and
/// `is_admin` are read from the joined account row.
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub account_id: Uuid,
    pub username: String,
    pub full_name: String,
    pub is_admin: bool,
    pub phone: String,
    pub role: Role,
    pub shift_state: ShiftState,
    pub break_started_at: Option<DateTime<Utc>>,
    pub vehicle_id: Option<Uuid>,
    pub photo_path: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}
