use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// `Pending` is part of the stored enumeration but is not a recordable
/// outcome; recording rejects it and it carries no side effects.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    Delivered,
    Unavailable,
    Error,
    Pending,
}

impl AttemptOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptOutcome::Delivered => "delivered",
            AttemptOutcome::Unavailable => "unavailable",
            AttemptOutcome::Error => "error",
            AttemptOutcome::Pending => "pending",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "delivered" => Some(AttemptOutcome::Delivered),
            "unavailable" => Some(AttemptOutcome::Unavailable),
            "error" => Some(AttemptOutcome::Error),
            "pending" => Some(AttemptOutcome::Pending),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AttemptLabel {
    Dispatch,
    ReDispatch,
}

impl AttemptLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptLabel::Dispatch => "dispatch",
            AttemptLabel::ReDispatch => "re_dispatch",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "dispatch" => Some(AttemptLabel::Dispatch),
            "re_dispatch" => Some(AttemptLabel::ReDispatch),
            _ => None,
        }
    }
}

/// One dispatch try for an order. `seq` is assigned per order, gapless
/// from 1; the attempt is immutable once the outcome is recorded except
/// for the supplementary fields (photo, notes, coordinates).
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryAttempt {
    pub id: Uuid,
    pub order_id: Uuid,
    pub seq: u32,
    pub courier_id: Option<Uuid>,
    pub label: AttemptLabel,
    pub outcome: AttemptOutcome,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub photo_path: Option<String>,
    pub notes: String,
    pub recorded_at: DateTime<Utc>,
}
