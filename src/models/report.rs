use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

/// One aggregate row per calendar date. `success_rate` is derived from
/// the stored counts on load, never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct DailyReport {
    pub date: NaiveDate,
    pub total_deliveries: u32,
    pub successful_deliveries: u32,
    pub failed_deliveries: u32,
    pub success_rate: f64,
    pub notes: String,
    pub created_at: DateTime<Utc>,
}

impl DailyReport {
    pub fn compute_rate(successful: u32, total: u32) -> f64 {
        if total > 0 {
            f64::from(successful) / f64::from(total) * 100.0
        } else {
            0.0
        }
    }
}
