use crate::db::Database;
use crate::observability::metrics::Metrics;

pub struct AppState {
    pub db: Database,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            metrics: Metrics::new(),
        }
    }
}
