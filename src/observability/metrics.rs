use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub status_changes_total: IntCounterVec,
    pub delivery_attempts_total: IntCounterVec,
    pub vehicle_assignments_total: IntCounter,
    pub vehicles_in_use: IntGauge,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let status_changes_total = IntCounterVec::new(
            Opts::new("status_changes_total", "Order status transitions by new status"),
            &["status"],
        )
        .expect("valid status_changes_total metric");

        let delivery_attempts_total = IntCounterVec::new(
            Opts::new("delivery_attempts_total", "Recorded delivery attempts by outcome"),
            &["outcome"],
        )
        .expect("valid delivery_attempts_total metric");

        let vehicle_assignments_total = IntCounter::new(
            "vehicle_assignments_total",
            "Total vehicle-to-courier assignments",
        )
        .expect("valid vehicle_assignments_total metric");

        let vehicles_in_use = IntGauge::new("vehicles_in_use", "Vehicles currently held by a courier")
            .expect("valid vehicles_in_use metric");

        registry
            .register(Box::new(status_changes_total.clone()))
            .expect("register status_changes_total");
        registry
            .register(Box::new(delivery_attempts_total.clone()))
            .expect("register delivery_attempts_total");
        registry
            .register(Box::new(vehicle_assignments_total.clone()))
            .expect("register vehicle_assignments_total");
        registry
            .register(Box::new(vehicles_in_use.clone()))
            .expect("register vehicles_in_use");

        Self {
            registry,
            status_changes_total,
            delivery_attempts_total,
            vehicle_assignments_total,
            vehicles_in_use,
        }
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
