use prometheus::{Encoder, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub offers_total: IntCounterVec,
    pub trip_transitions_total: IntCounterVec,
    pub open_shifts: IntGauge,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let offers_total = IntCounterVec::new(
            Opts::new("dispatch_offers_total", "Dispatch offers by outcome"),
            &["outcome"],
        )
        .expect("valid dispatch_offers_total metric");

        let trip_transitions_total = IntCounterVec::new(
            Opts::new("trip_transitions_total", "Trip transitions by target status"),
            &["status"],
        )
        .expect("valid trip_transitions_total metric");

        let open_shifts = IntGauge::new("open_shifts", "Driver shifts currently open")
            .expect("valid open_shifts metric");

        registry
            .register(Box::new(offers_total.clone()))
            .expect("register dispatch_offers_total");
        registry
            .register(Box::new(trip_transitions_total.clone()))
            .expect("register trip_transitions_total");
        registry
            .register(Box::new(open_shifts.clone()))
            .expect("register open_shifts");

        Self {
            registry,
            offers_total,
            trip_transitions_total,
            open_shifts,
        }
    }

    pub fn offer(&self, outcome: &str) {
        self.offers_total.with_label_values(&[outcome]).inc();
    }

    pub fn transition(&self, status: &str) {
        self.trip_transitions_total.with_label_values(&[status]).inc();
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
