use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub booking_operations_total: IntCounterVec,
    pub active_bookings: IntGauge,
    pub ranking_requests_total: IntCounterVec,
    pub ranking_latency_seconds: HistogramVec,
    pub prediction_failures_total: IntCounter,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let booking_operations_total = IntCounterVec::new(
            Opts::new(
                "booking_operations_total",
                "Booking lifecycle operations by operation and outcome",
            ),
            &["operation", "outcome"],
        )?;

        let active_bookings = IntGauge::new(
            "active_bookings",
            "Bookings currently in a non-terminal state",
        )?;

        let ranking_requests_total = IntCounterVec::new(
            Opts::new("ranking_requests_total", "Ranking requests by outcome"),
            &["outcome"],
        )?;

        let ranking_latency_seconds = HistogramVec::new(
            HistogramOpts::new(
                "ranking_latency_seconds",
                "Latency of candidate ranking in seconds, prediction call included",
            ),
            &["outcome"],
        )?;

        let prediction_failures_total = IntCounter::new(
            "prediction_failures_total",
            "Failed calls to the compatibility prediction service",
        )?;

        registry.register(Box::new(booking_operations_total.clone()))?;
        registry.register(Box::new(active_bookings.clone()))?;
        registry.register(Box::new(ranking_requests_total.clone()))?;
        registry.register(Box::new(ranking_latency_seconds.clone()))?;
        registry.register(Box::new(prediction_failures_total.clone()))?;

        Ok(Self {
            registry,
            booking_operations_total,
            active_bookings,
            ranking_requests_total,
            ranking_latency_seconds,
            prediction_failures_total,
        })
    }

    pub fn record_booking_operation(&self, operation: &str, outcome: &str) {
        self.booking_operations_total
            .with_label_values(&[operation, outcome])
            .inc();
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
