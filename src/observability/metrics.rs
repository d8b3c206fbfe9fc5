use prometheus::core::Collector;
use prometheus::{
    Encoder, GaugeVec, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

/// Dispatch counters and gauges, all registered on one private registry.
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    /// Labelled `success` or `unassigned`.
    pub assignments_total: IntCounterVec,
    pub orders_in_queue: IntGauge,
    pub assignment_latency_seconds: HistogramVec,
    /// Held orders over capacity; a volunteer is either 0 or 1.
    pub carrier_utilization: GaugeVec,
    /// Labelled `commercial` or `volunteer`.
    pub deliveries_total: IntCounterVec,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let assignments_total = register(
            &registry,
            IntCounterVec::new(
                Opts::new(
                    "assignments_total",
                    "Orders handled by the dispatch loop, by whether a carrier took them",
                ),
                &["outcome"],
            )
            .expect("valid assignments_total metric"),
        );

        let orders_in_queue = register(
            &registry,
            IntGauge::new(
                "orders_in_queue",
                "Pending orders queued but not yet offered to any carrier",
            )
            .expect("valid orders_in_queue metric"),
        );

        let assignment_latency_seconds = register(
            &registry,
            HistogramVec::new(
                HistogramOpts::new(
                    "assignment_latency_seconds",
                    "Seconds spent ranking carriers and committing one order",
                ),
                &["outcome"],
            )
            .expect("valid assignment_latency_seconds metric"),
        );

        let carrier_utilization = register(
            &registry,
            GaugeVec::new(
                Opts::new(
                    "carrier_utilization",
                    "Share of a carrier's pickup capacity taken by orders in transit",
                ),
                &["carrier_id"],
            )
            .expect("valid carrier_utilization metric"),
        );

        let deliveries_total = register(
            &registry,
            IntCounterVec::new(
                Opts::new(
                    "deliveries_total",
                    "Orders marked delivered, by commercial or volunteer carrier",
                ),
                &["carrier_kind"],
            )
            .expect("valid deliveries_total metric"),
        );

        Self {
            registry,
            assignments_total,
            orders_in_queue,
            assignment_latency_seconds,
            carrier_utilization,
            deliveries_total,
        }
    }

    /// Prometheus text exposition of every dispatch metric.
    pub fn encode(&self) -> Result<String, String> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(|err| format!("failed to encode dispatch metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("dispatch metrics are not valid utf8: {err}"))
    }
}

fn register<C>(registry: &Registry, collector: C) -> C
where
    C: Collector + Clone + 'static,
{
    registry
        .register(Box::new(collector.clone()))
        .expect("dispatch metric names are unique");
    collector
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
