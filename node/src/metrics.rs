//! # Prometheus Metrics
//!
//! Operational metrics for a simulation run: how many operations of each
//! kind were attempted and rejected, how long they took, and the state of
//! the market and the sale at the end.
//!
//! All metrics are registered in a dedicated [`prometheus::Registry`] so they
//! do not collide with any default global registry consumers.

use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

/// Operation label values.
pub const OPERATIONS: [&str; 5] = ["sale_purchase", "add_creator", "buy", "redeem", "swap"];

/// Holds all Prometheus metric handles for the engine.
///
/// Clone-friendly (prometheus handles are `Arc`s internally) so worker
/// threads can each hold a copy.
#[derive(Clone)]
pub struct EngineMetrics {
    /// Prometheus registry that owns all metrics below.
    registry: Registry,
    /// Successful operations, by `operation`.
    pub operations_total: IntCounterVec,
    /// Rejected operations, by `operation` and error `kind`.
    pub operation_failures_total: IntCounterVec,
    /// Creators listed in the market.
    pub creators: IntGauge,
    /// RTV still held by the private sale, whole tokens.
    pub sale_remaining_allocation: IntGauge,
    /// Latency of a single contract call in seconds.
    pub operation_latency_seconds: Histogram,
}

impl EngineMetrics {
    /// Creates and registers all metrics. Call once at startup.
    ///
    /// # Errors
    ///
    /// Returns a [`prometheus::Error`] if a metric definition is invalid or
    /// registered twice.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("retriever".into()), None)?;

        let operations_total = IntCounterVec::new(
            Opts::new("operations_total", "Contract operations that committed"),
            &["operation"],
        )?;
        registry.register(Box::new(operations_total.clone()))?;

        let operation_failures_total = IntCounterVec::new(
            Opts::new(
                "operation_failures_total",
                "Contract operations rejected with an error",
            ),
            &["operation", "kind"],
        )?;
        registry.register(Box::new(operation_failures_total.clone()))?;

        let creators = IntGauge::new("creators", "Creators listed in the market")?;
        registry.register(Box::new(creators.clone()))?;

        let sale_remaining_allocation = IntGauge::new(
            "sale_remaining_allocation",
            "RTV still held by the private sale, in whole tokens",
        )?;
        registry.register(Box::new(sale_remaining_allocation.clone()))?;

        let operation_latency_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "operation_latency_seconds",
                "Latency of a single contract call in seconds",
            )
            .buckets(vec![
                0.000_001, 0.000_005, 0.000_01, 0.000_05, 0.000_1, 0.000_5, 0.001, 0.005, 0.01,
            ]),
        )?;
        registry.register(Box::new(operation_latency_seconds.clone()))?;

        for operation in OPERATIONS {
            operations_total.with_label_values(&[operation]);
        }

        Ok(Self {
            registry,
            operations_total,
            operation_failures_total,
            creators,
            sale_remaining_allocation,
            operation_latency_seconds,
        })
    }

    /// Records one committed operation.
    pub fn record_success(&self, operation: &str, seconds: f64) {
        self.operations_total.with_label_values(&[operation]).inc();
        self.operation_latency_seconds.observe(seconds);
    }

    /// Records one rejected operation.
    pub fn record_failure(&self, operation: &str, kind: &str, seconds: f64) {
        self.operation_failures_total
            .with_label_values(&[operation, kind])
            .inc();
        self.operation_latency_seconds.observe(seconds);
    }

    /// Encodes all registered metrics into the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns a [`prometheus::Error`] if encoding fails.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
