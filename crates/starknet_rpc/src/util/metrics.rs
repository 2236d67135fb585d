use crate::api::v1alpha1::StarknetRPC;
use crate::util::errors::Error;
use kube::ResourceExt;
use prometheus::{histogram_opts, opts, HistogramVec, IntCounter, IntCounterVec, Registry};
use tokio::time::Instant;

#[derive(Clone)]
pub struct Metrics {
    pub reconciliations: IntCounter,
    pub failures: IntCounterVec,
    pub requeues: IntCounterVec,
    pub reconcile_duration: HistogramVec,
}

impl Default for Metrics {
    fn default() -> Self {
        let reconcile_duration = HistogramVec::new(
            histogram_opts!(
                "starknetrpc_reconcile_duration_seconds",
                "The duration of reconcile to complete in seconds",
            )
            .buckets(vec![0.01, 0.1, 0.25, 0.5, 1., 5., 15., 60.]),
            &["instance"],
        )
        .unwrap_or_else(|e| panic!("invalid reconcile_duration metric: {e}"));
        let failures = IntCounterVec::new(
            opts!("starknetrpc_reconciliation_errors_total", "reconciliation errors"),
            &["instance", "error"],
        )
        .unwrap_or_else(|e| panic!("invalid failures metric: {e}"));
        let requeues = IntCounterVec::new(
            opts!(
                "starknetrpc_phase_requeues_total",
                "invocations stopped early by a phase to resume later"
            ),
            &["phase"],
        )
        .unwrap_or_else(|e| panic!("invalid requeues metric: {e}"));
        let reconciliations = IntCounter::new("starknetrpc_reconciliations_total", "reconciliations")
            .unwrap_or_else(|e| panic!("invalid reconciliations metric: {e}"));
        Metrics {
            reconciliations,
            failures,
            requeues,
            reconcile_duration,
        }
    }
}

impl Metrics {
    /// Register API metrics to start tracking them.
    pub fn register(self, registry: &Registry) -> Result<Self, prometheus::Error> {
        registry.register(Box::new(self.reconcile_duration.clone()))?;
        registry.register(Box::new(self.failures.clone()))?;
        registry.register(Box::new(self.requeues.clone()))?;
        registry.register(Box::new(self.reconciliations.clone()))?;
        Ok(self)
    }

    pub fn reconcile_failure(&self, rpc: &StarknetRPC, e: &Error) {
        self.failures
            .with_label_values(&[rpc.name_any().as_ref(), e.metric_label().as_ref()])
            .inc()
    }

    pub fn phase_requeue(&self, phase: &str) {
        self.requeues.with_label_values(&[phase]).inc()
    }

    pub fn count_and_measure(&self, controller: &str) -> ReconcileMeasurer {
        self.reconciliations.inc();
        ReconcileMeasurer {
            start: Instant::now(),
            metric: self.reconcile_duration.clone(),
            instance: controller.to_string(),
        }
    }
}

/// Smart function duration measurer
///
/// Relies on Drop to calculate duration and register the observation in the histogram
pub struct ReconcileMeasurer {
    start: Instant,
    metric: HistogramVec,
    instance: String,
}

impl Drop for ReconcileMeasurer {
    fn drop(&mut self) {
        #[allow(clippy::cast_precision_loss)]
        let duration = self.start.elapsed().as_millis() as f64 / 1000.0;
        self.metric
            .with_label_values(&[self.instance.as_str()])
            .observe(duration);
    }
}
