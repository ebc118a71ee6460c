//! Ambient Prometheus instrumentation.
//!
//! Grounded on `layer4/src/metrics.rs`'s `MetricsCollector`: a small struct
//! of pre-registered series behind an `Arc`, handed out to every component
//! that needs to record something. Not part of the original taxonomy this
//! core was distilled from — observability is carried regardless, the way
//! the teacher carries it for every subsystem.

use std::sync::Arc;

use prometheus::{
    exponential_buckets, Histogram, HistogramOpts, IntCounterVec, IntGauge, Opts, Registry,
};

use crate::error::TasksError;

/// Outcome label for [`Metrics::dispatched`].
#[derive(Debug, Clone, Copy)]
pub enum Outcome {
    Success,
    Failure,
}

impl Outcome {
    fn as_str(self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::Failure => "failure",
        }
    }
}

/// Prometheus series tracking the scheduler's internals.
pub struct Metrics {
    registry: Registry,
    execution_queue_depth: IntGauge,
    retry_heap_depth: IntGauge,
    delayed_heap_depth: IntGauge,
    dispatched_total: IntCounterVec,
    retry_enqueued_total: prometheus::IntCounter,
    retry_dropped_total: prometheus::IntCounter,
    retry_exhausted_total: prometheus::IntCounter,
    backoff_seconds: Histogram,
}

impl Metrics {
    /// Builds a fresh registry and registers every series on it.
    pub fn new() -> Result<Arc<Self>, TasksError> {
        let registry = Registry::new();

        let execution_queue_depth = IntGauge::new(
            "tasks_execution_queue_depth",
            "Number of tasks currently buffered on the execution channel",
        )?;
        let retry_heap_depth = IntGauge::new(
            "tasks_retry_heap_depth",
            "Tasks currently waiting in the retry heap",
        )?;
        let delayed_heap_depth = IntGauge::new(
            "tasks_delayed_heap_depth",
            "Tasks currently waiting in the delayed heap",
        )?;
        let dispatched_total = IntCounterVec::new(
            Opts::new("tasks_dispatched_total", "Tasks handed to a worker handler"),
            &["outcome"],
        )?;
        let retry_enqueued_total = prometheus::IntCounter::new(
            "tasks_retry_enqueued_total",
            "Tasks accepted onto the retry heap",
        )?;
        let retry_dropped_total = prometheus::IntCounter::new(
            "tasks_retry_dropped_total",
            "Retry enqueues dropped because the retry channel was full",
        )?;
        let retry_exhausted_total = prometheus::IntCounter::new(
            "tasks_retry_exhausted_total",
            "Tasks that reached their maximum retry attempts",
        )?;
        let backoff_seconds = Histogram::with_opts(
            HistogramOpts::new("tasks_backoff_seconds", "Computed retry backoff durations")
                .buckets(exponential_buckets(0.1, 2.0, 12)?),
        )?;

        registry.register(Box::new(execution_queue_depth.clone()))?;
        registry.register(Box::new(retry_heap_depth.clone()))?;
        registry.register(Box::new(delayed_heap_depth.clone()))?;
        registry.register(Box::new(dispatched_total.clone()))?;
        registry.register(Box::new(retry_enqueued_total.clone()))?;
        registry.register(Box::new(retry_dropped_total.clone()))?;
        registry.register(Box::new(retry_exhausted_total.clone()))?;
        registry.register(Box::new(backoff_seconds.clone()))?;

        Ok(Arc::new(Self {
            registry,
            execution_queue_depth,
            retry_heap_depth,
            delayed_heap_depth,
            dispatched_total,
            retry_enqueued_total,
            retry_dropped_total,
            retry_exhausted_total,
            backoff_seconds,
        }))
    }

    /// The registry these series are bound to, for the host application to
    /// scrape or merge into its own.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn set_execution_queue_depth(&self, depth: i64) {
        self.execution_queue_depth.set(depth);
    }

    pub fn set_retry_heap_depth(&self, depth: i64) {
        self.retry_heap_depth.set(depth);
    }

    pub fn set_delayed_heap_depth(&self, depth: i64) {
        self.delayed_heap_depth.set(depth);
    }

    pub fn dispatched(&self, outcome: Outcome) {
        self.dispatched_total.with_label_values(&[outcome.as_str()]).inc();
    }

    pub fn retry_enqueued(&self) {
        self.retry_enqueued_total.inc();
    }

    pub fn retry_dropped(&self) {
        self.retry_dropped_total.inc();
    }

    pub fn retry_exhausted(&self) {
        self.retry_exhausted_total.inc();
    }

    pub fn observe_backoff(&self, seconds: f64) {
        self.backoff_seconds.observe(seconds);
    }
}
