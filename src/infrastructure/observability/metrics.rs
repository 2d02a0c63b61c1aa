//! Prometheus metrics for the interceptor
//!
//! All metrics use the `jarmo_` prefix. They live in a private registry and are
//! only rendered on demand; nothing is pushed anywhere.

use crate::domain::lifecycle::TerminalEvent;
use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::Arc;
use std::time::Duration;

/// Counters describing what the interceptor did with each request
#[derive(Clone)]
pub struct Metrics {
    registry: Arc<Registry>,
    /// Requests by the terminal event that ended them
    pub requests_observed_total: IntCounterVec,
    /// Datagrams handed to the socket successfully
    pub datagrams_sent_total: IntCounter,
    /// Finished requests whose resolver asked to skip reporting
    pub datagrams_skipped_total: IntCounter,
    /// Failed sends passed to the error handler
    pub send_errors_total: IntCounter,
    /// Duration of finished requests in seconds
    pub response_time_seconds: Histogram,
}

impl Metrics {
    /// Create a new Metrics instance with all counters registered
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let requests_observed_total = IntCounterVec::new(
            Opts::new(
                "jarmo_requests_observed_total",
                "Requests observed, by terminal event",
            ),
            &["event"],
        )?;
        registry.register(Box::new(requests_observed_total.clone()))?;

        let datagrams_sent_total = IntCounter::with_opts(Opts::new(
            "jarmo_datagrams_sent_total",
            "Datagrams accepted by the socket",
        ))?;
        registry.register(Box::new(datagrams_sent_total.clone()))?;

        let datagrams_skipped_total = IntCounter::with_opts(Opts::new(
            "jarmo_datagrams_skipped_total",
            "Finished requests not reported because the resolver skipped them",
        ))?;
        registry.register(Box::new(datagrams_skipped_total.clone()))?;

        let send_errors_total = IntCounter::with_opts(Opts::new(
            "jarmo_send_errors_total",
            "Datagram sends that failed",
        ))?;
        registry.register(Box::new(send_errors_total.clone()))?;

        let response_time_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "jarmo_response_time_seconds",
                "Response time of finished requests in seconds",
            )
            .buckets(vec![
                0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0,
            ]),
        )?;
        registry.register(Box::new(response_time_seconds.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            requests_observed_total,
            datagrams_sent_total,
            datagrams_skipped_total,
            send_errors_total,
            response_time_seconds,
        })
    }

    /// Render all metrics in Prometheus text format
    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        encoder
            .encode_to_string(&metric_families)
            .unwrap_or_default()
    }

    pub fn observe_event(&self, event: TerminalEvent) {
        self.requests_observed_total
            .with_label_values(&[event.as_str()])
            .inc();
    }

    pub fn observe_response_time(&self, duration: Duration) {
        self.response_time_seconds.observe(duration.as_secs_f64());
    }

    pub fn event_count(&self, event: TerminalEvent) -> u64 {
        self.requests_observed_total
            .with_label_values(&[event.as_str()])
            .get()
    }
}
