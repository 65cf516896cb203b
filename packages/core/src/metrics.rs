//! Prometheus metrics for a single [`crate::client::CarbonClient`].
//!
//! [`ClientMetrics`] owns its own [`Registry`], so two clients in one
//! process never collide on metric names. Hosts that already run a
//! Prometheus exporter can call [`ClientMetrics::render`] and serve the text.

use prometheus::{Counter, CounterVec, Opts, Registry};

/// Fetch pipeline counters.
pub struct ClientMetrics {
    /// Requests sent to the remote source, retries included.
    pub remote_requests_total: Counter,
    /// Attempts that were retried after a transient failure.
    pub retries_total: Counter,
    pub cache_hits_total: Counter,
    pub cache_misses_total: Counter,
    /// Failed fetches, labelled by error kind.
    pub fetch_errors_total: CounterVec,
    pub registry: Registry,
}

impl ClientMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let remote_requests_total = Counter::with_opts(Opts::new(
            "carboncue_remote_requests_total",
            "Requests sent to the carbon data source",
        ))?;

        let retries_total = Counter::with_opts(Opts::new(
            "carboncue_retries_total",
            "Retried attempts after transient failures",
        ))?;

        let cache_hits_total = Counter::with_opts(Opts::new(
            "carboncue_cache_hits_total",
            "Intensity lookups served from cache",
        ))?;

        let cache_misses_total = Counter::with_opts(Opts::new(
            "carboncue_cache_misses_total",
            "Intensity lookups that missed the cache",
        ))?;

        let fetch_errors_total = CounterVec::new(
            Opts::new(
                "carboncue_fetch_errors_total",
                "Failed intensity fetches by error kind",
            ),
            &["kind"],
        )?;

        registry.register(Box::new(remote_requests_total.clone()))?;
        registry.register(Box::new(retries_total.clone()))?;
        registry.register(Box::new(cache_hits_total.clone()))?;
        registry.register(Box::new(cache_misses_total.clone()))?;
        registry.register(Box::new(fetch_errors_total.clone()))?;

        Ok(Self {
            remote_requests_total,
            retries_total,
            cache_hits_total,
            cache_misses_total,
            fetch_errors_total,
            registry,
        })
    }

    /// Render all metrics in Prometheus text format.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buf = Vec::new();
        encoder.encode(&metric_families, &mut buf)?;
        Ok(String::from_utf8(buf).unwrap_or_default())
    }
}
