//! Intensity fetch pipeline.
//!
//! One linear pass per call: resolve the grid zone, check the cache, call
//! the source (retrying transient failures only), classify the outcome,
//! store the reading. The cache is keyed by `(provider, region)`, not by
//! zone, so two regions on the same grid still get separate entries.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rand::Rng;
use tracing::{debug, info, warn};

use crate::cache::TtlCache;
use crate::config::CarbonConfig;
use crate::error::{CarbonError, Result};
use crate::metrics::ClientMetrics;
use crate::models::CarbonIntensity;
use crate::region::{CloudProvider, RegionMapper};
use crate::services::source::{IntensitySource, SourceError, ZoneReading};

type CacheKey = (CloudProvider, String);

/// Exponential backoff between retry attempts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryBackoff {
    pub base: Duration,
    pub max: Duration,
    /// Add up to `base / 2` of random delay on top of each wait.
    pub jitter: bool,
}

impl Default for RetryBackoff {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(500),
            max: Duration::from_secs(8),
            jitter: true,
        }
    }
}

impl RetryBackoff {
    /// No waiting between attempts.
    pub fn none() -> Self {
        Self {
            base: Duration::ZERO,
            max: Duration::ZERO,
            jitter: false,
        }
    }

    /// Delay before retry number `attempt + 1` (`attempt` is 0-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        let delay = self.base.saturating_mul(factor).min(self.max);
        if !self.jitter {
            return delay;
        }
        let spread = (self.base.as_millis() / 2) as u64;
        delay + Duration::from_millis(rand::thread_rng().gen_range(0..=spread))
    }
}

pub struct IntensityFetcher {
    source: Arc<dyn IntensitySource>,
    cache: TtlCache<CacheKey, CarbonIntensity>,
    max_retries: u32,
    cache_ttl: Duration,
    caching_enabled: bool,
    backoff: RetryBackoff,
    metrics: Arc<ClientMetrics>,
}

impl IntensityFetcher {
    pub fn new(
        source: Arc<dyn IntensitySource>,
        config: &CarbonConfig,
        metrics: Arc<ClientMetrics>,
    ) -> Self {
        Self {
            source,
            cache: TtlCache::new(),
            max_retries: config.max_retries(),
            cache_ttl: config.cache_ttl(),
            caching_enabled: config.caching_enabled(),
            backoff: RetryBackoff::default(),
            metrics,
        }
    }

    pub fn with_backoff(mut self, backoff: RetryBackoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Current carbon intensity for a cloud region.
    pub async fn fetch(&mut self, region: &str, provider: &str) -> Result<CarbonIntensity> {
        let result = self.fetch_inner(region, provider).await;
        if let Err(err) = &result {
            self.metrics
                .fetch_errors_total
                .with_label_values(&[err.kind()])
                .inc();
        }
        result
    }

    async fn fetch_inner(&mut self, region: &str, provider: &str) -> Result<CarbonIntensity> {
        let cloud = provider.parse::<CloudProvider>()?;
        let zone = RegionMapper::zone_for(region, cloud)?;
        let key = (cloud, region.to_string());

        if self.caching_enabled {
            if let Some(hit) = self.cache.get(&key) {
                debug!("Cache hit for {}/{}", cloud, region);
                self.metrics.cache_hits_total.inc();
                return Ok(hit);
            }
            debug!("Cache miss for {}/{}", cloud, region);
            self.metrics.cache_misses_total.inc();
        }

        let (reading, attempts) = self.fetch_with_retry(zone).await?;
        let intensity = self.build_intensity(region, zone, reading, attempts)?;

        info!(
            "Fetched carbon intensity for {}/{} (zone {}): {:.1} gCO2eq/kWh",
            cloud,
            region,
            zone,
            intensity.carbon_intensity()
        );

        if self.caching_enabled && !self.cache_ttl.is_zero() {
            self.cache.set(key, intensity.clone(), self.cache_ttl);
        }

        Ok(intensity)
    }

    /// Returns the reading together with the number of attempts it took.
    async fn fetch_with_retry(&self, zone: &str) -> Result<(ZoneReading, u32)> {
        let mut attempt: u32 = 0;
        loop {
            self.metrics.remote_requests_total.inc();
            match self.source.fetch_zone(zone).await {
                Ok(reading) => return Ok((reading, attempt + 1)),
                Err(err) if err.is_transient() && attempt < self.max_retries => {
                    let delay = self.backoff.delay(attempt);
                    attempt += 1;
                    warn!(
                        "Attempt {}/{} for zone {} failed: {}; retrying in {:?}",
                        attempt,
                        self.max_retries + 1,
                        zone,
                        err,
                        delay
                    );
                    self.metrics.retries_total.inc();
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(classify(err, zone, attempt + 1)),
            }
        }
    }

    fn build_intensity(
        &self,
        region: &str,
        zone: &str,
        reading: ZoneReading,
        attempts: u32,
    ) -> Result<CarbonIntensity> {
        CarbonIntensity::new(
            region,
            zone,
            reading.carbon_intensity,
            self.source.name(),
            Utc::now(),
        )
        .and_then(|i| i.with_fossil_fuel_percentage(reading.fossil_fuel_percentage))
        .and_then(|i| i.with_renewable_percentage(reading.renewable_percentage))
        .map_err(|err| CarbonError::Api {
            message: format!("source returned an invalid reading for zone {}: {}", zone, err),
            status: None,
            attempts,
        })
    }

    /// Drop every cached reading.
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    pub fn cached_entries(&self) -> usize {
        self.cache.len()
    }
}

fn classify(err: SourceError, zone: &str, attempts: u32) -> CarbonError {
    match err {
        SourceError::Unauthorized { message } => CarbonError::Authentication { message },
        SourceError::RateLimited { retry_after } => CarbonError::RateLimit { retry_after },
        SourceError::NoData { .. } => CarbonError::DataNotAvailable {
            zone: zone.to_string(),
        },
        SourceError::Transient { message, status } => CarbonError::Api {
            message,
            status,
            attempts,
        },
        SourceError::Rejected { status, message } => CarbonError::Api {
            message,
            status: Some(status),
            attempts,
        },
        SourceError::Malformed { message } => CarbonError::Api {
            message,
            status: None,
            attempts,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::mock_source::{reading, ScriptedSource};
    use std::thread;

    fn config(max_retries: u32, ttl: f64, caching: bool) -> CarbonConfig {
        CarbonConfig::builder()
            .api_key("test-key")
            .max_retries(max_retries)
            .cache_ttl_seconds(ttl)
            .caching_enabled(caching)
            .build()
            .unwrap()
    }

    fn fetcher(source: Arc<ScriptedSource>, config: &CarbonConfig) -> IntensityFetcher {
        let metrics = Arc::new(ClientMetrics::new().unwrap());
        IntensityFetcher::new(source, config, metrics).with_backoff(RetryBackoff::none())
    }

    // ---- happy path / cache ----

    #[tokio::test]
    async fn fetch_builds_reading_from_source() {
        let source = Arc::new(ScriptedSource::new().then(Ok(reading(120.0))));
        let mut fetcher = fetcher(source.clone(), &config(3, 60.0, true));

        let intensity = fetcher.fetch("us-west-2", "aws").await.unwrap();

        assert_eq!(intensity.region(), "us-west-2");
        assert_eq!(intensity.grid_zone(), "US-NW-PACW");
        assert_eq!(intensity.carbon_intensity(), 120.0);
        assert_eq!(intensity.renewable_percentage(), Some(55.0));
        assert_eq!(intensity.source(), "mock");
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn second_fetch_within_ttl_is_served_from_cache() {
        let source = Arc::new(ScriptedSource::new());
        let mut fetcher = fetcher(source.clone(), &config(3, 60.0, true));

        let first = fetcher.fetch("us-west-2", "aws").await.unwrap();
        let second = fetcher.fetch("us-west-2", "aws").await.unwrap();

        assert_eq!(source.calls(), 1);
        assert_eq!(first.timestamp(), second.timestamp());
        assert_eq!(fetcher.metrics.cache_hits_total.get(), 1.0);
        assert_eq!(fetcher.metrics.cache_misses_total.get(), 1.0);
    }

    #[tokio::test]
    async fn fetch_after_ttl_calls_source_again() {
        let source = Arc::new(ScriptedSource::new());
        let mut fetcher = fetcher(source.clone(), &config(3, 0.02, true));

        fetcher.fetch("us-west-2", "aws").await.unwrap();
        thread::sleep(Duration::from_millis(40));
        fetcher.fetch("us-west-2", "aws").await.unwrap();

        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn caching_disabled_always_calls_source() {
        let source = Arc::new(ScriptedSource::new());
        let mut fetcher = fetcher(source.clone(), &config(3, 60.0, false));

        fetcher.fetch("us-west-2", "aws").await.unwrap();
        fetcher.fetch("us-west-2", "aws").await.unwrap();

        assert_eq!(source.calls(), 2);
        assert_eq!(fetcher.cached_entries(), 0);
    }

    #[tokio::test]
    async fn zero_ttl_never_stores() {
        let source = Arc::new(ScriptedSource::new());
        let mut fetcher = fetcher(source.clone(), &config(3, 0.0, true));

        fetcher.fetch("us-west-2", "aws").await.unwrap();
        assert_eq!(fetcher.cached_entries(), 0);
    }

    #[tokio::test]
    async fn regions_sharing_a_zone_are_cached_separately() {
        let source = Arc::new(ScriptedSource::new());
        let mut fetcher = fetcher(source.clone(), &config(3, 60.0, true));

        // Both resolve to US-VA.
        let a = fetcher.fetch("us-east-1", "aws").await.unwrap();
        let b = fetcher.fetch("eastus", "azure").await.unwrap();

        assert_eq!(a.grid_zone(), b.grid_zone());
        assert_eq!(source.calls(), 2);
        assert_eq!(fetcher.cached_entries(), 2);
    }

    #[tokio::test]
    async fn zero_intensity_reading_is_cached_as_a_value() {
        let source = Arc::new(ScriptedSource::new().with_fallback_intensity(0.0));
        let mut fetcher = fetcher(source.clone(), &config(3, 60.0, true));

        let first = fetcher.fetch("eu-north-1", "aws").await.unwrap();
        let second = fetcher.fetch("eu-north-1", "aws").await.unwrap();

        assert_eq!(first.carbon_intensity(), 0.0);
        assert_eq!(second.carbon_intensity(), 0.0);
        assert_eq!(source.calls(), 1);
    }

    // ---- mapping errors ----

    #[tokio::test]
    async fn invalid_region_never_reaches_source() {
        let source = Arc::new(ScriptedSource::new());
        let mut fetcher = fetcher(source.clone(), &config(3, 60.0, true));

        let err = fetcher.fetch("mars-1", "aws").await.unwrap_err();
        assert!(matches!(err, CarbonError::InvalidRegion { .. }));

        let err = fetcher.fetch("us-west-2", "oracle").await.unwrap_err();
        assert!(matches!(err, CarbonError::InvalidProvider { .. }));

        assert_eq!(source.calls(), 0);
    }

    // ---- retry classification ----

    #[tokio::test]
    async fn unauthorized_is_not_retried() {
        let source = Arc::new(ScriptedSource::new().then(Err(SourceError::Unauthorized {
            message: "bad token".into(),
        })));
        let mut fetcher = fetcher(source.clone(), &config(3, 60.0, true));

        let err = fetcher.fetch("us-west-2", "aws").await.unwrap_err();

        assert!(matches!(err, CarbonError::Authentication { .. }));
        assert_eq!(source.calls(), 1);
        assert_eq!(fetcher.metrics.retries_total.get(), 0.0);
    }

    #[tokio::test]
    async fn rate_limit_is_not_retried() {
        let source = Arc::new(ScriptedSource::new().then(Err(SourceError::RateLimited {
            retry_after: Some(Duration::from_secs(10)),
        })));
        let mut fetcher = fetcher(source.clone(), &config(3, 60.0, true));

        let err = fetcher.fetch("us-west-2", "aws").await.unwrap_err();

        assert!(matches!(
            err,
            CarbonError::RateLimit { retry_after: Some(d) } if d == Duration::from_secs(10)
        ));
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn no_data_is_not_retried() {
        let source = Arc::new(ScriptedSource::new().then(Err(SourceError::NoData {
            zone: "US-NW-PACW".into(),
        })));
        let mut fetcher = fetcher(source.clone(), &config(3, 60.0, true));

        let err = fetcher.fetch("us-west-2", "aws").await.unwrap_err();

        assert!(matches!(err, CarbonError::DataNotAvailable { ref zone } if zone == "US-NW-PACW"));
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn transient_failures_up_to_budget_then_success() {
        let source = Arc::new(ScriptedSource::new().then_transient(3));
        let mut fetcher = fetcher(source.clone(), &config(3, 60.0, true));

        let intensity = fetcher.fetch("us-west-2", "aws").await.unwrap();

        assert_eq!(intensity.carbon_intensity(), 250.0);
        assert_eq!(source.calls(), 4);
        assert_eq!(fetcher.metrics.retries_total.get(), 3.0);
        assert_eq!(fetcher.metrics.remote_requests_total.get(), 4.0);
    }

    #[tokio::test]
    async fn exhausted_retries_raise_api_error_with_last_detail() {
        let source = Arc::new(ScriptedSource::new().then_transient(3));
        let mut fetcher = fetcher(source.clone(), &config(2, 60.0, true));

        let err = fetcher.fetch("us-west-2", "aws").await.unwrap_err();

        match err {
            CarbonError::Api {
                message,
                status,
                attempts,
            } => {
                assert_eq!(message, "connection reset #3");
                assert_eq!(status, Some(503));
                assert_eq!(attempts, 3);
            }
            other => panic!("expected Api error, got {:?}", other),
        }
        assert_eq!(source.calls(), 3);
        assert_eq!(fetcher.cached_entries(), 0);
        assert_eq!(
            fetcher.metrics.fetch_errors_total.with_label_values(&["api"]).get(),
            1.0
        );
    }

    #[tokio::test]
    async fn zero_retries_means_single_attempt() {
        let source = Arc::new(ScriptedSource::new().then_transient(1));
        let mut fetcher = fetcher(source.clone(), &config(0, 60.0, true));

        assert!(fetcher.fetch("us-west-2", "aws").await.is_err());
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn rejected_request_is_not_retried() {
        let source = Arc::new(ScriptedSource::new().then(Err(SourceError::Rejected {
            status: 400,
            message: "bad zone".into(),
        })));
        let mut fetcher = fetcher(source.clone(), &config(3, 60.0, true));

        let err = fetcher.fetch("us-west-2", "aws").await.unwrap_err();
        assert!(matches!(err, CarbonError::Api { status: Some(400), attempts: 1, .. }));
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn invalid_reading_from_source_is_an_api_error() {
        let source = Arc::new(ScriptedSource::new().then(Ok(reading(-5.0))));
        let mut fetcher = fetcher(source.clone(), &config(3, 60.0, true));

        let err = fetcher.fetch("us-west-2", "aws").await.unwrap_err();
        assert!(matches!(err, CarbonError::Api { attempts: 1, .. }));
        assert_eq!(fetcher.cached_entries(), 0);
    }

    #[tokio::test]
    async fn invalid_reading_after_retries_reports_every_attempt() {
        let source = Arc::new(
            ScriptedSource::new()
                .then_transient(2)
                .then(Ok(reading(-5.0))),
        );
        let mut fetcher = fetcher(source.clone(), &config(3, 60.0, true));

        let err = fetcher.fetch("us-west-2", "aws").await.unwrap_err();
        assert!(matches!(err, CarbonError::Api { attempts: 3, .. }), "got {:?}", err);
        assert_eq!(source.calls(), 3);
    }

    // ---- cancellation ----

    #[tokio::test]
    async fn abandoned_fetch_writes_no_cache_entry() {
        let source = Arc::new(ScriptedSource::new().with_delay(Duration::from_secs(5)));
        let mut fetcher = fetcher(source.clone(), &config(3, 60.0, true));

        let outcome =
            tokio::time::timeout(Duration::from_millis(20), fetcher.fetch("us-west-2", "aws")).await;

        assert!(outcome.is_err());
        assert_eq!(fetcher.cached_entries(), 0);
    }

    // ---- backoff ----

    #[test]
    fn backoff_doubles_and_caps() {
        let backoff = RetryBackoff {
            base: Duration::from_millis(100),
            max: Duration::from_millis(350),
            jitter: false,
        };
        assert_eq!(backoff.delay(0), Duration::from_millis(100));
        assert_eq!(backoff.delay(1), Duration::from_millis(200));
        assert_eq!(backoff.delay(2), Duration::from_millis(350));
        assert_eq!(backoff.delay(40), Duration::from_millis(350));
    }

    #[test]
    fn jitter_stays_within_half_base() {
        let backoff = RetryBackoff {
            base: Duration::from_millis(100),
            max: Duration::from_secs(1),
            jitter: true,
        };
        for _ in 0..50 {
            let d = backoff.delay(0);
            assert!(d >= Duration::from_millis(100) && d <= Duration::from_millis(150));
        }
    }
}
