//! `CarbonClient`: the single entry point over the fetch pipeline and the
//! SCI calculator.
//!
//! Fetching needs an open client: [`CarbonClient::open`] builds the HTTP
//! transport, [`CarbonClient::close`] clears the cache and releases it.
//! Closing twice is a no-op. SCI calculation works in any state.

use std::sync::Arc;

use tracing::{debug, info};

use crate::config::CarbonConfig;
use crate::error::{CarbonError, Result};
use crate::fetcher::{IntensityFetcher, RetryBackoff};
use crate::metrics::ClientMetrics;
use crate::models::{CarbonIntensity, SciScore};
use crate::sci::SciCalculator;
use crate::services::electricity_maps::ElectricityMapsClient;
use crate::services::source::IntensitySource;

pub struct CarbonClient {
    config: CarbonConfig,
    calculator: SciCalculator,
    backoff: RetryBackoff,
    metrics: Arc<ClientMetrics>,
    fetcher: Option<IntensityFetcher>,
}

impl CarbonClient {
    pub fn new(config: CarbonConfig) -> Result<Self> {
        Ok(Self {
            config,
            calculator: SciCalculator,
            backoff: RetryBackoff::default(),
            metrics: Arc::new(ClientMetrics::new()?),
            fetcher: None,
        })
    }

    /// Override the wait between retry attempts. Applies from the next `open`.
    pub fn with_retry_backoff(mut self, backoff: RetryBackoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Prepare the Electricity Maps transport. No-op if already open.
    pub fn open(&mut self) -> Result<()> {
        if self.is_open() {
            debug!("CarbonClient already open");
            return Ok(());
        }
        let source = ElectricityMapsClient::new(&self.config)?;
        info!("CarbonClient opened against {}", source.base_url());
        self.attach(Arc::new(source));
        Ok(())
    }

    /// Open the client over a caller-supplied source instead of HTTP.
    pub fn open_with_source(&mut self, source: Arc<dyn IntensitySource>) {
        if self.is_open() {
            debug!("CarbonClient already open");
            return;
        }
        self.attach(source);
    }

    fn attach(&mut self, source: Arc<dyn IntensitySource>) {
        let fetcher = IntensityFetcher::new(source, &self.config, self.metrics.clone())
            .with_backoff(self.backoff);
        self.fetcher = Some(fetcher);
    }

    /// Clear the cache and release the transport.
    pub fn close(&mut self) {
        if let Some(mut fetcher) = self.fetcher.take() {
            fetcher.clear_cache();
            info!("CarbonClient closed");
        }
    }

    pub fn is_open(&self) -> bool {
        self.fetcher.is_some()
    }

    pub async fn get_current_intensity(
        &mut self,
        region: &str,
        provider: &str,
    ) -> Result<CarbonIntensity> {
        let fetcher = self.fetcher.as_mut().ok_or(CarbonError::ClientNotOpen)?;
        fetcher.fetch(region, provider).await
    }

    /// Intensity for the configured default region and provider.
    pub async fn get_default_intensity(&mut self) -> Result<CarbonIntensity> {
        let region = self.config.default_region().to_string();
        let provider = self.config.default_provider().to_string();
        self.get_current_intensity(&region, &provider).await
    }

    pub fn calculate_sci(
        &self,
        operational_emissions: f64,
        embodied_emissions: f64,
        functional_unit: f64,
        functional_unit_type: &str,
        region: &str,
    ) -> Result<SciScore> {
        self.calculator.calculate(
            operational_emissions,
            embodied_emissions,
            functional_unit,
            functional_unit_type,
            region,
        )
    }

    pub fn config(&self) -> &CarbonConfig {
        &self.config
    }

    pub fn metrics(&self) -> &ClientMetrics {
        &self.metrics
    }
}
