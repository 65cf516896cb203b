//! Carbon Data Source Interface
//!
//! Abstraction over the remote service that reports grid carbon intensity,
//! so the fetch pipeline can run against HTTP or an in-memory script.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Raw reading for one grid zone as reported by a source.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneReading {
    /// gCO2eq/kWh
    pub carbon_intensity: f64,
    pub fossil_fuel_percentage: Option<f64>,
    pub renewable_percentage: Option<f64>,
}

/// Errors from carbon data sources.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SourceError {
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    #[error("Rate limited")]
    RateLimited { retry_after: Option<Duration> },

    #[error("No data for zone {zone}")]
    NoData { zone: String },

    #[error("Transient failure: {message}")]
    Transient {
        message: String,
        status: Option<u16>,
    },

    #[error("Request rejected with HTTP {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("Malformed response: {message}")]
    Malformed { message: String },
}

impl SourceError {
    /// Only transient failures are worth another attempt.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }
}

/// Trait for carbon intensity sources.
#[async_trait]
pub trait IntensitySource: Send + Sync {
    /// Fetch the latest reading for a grid zone.
    async fn fetch_zone(&self, zone: &str) -> Result<ZoneReading, SourceError>;

    /// Name recorded as `source` on every reading.
    fn name(&self) -> &str;
}
