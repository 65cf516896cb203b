//! Value types returned by the client.
//!
//! Both types are immutable once built: fields are private and only exposed
//! through accessors, and every constructor validates its inputs.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{CarbonError, Result};

/// A point-in-time carbon intensity reading for a cloud region.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CarbonIntensity {
    region: String,
    grid_zone: String,
    /// gCO2eq/kWh
    carbon_intensity: f64,
    fossil_fuel_percentage: Option<f64>,
    renewable_percentage: Option<f64>,
    timestamp: DateTime<Utc>,
    source: String,
}

impl CarbonIntensity {
    pub fn new(
        region: impl Into<String>,
        grid_zone: impl Into<String>,
        carbon_intensity: f64,
        source: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Result<Self> {
        if !carbon_intensity.is_finite() || carbon_intensity < 0.0 {
            return Err(CarbonError::validation(
                "carbon_intensity",
                format!("must be a non-negative number, got {}", carbon_intensity),
            ));
        }

        Ok(Self {
            region: region.into(),
            grid_zone: grid_zone.into(),
            carbon_intensity,
            fossil_fuel_percentage: None,
            renewable_percentage: None,
            timestamp,
            source: source.into(),
        })
    }

    pub fn with_fossil_fuel_percentage(mut self, pct: Option<f64>) -> Result<Self> {
        self.fossil_fuel_percentage = check_percentage("fossil_fuel_percentage", pct)?;
        Ok(self)
    }

    pub fn with_renewable_percentage(mut self, pct: Option<f64>) -> Result<Self> {
        self.renewable_percentage = check_percentage("renewable_percentage", pct)?;
        Ok(self)
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn grid_zone(&self) -> &str {
        &self.grid_zone
    }

    pub fn carbon_intensity(&self) -> f64 {
        self.carbon_intensity
    }

    pub fn fossil_fuel_percentage(&self) -> Option<f64> {
        self.fossil_fuel_percentage
    }

    pub fn renewable_percentage(&self) -> Option<f64> {
        self.renewable_percentage
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

fn check_percentage(field: &str, pct: Option<f64>) -> Result<Option<f64>> {
    match pct {
        Some(v) if !(0.0..=100.0).contains(&v) => Err(CarbonError::validation(
            field,
            format!("must be between 0 and 100, got {}", v),
        )),
        other => Ok(other),
    }
}

/// A Software Carbon Intensity score.
///
/// Built only by [`crate::sci::SciCalculator::calculate`], which enforces
/// `functional_unit > 0`, non-negative emissions and a finite score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SciScore {
    score: f64,
    operational_emissions: f64,
    embodied_emissions: f64,
    functional_unit: f64,
    functional_unit_type: String,
    region: String,
    timestamp: DateTime<Utc>,
}

impl SciScore {
    pub(crate) fn from_validated(
        score: f64,
        operational_emissions: f64,
        embodied_emissions: f64,
        functional_unit: f64,
        functional_unit_type: String,
        region: String,
    ) -> Self {
        Self {
            score,
            operational_emissions,
            embodied_emissions,
            functional_unit,
            functional_unit_type,
            region,
            timestamp: Utc::now(),
        }
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn operational_emissions(&self) -> f64 {
        self.operational_emissions
    }

    pub fn embodied_emissions(&self) -> f64 {
        self.embodied_emissions
    }

    pub fn functional_unit(&self) -> f64 {
        self.functional_unit
    }

    pub fn functional_unit_type(&self) -> &str {
        &self.functional_unit_type
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}
