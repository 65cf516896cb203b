//! Software Carbon Intensity calculation.
//!
//! `SCI = (O + M) / R`, where `O` is operational emissions, `M` embodied
//! emissions and `R` the functional unit. No rounding is applied.

use crate::error::{CarbonError, Result};
use crate::models::{CarbonIntensity, SciScore};

/// Pure SCI calculator. Holds no state and performs no I/O.
#[derive(Debug, Clone, Copy, Default)]
pub struct SciCalculator;

impl SciCalculator {
    pub fn calculate(
        &self,
        operational_emissions: f64,
        embodied_emissions: f64,
        functional_unit: f64,
        functional_unit_type: &str,
        region: &str,
    ) -> Result<SciScore> {
        if !functional_unit.is_finite() || functional_unit <= 0.0 {
            return Err(CarbonError::validation(
                "functional_unit",
                "Functional unit must be greater than 0",
            ));
        }
        non_negative("operational_emissions", operational_emissions)?;
        non_negative("embodied_emissions", embodied_emissions)?;

        let score = (operational_emissions + embodied_emissions) / functional_unit;
        if !score.is_finite() {
            return Err(CarbonError::validation(
                "score",
                format!(
                    "({} + {}) / {} is not a finite number",
                    operational_emissions, embodied_emissions, functional_unit
                ),
            ));
        }

        Ok(SciScore::from_validated(
            score,
            operational_emissions,
            embodied_emissions,
            functional_unit,
            functional_unit_type.to_string(),
            region.to_string(),
        ))
    }

    /// Operational emissions (gCO2eq) for `energy_kwh` consumed at the
    /// grid intensity of `intensity`.
    pub fn operational_emissions(&self, energy_kwh: f64, intensity: &CarbonIntensity) -> Result<f64> {
        non_negative("energy_kwh", energy_kwh)?;
        let emissions = energy_kwh * intensity.carbon_intensity();
        non_negative("operational_emissions", emissions)?;
        Ok(emissions)
    }
}

fn non_negative(field: &str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(CarbonError::validation(
            field,
            format!("must be a non-negative number, got {}", value),
        ))
    }
}
