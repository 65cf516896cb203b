//! Remote carbon data sources.

pub mod electricity_maps;
pub mod source;

#[cfg(test)]
pub mod mock_source;

pub use electricity_maps::ElectricityMapsClient;
pub use source::{IntensitySource, SourceError, ZoneReading};
