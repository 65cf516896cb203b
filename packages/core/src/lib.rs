// Library root. Holds the client core and the CLI modules used by the
// `carboncue` binary in `src/main.rs`.

pub mod cache;
pub mod client;
pub mod error;
pub mod fetcher;
pub mod metrics;
pub mod models;
pub mod region;
pub mod sci;
pub mod services;

// Only the binary needs these, but they stay public so integration tests
// can reach them.
pub mod cli;
pub mod config;
pub mod logging;

pub use client::CarbonClient;
pub use config::CarbonConfig;
pub use error::{CarbonError, ErrorCategory};
pub use fetcher::RetryBackoff;
pub use models::{CarbonIntensity, SciScore};
pub use region::{CloudProvider, RegionMapper};
pub use sci::SciCalculator;
