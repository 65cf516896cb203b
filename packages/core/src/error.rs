//! Error taxonomy shared by every component of the client.
//!
//! All failures surface as a [`CarbonError`] so callers can match broadly
//! (`Err(_)`) or narrowly on a single variant. [`ErrorCategory`] groups the
//! variants the way the CLI reports them through its exit code.

use std::time::Duration;

use thiserror::Error;

/// Result type alias using [`CarbonError`].
pub type Result<T> = std::result::Result<T, CarbonError>;

/// Broad grouping of [`CarbonError`] variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The caller passed something unrecognized, or misused the client.
    Usage,
    /// The remote data source failed or refused the request.
    Remote,
    /// SCI inputs (or reading values) failed validation.
    Validation,
    /// The client could not be set up, or output could not be produced.
    Internal,
}

impl ErrorCategory {
    /// Process exit code used by the CLI for this category.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Usage => 2,
            Self::Remote => 3,
            Self::Validation => 4,
            Self::Internal => 1,
        }
    }
}

/// Unified client error.
#[derive(Error, Debug)]
pub enum CarbonError {
    #[error("Unsupported region '{region}' for cloud provider '{provider}'")]
    InvalidRegion { region: String, provider: String },

    #[error("Unsupported cloud provider '{provider}' (supported: aws, azure, digitalocean, gcp)")]
    InvalidProvider { provider: String },

    #[error("Authentication failed: {message}. Set CARBONCUE_API_KEY to a valid Electricity Maps token")]
    Authentication { message: String },

    #[error("Rate limit exceeded by the carbon data source{}", retry_hint(.retry_after))]
    RateLimit { retry_after: Option<Duration> },

    #[error("No carbon intensity data available for grid zone '{zone}'")]
    DataNotAvailable { zone: String },

    #[error("Carbon data API error after {attempts} attempt(s): {message}")]
    Api {
        message: String,
        status: Option<u16>,
        attempts: u32,
    },

    #[error("Invalid {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Client is not open; call CarbonClient::open before fetching intensity")]
    ClientNotOpen,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Metrics registry error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("Failed to serialize output: {0}")]
    Serialization(#[from] serde_json::Error),
}

fn retry_hint(retry_after: &Option<Duration>) -> String {
    match retry_after {
        Some(delay) => format!(" (retry after {}s)", delay.as_secs()),
        None => String::new(),
    }
}

impl CarbonError {
    pub fn invalid_region(region: impl Into<String>, provider: impl Into<String>) -> Self {
        Self::InvalidRegion {
            region: region.into(),
            provider: provider.into(),
        }
    }

    pub fn invalid_provider(provider: impl Into<String>) -> Self {
        Self::InvalidProvider {
            provider: provider.into(),
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidRegion { .. }
            | Self::InvalidProvider { .. }
            | Self::ClientNotOpen
            | Self::Config(_) => ErrorCategory::Usage,
            Self::Authentication { .. }
            | Self::RateLimit { .. }
            | Self::DataNotAvailable { .. }
            | Self::Api { .. } => ErrorCategory::Remote,
            Self::Validation { .. } => ErrorCategory::Validation,
            Self::Metrics(_) | Self::Serialization(_) => ErrorCategory::Internal,
        }
    }

    pub fn exit_code(&self) -> i32 {
        self.category().exit_code()
    }

    /// Short stable label, used as the `kind` metric label.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidRegion { .. } => "invalid_region",
            Self::InvalidProvider { .. } => "invalid_provider",
            Self::Authentication { .. } => "authentication",
            Self::RateLimit { .. } => "rate_limit",
            Self::DataNotAvailable { .. } => "data_not_available",
            Self::Api { .. } => "api",
            Self::Validation { .. } => "validation",
            Self::ClientNotOpen => "client_not_open",
            Self::Config(_) => "config",
            Self::Metrics(_) => "metrics",
            Self::Serialization(_) => "serialization",
        }
    }
}

/// Configuration errors raised while building a [`crate::config::CarbonConfig`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Config error: {key} has invalid value '{value}': {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("Config error: {key} must not be empty")]
    Empty { key: String },
}

impl ConfigError {
    pub fn invalid(key: impl Into<String>, value: impl ToString, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.into(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}
