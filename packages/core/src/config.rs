use std::env;
use std::fmt;
use std::time::Duration;

use serde::Serialize;

use crate::error::ConfigError;
use crate::region::CloudProvider;

pub const DEFAULT_BASE_URL: &str = "https://api.electricitymap.org/v3";
pub const DEFAULT_REGION: &str = "us-west-2";
pub const DEFAULT_PROVIDER: &str = "aws";
pub const DEFAULT_REQUEST_TIMEOUT_SECONDS: f64 = 30.0;
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_CACHE_TTL_SECONDS: f64 = 300.0;

const ENV_PREFIX: &str = "CARBONCUE_";
const FALLBACK_API_KEY_VAR: &str = "ELECTRICITY_MAPS_API_KEY";

/// Immutable client configuration. Build with [`CarbonConfig::builder`] or
/// load from the environment with [`CarbonConfig::from_env`].
#[derive(Clone, PartialEq, Serialize)]
pub struct CarbonConfig {
    #[serde(serialize_with = "redact")]
    api_key: Option<String>,
    base_url: String,
    default_region: String,
    default_provider: String,
    request_timeout_seconds: f64,
    max_retries: u32,
    cache_ttl_seconds: f64,
    caching_enabled: bool,
}

fn redact<S: serde::Serializer>(key: &Option<String>, s: S) -> Result<S::Ok, S::Error> {
    match key {
        Some(_) => s.serialize_some("***"),
        None => s.serialize_none(),
    }
}

impl fmt::Debug for CarbonConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CarbonConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("base_url", &self.base_url)
            .field("default_region", &self.default_region)
            .field("default_provider", &self.default_provider)
            .field("request_timeout_seconds", &self.request_timeout_seconds)
            .field("max_retries", &self.max_retries)
            .field("cache_ttl_seconds", &self.cache_ttl_seconds)
            .field("caching_enabled", &self.caching_enabled)
            .finish()
    }
}

impl Default for CarbonConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            default_region: DEFAULT_REGION.to_string(),
            default_provider: DEFAULT_PROVIDER.to_string(),
            request_timeout_seconds: DEFAULT_REQUEST_TIMEOUT_SECONDS,
            max_retries: DEFAULT_MAX_RETRIES,
            cache_ttl_seconds: DEFAULT_CACHE_TTL_SECONDS,
            caching_enabled: true,
        }
    }
}

impl CarbonConfig {
    pub fn builder() -> CarbonConfigBuilder {
        CarbonConfigBuilder {
            config: CarbonConfig::default(),
        }
    }

    /// Load configuration from `CARBONCUE_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// Keys are the full variable names (`CARBONCUE_MAX_RETRIES`, ...).
    /// Missing or empty values fall back to the defaults; values that fail
    /// to parse or validate are errors.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(&format!("{}{}", ENV_PREFIX, name))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut builder = Self::builder();

        let api_key = get("API_KEY").or_else(|| {
            lookup(FALLBACK_API_KEY_VAR)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        });
        if let Some(key) = api_key {
            builder = builder.api_key(key);
        }
        if let Some(url) = get("BASE_URL") {
            builder = builder.base_url(url);
        }
        if let Some(region) = get("DEFAULT_REGION") {
            builder = builder.default_region(region);
        }
        if let Some(provider) = get("DEFAULT_PROVIDER") {
            builder = builder.default_provider(provider);
        }
        if let Some(raw) = get("REQUEST_TIMEOUT_SECONDS") {
            builder = builder.request_timeout_seconds(parse_var("CARBONCUE_REQUEST_TIMEOUT_SECONDS", &raw)?);
        }
        if let Some(raw) = get("MAX_RETRIES") {
            builder = builder.max_retries(parse_var("CARBONCUE_MAX_RETRIES", &raw)?);
        }
        if let Some(raw) = get("CACHE_TTL_SECONDS") {
            builder = builder.cache_ttl_seconds(parse_var("CARBONCUE_CACHE_TTL_SECONDS", &raw)?);
        }
        if let Some(raw) = get("CACHING_ENABLED") {
            builder = builder.caching_enabled(parse_bool("CARBONCUE_CACHING_ENABLED", &raw)?);
        }

        builder.build()
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn default_region(&self) -> &str {
        &self.default_region
    }

    pub fn default_provider(&self) -> &str {
        &self.default_provider
    }

    pub fn request_timeout_seconds(&self) -> f64 {
        self.request_timeout_seconds
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.request_timeout_seconds)
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn cache_ttl_seconds(&self) -> f64 {
        self.cache_ttl_seconds
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs_f64(self.cache_ttl_seconds)
    }

    pub fn caching_enabled(&self) -> bool {
        self.caching_enabled
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, ConfigError> {
    raw.parse::<T>()
        .map_err(|_| ConfigError::invalid(key, raw, "must be a valid number"))
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::invalid(key, raw, "must be true or false")),
    }
}

/// Durations are stored as seconds but handed out as [`Duration`], so every
/// accepted value has to fit one.
fn representable(key: &str, seconds: f64) -> Result<Duration, ConfigError> {
    Duration::try_from_secs_f64(seconds)
        .map_err(|_| ConfigError::invalid(key, seconds, "is too large to be a duration"))
}

/// Builder for [`CarbonConfig`]; validation runs in [`CarbonConfigBuilder::build`].
#[derive(Debug, Clone)]
pub struct CarbonConfigBuilder {
    config: CarbonConfig,
}

impl CarbonConfigBuilder {
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    pub fn default_region(mut self, region: impl Into<String>) -> Self {
        self.config.default_region = region.into();
        self
    }

    pub fn default_provider(mut self, provider: impl Into<String>) -> Self {
        self.config.default_provider = provider.into();
        self
    }

    pub fn request_timeout_seconds(mut self, seconds: f64) -> Self {
        self.config.request_timeout_seconds = seconds;
        self
    }

    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.max_retries = retries;
        self
    }

    pub fn cache_ttl_seconds(mut self, seconds: f64) -> Self {
        self.config.cache_ttl_seconds = seconds;
        self
    }

    pub fn caching_enabled(mut self, enabled: bool) -> Self {
        self.config.caching_enabled = enabled;
        self
    }

    pub fn build(self) -> Result<CarbonConfig, ConfigError> {
        let c = self.config;

        if c.api_key.as_deref().is_some_and(|k| k.trim().is_empty()) {
            return Err(ConfigError::Empty {
                key: "api_key".into(),
            });
        }
        if c.base_url.trim().is_empty() {
            return Err(ConfigError::Empty {
                key: "base_url".into(),
            });
        }
        if !(c.base_url.starts_with("http://") || c.base_url.starts_with("https://")) {
            return Err(ConfigError::invalid(
                "base_url",
                &c.base_url,
                "must start with http:// or https://",
            ));
        }
        if c.default_region.trim().is_empty() {
            return Err(ConfigError::Empty {
                key: "default_region".into(),
            });
        }
        if c.default_provider.parse::<CloudProvider>().is_err() {
            return Err(ConfigError::invalid(
                "default_provider",
                &c.default_provider,
                "must be one of aws, azure, gcp, digitalocean",
            ));
        }
        if !c.request_timeout_seconds.is_finite() || c.request_timeout_seconds <= 0.0 {
            return Err(ConfigError::invalid(
                "request_timeout_seconds",
                c.request_timeout_seconds,
                "must be a positive number",
            ));
        }
        if !c.cache_ttl_seconds.is_finite() || c.cache_ttl_seconds < 0.0 {
            return Err(ConfigError::invalid(
                "cache_ttl_seconds",
                c.cache_ttl_seconds,
                "must be a non-negative number",
            ));
        }
        representable("request_timeout_seconds", c.request_timeout_seconds)?;
        representable("cache_ttl_seconds", c.cache_ttl_seconds)?;

        Ok(c)
    }
}
