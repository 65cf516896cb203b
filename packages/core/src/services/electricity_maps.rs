use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header::RETRY_AFTER, Client, Response, StatusCode};
use serde::Deserialize;

use crate::config::CarbonConfig;
use crate::error::CarbonError;
use crate::services::source::{IntensitySource, SourceError, ZoneReading};

pub const SOURCE_NAME: &str = "ElectricityMaps";

/// HTTP client for the Electricity Maps `carbon-intensity/latest` endpoint.
#[derive(Clone)]
pub struct ElectricityMapsClient {
    base_url: String,
    api_key: Option<String>,
    http: Client,
}

impl ElectricityMapsClient {
    pub fn new(config: &CarbonConfig) -> Result<Self, CarbonError> {
        let http = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|err| CarbonError::Api {
                message: format!("failed to build HTTP client: {}", err),
                status: None,
                attempts: 0,
            })?;

        Ok(Self {
            base_url: config.base_url().trim_end_matches('/').to_string(),
            api_key: config.api_key().map(str::to_string),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LatestIntensityResponse {
    carbon_intensity: Option<f64>,
    renewable_percentage: Option<f64>,
    fossil_free_percentage: Option<f64>,
}

#[async_trait]
impl IntensitySource for ElectricityMapsClient {
    async fn fetch_zone(&self, zone: &str) -> Result<ZoneReading, SourceError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| SourceError::Unauthorized {
            message: "no API key configured".to_string(),
        })?;

        let url = format!("{}/carbon-intensity/latest", self.base_url);

        let response = self
            .http
            .get(&url)
            .query(&[("zone", zone)])
            .header("auth-token", api_key)
            .send()
            .await
            .map_err(|err| SourceError::Transient {
                message: err.to_string(),
                status: None,
            })?;

        let response = classify_status(response, zone).await?;

        let body = response
            .json::<LatestIntensityResponse>()
            .await
            .map_err(|err| SourceError::Malformed {
                message: err.to_string(),
            })?;

        into_reading(body, zone)
    }

    fn name(&self) -> &str {
        SOURCE_NAME
    }
}

async fn classify_status(response: Response, zone: &str) -> Result<Response, SourceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let retry_after = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs);
    let message = response.text().await.unwrap_or_default();
    let message = if message.is_empty() {
        format!("HTTP {}", status)
    } else {
        message
    };

    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => SourceError::Unauthorized { message },
        StatusCode::NOT_FOUND => SourceError::NoData {
            zone: zone.to_string(),
        },
        StatusCode::TOO_MANY_REQUESTS => SourceError::RateLimited { retry_after },
        s if s.is_server_error() => SourceError::Transient {
            message,
            status: Some(s.as_u16()),
        },
        s => SourceError::Rejected {
            status: s.as_u16(),
            message,
        },
    })
}

fn into_reading(body: LatestIntensityResponse, zone: &str) -> Result<ZoneReading, SourceError> {
    let carbon_intensity = body.carbon_intensity.ok_or_else(|| SourceError::NoData {
        zone: zone.to_string(),
    })?;

    Ok(ZoneReading {
        carbon_intensity,
        fossil_fuel_percentage: body.fossil_free_percentage.map(|free| 100.0 - free),
        renewable_percentage: body.renewable_percentage,
    })
}
