//! Cloud region → electrical grid zone lookup.
//!
//! The tables below are static, read-only process data. Provider names are
//! matched case-insensitively; region codes are exact, case-sensitive
//! matches with no prefix or fuzzy fallback.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CarbonError, Result};

/// Cloud providers with a region → zone table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CloudProvider {
    Aws,
    Azure,
    Gcp,
    DigitalOcean,
}

impl CloudProvider {
    pub const ALL: [CloudProvider; 4] = [
        CloudProvider::Aws,
        CloudProvider::Azure,
        CloudProvider::Gcp,
        CloudProvider::DigitalOcean,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Aws => "aws",
            Self::Azure => "azure",
            Self::Gcp => "gcp",
            Self::DigitalOcean => "digitalocean",
        }
    }

    fn table(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            Self::Aws => AWS_ZONES,
            Self::Azure => AZURE_ZONES,
            Self::Gcp => GCP_ZONES,
            Self::DigitalOcean => DIGITALOCEAN_ZONES,
        }
    }
}

impl fmt::Display for CloudProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CloudProvider {
    type Err = CarbonError;

    fn from_str(s: &str) -> Result<Self> {
        CloudProvider::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| CarbonError::invalid_provider(s))
    }
}

// Zone identifiers follow the Electricity Maps zone naming.
const AWS_ZONES: &[(&str, &str)] = &[
    ("us-east-1", "US-VA"),
    ("us-east-2", "US-MIDA-PJM"),
    ("us-west-1", "US-CAL-CISO"),
    ("us-west-2", "US-NW-PACW"),
    ("ca-central-1", "CA-QC"),
    ("eu-west-1", "IE"),
    ("eu-west-2", "GB"),
    ("eu-west-3", "FR"),
    ("eu-central-1", "DE"),
    ("eu-north-1", "SE"),
    ("eu-south-1", "IT-NO"),
    ("ap-south-1", "IN-WE"),
    ("ap-northeast-1", "JP-TK"),
    ("ap-northeast-2", "KR"),
    ("ap-southeast-1", "SG"),
    ("ap-southeast-2", "AU-NSW"),
    ("sa-east-1", "BR-CS"),
];

const AZURE_ZONES: &[(&str, &str)] = &[
    ("eastus", "US-VA"),
    ("eastus2", "US-VA"),
    ("centralus", "US-MIDW-MISO"),
    ("westus", "US-CAL-CISO"),
    ("westus2", "US-NW-PACW"),
    ("canadacentral", "CA-ON"),
    ("northeurope", "IE"),
    ("westeurope", "NL"),
    ("uksouth", "GB"),
    ("ukwest", "GB"),
    ("francecentral", "FR"),
    ("germanywestcentral", "DE"),
    ("swedencentral", "SE"),
    ("centralindia", "IN-WE"),
    ("japaneast", "JP-TK"),
    ("southeastasia", "SG"),
    ("australiaeast", "AU-NSW"),
    ("brazilsouth", "BR-CS"),
];

const GCP_ZONES: &[(&str, &str)] = &[
    ("us-central1", "US-MIDW-MISO"),
    ("us-east1", "US-SE-SOCO"),
    ("us-east4", "US-VA"),
    ("us-west1", "US-NW-PACW"),
    ("us-west2", "US-CAL-CISO"),
    ("northamerica-northeast1", "CA-QC"),
    ("europe-west1", "BE"),
    ("europe-west2", "GB"),
    ("europe-west3", "DE"),
    ("europe-west4", "NL"),
    ("europe-west9", "FR"),
    ("europe-north1", "FI"),
    ("asia-east1", "TW"),
    ("asia-northeast1", "JP-TK"),
    ("asia-southeast1", "SG"),
    ("australia-southeast1", "AU-NSW"),
    ("southamerica-east1", "BR-CS"),
];

const DIGITALOCEAN_ZONES: &[(&str, &str)] = &[
    ("nyc1", "US-NY-NYIS"),
    ("nyc3", "US-NY-NYIS"),
    ("sfo3", "US-CAL-CISO"),
    ("tor1", "CA-ON"),
    ("lon1", "GB"),
    ("ams3", "NL"),
    ("fra1", "DE"),
    ("blr1", "IN-SO"),
    ("sgp1", "SG"),
    ("syd1", "AU-NSW"),
];

/// Stateless lookup over the static region tables.
pub struct RegionMapper;

impl RegionMapper {
    /// Resolve a cloud region to its grid zone identifier.
    ///
    /// Fails with [`CarbonError::InvalidProvider`] when the provider is not
    /// supported, and with [`CarbonError::InvalidRegion`] when the provider is
    /// known but the region is not in its table.
    pub fn get_zone_id(region: &str, provider: &str) -> Result<&'static str> {
        let provider = provider.parse::<CloudProvider>()?;
        Self::zone_for(region, provider)
    }

    /// Same as [`RegionMapper::get_zone_id`] for an already-parsed provider.
    pub fn zone_for(region: &str, provider: CloudProvider) -> Result<&'static str> {
        provider
            .table()
            .iter()
            .find(|(code, _)| *code == region)
            .map(|(_, zone)| *zone)
            .ok_or_else(|| CarbonError::invalid_region(region, provider.as_str()))
    }

    /// Region codes for a provider, in table order.
    pub fn get_supported_regions(provider: &str) -> Result<Vec<&'static str>> {
        let provider = provider.parse::<CloudProvider>()?;
        Ok(provider.table().iter().map(|(code, _)| *code).collect())
    }

    pub fn get_supported_providers() -> BTreeSet<&'static str> {
        CloudProvider::ALL.iter().map(|p| p.as_str()).collect()
    }

    /// The full `(region, zone)` table for a provider, in table order.
    pub fn all_mappings(provider: CloudProvider) -> &'static [(&'static str, &'static str)] {
        provider.table()
    }
}
