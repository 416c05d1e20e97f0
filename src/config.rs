//! Viewer configuration.
//!
//! Everything that is tied to one particular trip's data (day palette,
//! region keywords, driving phrases) lives here as lookup tables rather
//! than in code. A config file only needs the fields it overrides.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ItineraryError, Result};

/// Top-level configuration for the viewer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Colors cycled through for each distinct date, in ascending date order.
    pub palette: Vec<String>,

    /// Color for rows whose date has no palette assignment.
    /// Default: "#3388ff"
    pub default_color: String,

    /// Decimal places used to round coordinates into marker keys.
    /// Default: 3 (~111m at the equator)
    pub coordinate_precision: u32,

    /// Phrases that mark a row as a drive.
    pub driving: DrivingKeywords,

    /// Location keyword table for the region filter.
    pub regions: RegionTable,

    /// Directions service settings.
    pub directions: DirectionsConfig,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            palette: DEFAULT_PALETTE.iter().map(|c| c.to_string()).collect(),
            default_color: "#3388ff".to_string(),
            coordinate_precision: 3,
            driving: DrivingKeywords::default(),
            regions: RegionTable::default(),
            directions: DirectionsConfig::default(),
        }
    }
}

/// Largest rounding precision a marker key can hold without overflowing.
pub const MAX_COORDINATE_PRECISION: u32 = 9;

const DEFAULT_PALETTE: &[&str] = &[
    "#e6194b", "#3cb44b", "#4363d8", "#f58231", "#911eb4", "#42d4f4", "#f032e6", "#9a6324",
    "#800000", "#469990", "#000075", "#808000",
];

impl ViewerConfig {
    /// Load a config from a JSON file. Fields absent from the file keep
    /// their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: ViewerConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the derivation code cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.palette.is_empty() {
            return Err(ItineraryError::Config {
                message: "palette must contain at least one color".to_string(),
            });
        }
        if self.coordinate_precision > MAX_COORDINATE_PRECISION {
            return Err(ItineraryError::Config {
                message: format!(
                    "coordinate_precision {} is out of range (0-{})",
                    self.coordinate_precision, MAX_COORDINATE_PRECISION
                ),
            });
        }
        if self.directions.timeout_secs == 0 {
            return Err(ItineraryError::Config {
                message: "directions.timeout_secs must be positive".to_string(),
            });
        }
        Ok(())
    }
}

/// Substrings that classify a row as a driving activity.
///
/// Matching is case-insensitive. `any_field` phrases are checked against
/// the activity, location and notes; `location_only` tokens (arrows) only
/// against the location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrivingKeywords {
    pub any_field: Vec<String>,
    pub location_only: Vec<String>,
}

impl Default for DrivingKeywords {
    fn default() -> Self {
        Self {
            any_field: ["drive", "driving", "hr drive", "hour drive"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            location_only: ["→", "->"].iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// A named region and the location substrings that select it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionRule {
    pub name: String,
    pub keywords: Vec<String>,
}

/// Ordered region rules; the first rule with a matching keyword wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionTable {
    pub rules: Vec<RegionRule>,
    /// Region for locations no rule matches.
    /// Default: "Other"
    pub fallback: String,
}

impl Default for RegionTable {
    fn default() -> Self {
        Self {
            rules: Vec::new(),
            fallback: "Other".to_string(),
        }
    }
}

/// Settings for the routed-path lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectionsConfig {
    /// OSRM-compatible server root.
    /// Default: "https://router.project-osrm.org"
    pub base_url: String,
    /// Routing profile segment of the URL.
    /// Default: "driving"
    pub profile: String,
    /// Per-request timeout.
    /// Default: 15 seconds
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for DirectionsConfig {
    fn default() -> Self {
        Self {
            base_url: "https://router.project-osrm.org".to_string(),
            profile: "driving".to_string(),
            timeout_secs: 15,
            user_agent: concat!("trip-itinerary/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}
