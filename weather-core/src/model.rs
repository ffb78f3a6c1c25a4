use serde::{Deserialize, Serialize};

use crate::error::WeatherError;

/// Canonical icon taxonomy shared by every provider adapter. Each adapter's
/// code table maps its proprietary condition codes onto these names.
pub mod icon {
    pub const CLEAR_DAY: &str = "clear-day";
    pub const PARTLY_CLOUDY_DAY: &str = "partly-cloudy-day";
    pub const CLOUDY: &str = "cloudy";
    pub const FOG: &str = "fog";
    pub const DRIZZLE: &str = "drizzle";
    pub const RAIN: &str = "rain";
    pub const SLEET: &str = "sleet";
    pub const SNOW: &str = "snow";
    pub const WIND: &str = "wind";
    pub const THUNDERSTORM: &str = "thunderstorm";
}

/// Fallback mapping for condition codes no adapter table knows about.
/// Upstream taxonomies grow over time; unmapped codes degrade, never fail.
pub const UNKNOWN_CONDITION: (&str, &str) = ("Unknown", icon::CLEAR_DAY);

/// The normalized weather record every adapter produces and every caller
/// consumes. No field depends on which provider answered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherReport {
    #[serde(rename = "temperatureCelsius")]
    pub temperature_c: i32,
    pub description: String,
    pub location_label: String,
    #[serde(rename = "humidityPercent")]
    pub humidity_pct: i32,
    pub wind_speed_kmh: i32,
    #[serde(rename = "iconCode")]
    pub icon: String,
    #[serde(rename = "providerName")]
    pub provider: String,
    #[serde(rename = "isMockData")]
    pub is_mock: bool,
}

/// Availability of a single registered provider, recomputed on demand.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderAvailability {
    pub name: String,
    #[serde(rename = "requiresCredential")]
    pub requires_key: bool,
    #[serde(rename = "isAvailable")]
    pub available: bool,
}

/// A validated latitude/longitude pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    /// Validate raw coordinates. Out-of-range values are rejected before any
    /// provider is contacted.
    pub fn new(lat: f64, lon: f64) -> Result<Self, WeatherError> {
        if !lat.is_finite() || !lon.is_finite() || !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return Err(WeatherError::InvalidCoordinates { lat, lon });
        }
        Ok(Self { lat, lon })
    }

    /// Coordinate string used as `location_label` when a provider resolves
    /// no place name.
    pub fn label(&self) -> String {
        format!("{:.4}, {:.4}", self.lat, self.lon)
    }
}

/// Wind speed normalization: upstream metres per second to km/h, rounded.
pub fn mps_to_kmh(mps: f64) -> i32 {
    (mps * 3.6).round() as i32
}

/// Round a native km/h reading to the canonical integer representation.
pub fn round_kmh(kmh: f64) -> i32 {
    kmh.round() as i32
}

/// Round a Celsius reading to the canonical integer representation.
pub fn round_celsius(celsius: f64) -> i32 {
    celsius.round() as i32
}
