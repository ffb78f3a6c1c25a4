use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::warn;

use crate::{
    error::WeatherError,
    model::{self, Coordinates, WeatherReport, icon},
    provider::{ProviderId, http_client},
};

use super::WeatherProvider;

const DEFAULT_BASE_URL: &str = "https://api.open-meteo.com";

/// Open-Meteo adapter. The free tier needs no API key, so this adapter
/// always reports available and anchors the default fallback chain. Wind
/// arrives in km/h natively; conditions use WMO weather codes.
#[derive(Debug, Clone)]
pub struct OpenMeteoProvider {
    http: Client,
    base_url: String,
}

impl OpenMeteoProvider {
    pub fn new(timeout_secs: u64) -> Self {
        Self {
            http: http_client(timeout_secs),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Point the adapter at a stub server. Test use only.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            http: http_client(10),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl WeatherProvider for OpenMeteoProvider {
    fn id(&self) -> ProviderId {
        ProviderId::OpenMeteo
    }

    fn requires_key(&self) -> bool {
        false
    }

    fn is_available(&self) -> bool {
        true
    }

    async fn fetch(&self, lat: f64, lon: f64) -> Result<WeatherReport, WeatherError> {
        let url = format!("{}/v1/forecast", self.base_url);
        let res = self
            .http
            .get(&url)
            .query(&[
                ("latitude", lat.to_string().as_str()),
                ("longitude", lon.to_string().as_str()),
                (
                    "current",
                    "temperature_2m,relative_humidity_2m,wind_speed_10m,weather_code",
                ),
            ])
            .send()
            .await
            .map_err(|source| WeatherError::Network { provider: ProviderId::OpenMeteo, source })?;

        let status = res.status();
        if !status.is_success() {
            return Err(WeatherError::UpstreamStatus {
                provider: self.id(),
                status: status.as_u16(),
            });
        }

        let parsed: OmResponse = res.json().await.map_err(|e| {
            warn!(provider = %self.id(), status = %status, error = %e, "failed to decode upstream payload");
            WeatherError::UpstreamDecode {
                provider: ProviderId::OpenMeteo,
                detail: e.to_string(),
            }
        })?;

        let (description, icon) = condition(parsed.current.weather_code);

        // Open-Meteo resolves no place name; fall back to the coordinates.
        let location_label = Coordinates { lat, lon }.label();

        Ok(WeatherReport {
            temperature_c: model::round_celsius(parsed.current.temperature_2m),
            description: description.to_string(),
            location_label,
            humidity_pct: parsed.current.relative_humidity_2m,
            wind_speed_kmh: model::round_kmh(parsed.current.wind_speed_10m),
            icon: icon.to_string(),
            provider: self.id().to_string(),
            is_mock: false,
        })
    }
}

/// WMO weather interpretation codes to canonical description/icon.
/// https://open-meteo.com/en/docs#weathervariables
fn condition(code: i64) -> (&'static str, &'static str) {
    match code {
        0 => ("Clear", icon::CLEAR_DAY),
        1 | 2 => ("Partly cloudy", icon::PARTLY_CLOUDY_DAY),
        3 => ("Cloudy", icon::CLOUDY),
        45 | 48 => ("Fog", icon::FOG),
        51 | 53 | 55 => ("Drizzle", icon::DRIZZLE),
        56 | 57 | 66 | 67 => ("Sleet", icon::SLEET),
        61 | 63 | 80 | 81 => ("Rain", icon::RAIN),
        65 | 82 => ("Heavy rain", icon::RAIN),
        71 | 73 | 75 | 77 | 85 | 86 => ("Snow", icon::SNOW),
        95 | 96 | 99 => ("Thunderstorm", icon::THUNDERSTORM),
        _ => model::UNKNOWN_CONDITION,
    }
}

#[derive(Debug, Deserialize)]
struct OmCurrent {
    temperature_2m: f64,
    relative_humidity_2m: i32,
    wind_speed_10m: f64,
    weather_code: i64,
}

#[derive(Debug, Deserialize)]
struct OmResponse {
    current: OmCurrent,
}
