use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::warn;

use crate::{
    error::WeatherError,
    model::{self, WeatherReport, icon},
    provider::{ProviderId, http_client},
};

use super::WeatherProvider;

const DEFAULT_BASE_URL: &str = "https://api.tomorrow.io";

/// Tomorrow.io adapter (realtime endpoint, metric units).
#[derive(Debug, Clone)]
pub struct TomorrowProvider {
    api_key: Option<String>,
    http: Client,
    base_url: String,
}

impl TomorrowProvider {
    pub fn new(api_key: Option<String>, timeout_secs: u64) -> Self {
        Self {
            api_key,
            http: http_client(timeout_secs),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Point the adapter at a stub server. Test use only.
    pub fn with_base_url(api_key: Option<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key,
            http: http_client(10),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl WeatherProvider for TomorrowProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Tomorrow
    }

    fn requires_key(&self) -> bool {
        true
    }

    fn is_available(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }

    async fn fetch(&self, lat: f64, lon: f64) -> Result<WeatherReport, WeatherError> {
        let Some(api_key) = self.api_key.as_deref().filter(|k| !k.is_empty()) else {
            return Err(WeatherError::MissingCredential { provider: self.id() });
        };

        let url = format!("{}/v4/weather/realtime", self.base_url);
        let location = format!("{lat},{lon}");
        let res = self
            .http
            .get(&url)
            .query(&[
                ("location", location.as_str()),
                ("units", "metric"),
                ("apikey", api_key),
            ])
            .send()
            .await
            .map_err(|source| WeatherError::Network { provider: ProviderId::Tomorrow, source })?;

        let status = res.status();
        if !status.is_success() {
            return Err(WeatherError::UpstreamStatus {
                provider: self.id(),
                status: status.as_u16(),
            });
        }

        let parsed: TioResponse = res.json().await.map_err(|e| {
            warn!(provider = %self.id(), status = %status, error = %e, "failed to decode upstream payload");
            WeatherError::UpstreamDecode {
                provider: ProviderId::Tomorrow,
                detail: e.to_string(),
            }
        })?;

        let values = parsed.data.values;
        let (description, icon) = condition(values.weather_code);

        let location_label = parsed
            .location
            .and_then(|l| l.name)
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| format!("{lat:.4}, {lon:.4}"));

        Ok(WeatherReport {
            temperature_c: model::round_celsius(values.temperature),
            description: description.to_string(),
            location_label,
            humidity_pct: values.humidity,
            wind_speed_kmh: model::mps_to_kmh(values.wind_speed),
            icon: icon.to_string(),
            provider: self.id().to_string(),
            is_mock: false,
        })
    }
}

/// Tomorrow.io weather codes to canonical description/icon.
/// https://docs.tomorrow.io/reference/data-layers-weather-codes
fn condition(code: i64) -> (&'static str, &'static str) {
    match code {
        1000 | 1100 => ("Clear", icon::CLEAR_DAY),
        1101 => ("Partly cloudy", icon::PARTLY_CLOUDY_DAY),
        1102 | 1001 => ("Cloudy", icon::CLOUDY),
        2000 | 2100 => ("Fog", icon::FOG),
        4000 => ("Drizzle", icon::DRIZZLE),
        4200 => ("Light rain", icon::RAIN),
        4001 => ("Rain", icon::RAIN),
        4201 => ("Heavy rain", icon::RAIN),
        5001 | 5100 => ("Light snow", icon::SNOW),
        5000 | 5101 => ("Snow", icon::SNOW),
        6000 | 6001 | 6200 | 6201 | 7000 | 7101 | 7102 => ("Sleet", icon::SLEET),
        8000 => ("Thunderstorm", icon::THUNDERSTORM),
        _ => model::UNKNOWN_CONDITION,
    }
}

#[derive(Debug, Deserialize)]
struct TioValues {
    temperature: f64,
    humidity: i32,
    #[serde(rename = "windSpeed")]
    wind_speed: f64,
    #[serde(rename = "weatherCode")]
    weather_code: i64,
}

#[derive(Debug, Deserialize)]
struct TioData {
    values: TioValues,
}

#[derive(Debug, Deserialize)]
struct TioLocation {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TioResponse {
    data: TioData,
    #[serde(default)]
    location: Option<TioLocation>,
}
