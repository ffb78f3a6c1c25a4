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

const DEFAULT_BASE_URL: &str = "https://api.weatherbit.io";

/// Weatherbit adapter. The observation arrives wrapped in a single-element
/// `data` array; an empty array is a decode failure, not a panic.
#[derive(Debug, Clone)]
pub struct WeatherbitProvider {
    api_key: Option<String>,
    http: Client,
    base_url: String,
}

impl WeatherbitProvider {
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
impl WeatherProvider for WeatherbitProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Weatherbit
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

        let url = format!("{}/v2.0/current", self.base_url);
        let res = self
            .http
            .get(&url)
            .query(&[
                ("lat", lat.to_string().as_str()),
                ("lon", lon.to_string().as_str()),
                ("key", api_key),
            ])
            .send()
            .await
            .map_err(|source| WeatherError::Network { provider: ProviderId::Weatherbit, source })?;

        let status = res.status();
        if !status.is_success() {
            return Err(WeatherError::UpstreamStatus {
                provider: self.id(),
                status: status.as_u16(),
            });
        }

        let parsed: WbResponse = res.json().await.map_err(|e| {
            warn!(provider = %self.id(), status = %status, error = %e, "failed to decode upstream payload");
            WeatherError::UpstreamDecode {
                provider: ProviderId::Weatherbit,
                detail: e.to_string(),
            }
        })?;

        let obs = parsed.data.into_iter().next().ok_or_else(|| {
            warn!(provider = %self.id(), status = %status, "upstream returned an empty data array");
            WeatherError::UpstreamDecode {
                provider: ProviderId::Weatherbit,
                detail: "empty data array".to_string(),
            }
        })?;

        let (description, icon) = condition(obs.weather.code);

        let location_label = if obs.city_name.is_empty() {
            format!("{lat:.4}, {lon:.4}")
        } else {
            obs.city_name
        };

        Ok(WeatherReport {
            temperature_c: model::round_celsius(obs.temp),
            description: description.to_string(),
            location_label,
            humidity_pct: obs.rh,
            wind_speed_kmh: model::mps_to_kmh(obs.wind_spd),
            icon: icon.to_string(),
            provider: self.id().to_string(),
            is_mock: false,
        })
    }
}

/// Weatherbit condition codes to canonical description/icon.
/// https://www.weatherbit.io/api/codes
fn condition(code: i64) -> (&'static str, &'static str) {
    match code {
        200..=233 => ("Thunderstorm", icon::THUNDERSTORM),
        300..=302 => ("Drizzle", icon::DRIZZLE),
        500..=511 => ("Rain", icon::RAIN),
        520..=522 => ("Showers", icon::RAIN),
        600..=602 => ("Snow", icon::SNOW),
        610..=612 => ("Sleet", icon::SLEET),
        621..=623 => ("Snow showers", icon::SNOW),
        700..=751 => ("Fog", icon::FOG),
        800 => ("Clear", icon::CLEAR_DAY),
        801..=803 => ("Partly cloudy", icon::PARTLY_CLOUDY_DAY),
        804 => ("Cloudy", icon::CLOUDY),
        900 => ("Rain", icon::RAIN),
        _ => model::UNKNOWN_CONDITION,
    }
}

#[derive(Debug, Deserialize)]
struct WbWeather {
    code: i64,
}

#[derive(Debug, Deserialize)]
struct WbObservation {
    temp: f64,
    rh: i32,
    wind_spd: f64,
    #[serde(default)]
    city_name: String,
    weather: WbWeather,
}

#[derive(Debug, Deserialize)]
struct WbResponse {
    #[serde(default)]
    data: Vec<WbObservation>,
}
