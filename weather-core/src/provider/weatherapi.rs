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

const DEFAULT_BASE_URL: &str = "https://api.weatherapi.com";

/// WeatherAPI.com adapter. Wind arrives in km/h natively.
#[derive(Debug, Clone)]
pub struct WeatherApiProvider {
    api_key: Option<String>,
    http: Client,
    base_url: String,
}

impl WeatherApiProvider {
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
impl WeatherProvider for WeatherApiProvider {
    fn id(&self) -> ProviderId {
        ProviderId::WeatherApi
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

        let url = format!("{}/v1/current.json", self.base_url);
        let query = format!("{lat},{lon}");
        let res = self
            .http
            .get(&url)
            .query(&[("key", api_key), ("q", query.as_str())])
            .send()
            .await
            .map_err(|source| WeatherError::Network { provider: ProviderId::WeatherApi, source })?;

        let status = res.status();
        if !status.is_success() {
            return Err(WeatherError::UpstreamStatus {
                provider: self.id(),
                status: status.as_u16(),
            });
        }

        let parsed: WaResponse = res.json().await.map_err(|e| {
            warn!(provider = %self.id(), status = %status, error = %e, "failed to decode upstream payload");
            WeatherError::UpstreamDecode {
                provider: ProviderId::WeatherApi,
                detail: e.to_string(),
            }
        })?;

        let (description, icon) = condition(parsed.current.condition.code);

        Ok(WeatherReport {
            temperature_c: model::round_celsius(parsed.current.temp_c),
            description: description.to_string(),
            location_label: format!("{}, {}", parsed.location.name, parsed.location.country),
            humidity_pct: parsed.current.humidity,
            wind_speed_kmh: model::round_kmh(parsed.current.wind_kph),
            icon: icon.to_string(),
            provider: self.id().to_string(),
            is_mock: false,
        })
    }
}

/// WeatherAPI.com condition codes to canonical description/icon.
/// https://www.weatherapi.com/docs/weather_conditions.json
fn condition(code: i64) -> (&'static str, &'static str) {
    match code {
        1000 => ("Clear", icon::CLEAR_DAY),
        1003 => ("Partly cloudy", icon::PARTLY_CLOUDY_DAY),
        1006 | 1009 => ("Cloudy", icon::CLOUDY),
        1030 | 1135 | 1147 => ("Fog", icon::FOG),
        1063 | 1150 | 1153 | 1168 | 1171 => ("Drizzle", icon::DRIZZLE),
        1072 | 1069 | 1204 | 1207 | 1237 | 1249 | 1252 | 1261 | 1264 => ("Sleet", icon::SLEET),
        1180 | 1183 | 1186 | 1189 | 1240 => ("Rain", icon::RAIN),
        1192 | 1195 | 1243 | 1246 => ("Heavy rain", icon::RAIN),
        1066 | 1210 | 1213 | 1216 | 1219 | 1255 => ("Snow", icon::SNOW),
        1114 | 1117 | 1222 | 1225 | 1258 => ("Heavy snow", icon::SNOW),
        1087 | 1273 | 1276 | 1279 | 1282 => ("Thunderstorm", icon::THUNDERSTORM),
        _ => model::UNKNOWN_CONDITION,
    }
}

#[derive(Debug, Deserialize)]
struct WaLocation {
    name: String,
    country: String,
}

#[derive(Debug, Deserialize)]
struct WaCondition {
    code: i64,
}

#[derive(Debug, Deserialize)]
struct WaCurrent {
    temp_c: f64,
    humidity: i32,
    wind_kph: f64,
    condition: WaCondition,
}

#[derive(Debug, Deserialize)]
struct WaResponse {
    location: WaLocation,
    current: WaCurrent,
}
