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

const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org";

/// OpenWeatherMap adapter (current weather endpoint, metric units).
#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: Option<String>,
    http: Client,
    base_url: String,
}

impl OpenWeatherProvider {
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
impl WeatherProvider for OpenWeatherProvider {
    fn id(&self) -> ProviderId {
        ProviderId::OpenWeather
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

        let url = format!("{}/data/2.5/weather", self.base_url);
        let res = self
            .http
            .get(&url)
            .query(&[
                ("lat", lat.to_string().as_str()),
                ("lon", lon.to_string().as_str()),
                ("appid", api_key),
                ("units", "metric"),
            ])
            .send()
            .await
            .map_err(|source| WeatherError::Network { provider: ProviderId::OpenWeather, source })?;

        let status = res.status();
        if !status.is_success() {
            return Err(WeatherError::UpstreamStatus {
                provider: self.id(),
                status: status.as_u16(),
            });
        }

        let parsed: OwResponse = res.json().await.map_err(|e| {
            warn!(provider = %self.id(), status = %status, error = %e, "failed to decode upstream payload");
            WeatherError::UpstreamDecode {
                provider: ProviderId::OpenWeather,
                detail: e.to_string(),
            }
        })?;

        let code = parsed.weather.first().map(|w| w.id);
        let (description, icon) = code.map_or(model::UNKNOWN_CONDITION, condition);

        let location_label = if parsed.name.is_empty() {
            format!("{lat:.4}, {lon:.4}")
        } else {
            parsed.name
        };

        Ok(WeatherReport {
            temperature_c: model::round_celsius(parsed.main.temp),
            description: description.to_string(),
            location_label,
            humidity_pct: parsed.main.humidity,
            wind_speed_kmh: model::mps_to_kmh(parsed.wind.speed),
            icon: icon.to_string(),
            provider: self.id().to_string(),
            is_mock: false,
        })
    }
}

/// OpenWeatherMap condition IDs to canonical description/icon.
/// https://openweathermap.org/weather-conditions
fn condition(id: i64) -> (&'static str, &'static str) {
    match id {
        200..=232 => ("Thunderstorm", icon::THUNDERSTORM),
        300..=321 => ("Drizzle", icon::DRIZZLE),
        500..=504 => ("Rain", icon::RAIN),
        511 => ("Freezing rain", icon::SLEET),
        520..=531 => ("Showers", icon::RAIN),
        600..=602 => ("Snow", icon::SNOW),
        611..=616 => ("Sleet", icon::SLEET),
        620..=622 => ("Snow showers", icon::SNOW),
        701 | 721 | 741 => ("Fog", icon::FOG),
        711 | 731 | 751 | 761 | 762 => ("Haze", icon::FOG),
        771 => ("Squalls", icon::WIND),
        781 => ("Tornado", icon::WIND),
        800 => ("Clear", icon::CLEAR_DAY),
        801 | 802 => ("Partly cloudy", icon::PARTLY_CLOUDY_DAY),
        803 | 804 => ("Cloudy", icon::CLOUDY),
        _ => model::UNKNOWN_CONDITION,
    }
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    humidity: i32,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct OwWind {
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct OwResponse {
    #[serde(default)]
    name: String,
    main: OwMain,
    #[serde(default)]
    weather: Vec<OwWeather>,
    wind: OwWind,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn condition_table_maps_known_codes() {
        assert_eq!(condition(800), ("Clear", icon::CLEAR_DAY));
        assert_eq!(condition(801), ("Partly cloudy", icon::PARTLY_CLOUDY_DAY));
        assert_eq!(condition(500), ("Rain", icon::RAIN));
        assert_eq!(condition(211), ("Thunderstorm", icon::THUNDERSTORM));
    }

    #[test]
    fn condition_table_defaults_unknown_codes() {
        assert_eq!(condition(9999), ("Unknown", icon::CLEAR_DAY));
        assert_eq!(condition(-1), ("Unknown", icon::CLEAR_DAY));
    }

    #[test]
    fn unavailable_without_key() {
        let provider = OpenWeatherProvider::new(None, 10);
        assert!(!provider.is_available());
        assert!(provider.requires_key());

        let provider = OpenWeatherProvider::new(Some(String::new()), 10);
        assert!(!provider.is_available());
    }

    #[tokio::test]
    async fn fetch_without_key_fails_before_any_request() {
        let provider = OpenWeatherProvider::with_base_url(None, "http://127.0.0.1:9");
        let err = provider.fetch(40.0, -74.0).await.unwrap_err();
        assert!(matches!(err, WeatherError::MissingCredential { .. }));
    }

    #[tokio::test]
    async fn fetch_normalizes_payload() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .and(query_param("appid", "KEY"))
            .and(query_param("units", "metric"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "name": "New York",
                "main": { "temp": 22.4, "humidity": 65 },
                "weather": [ { "id": 800 } ],
                "wind": { "speed": 3.3 }
            })))
            .mount(&server)
            .await;

        let provider = OpenWeatherProvider::with_base_url(Some("KEY".into()), server.uri());
        let report = provider.fetch(40.7128, -74.0060).await.expect("fetch must succeed");

        assert_eq!(report.temperature_c, 22);
        assert_eq!(report.humidity_pct, 65);
        assert_eq!(report.wind_speed_kmh, 12);
        assert_eq!(report.description, "Clear");
        assert_eq!(report.icon, icon::CLEAR_DAY);
        assert_eq!(report.location_label, "New York");
        assert_eq!(report.provider, "openweather");
        assert!(!report.is_mock);
    }

    #[tokio::test]
    async fn fetch_surfaces_upstream_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let provider = OpenWeatherProvider::with_base_url(Some("BAD".into()), server.uri());
        let err = provider.fetch(40.0, -74.0).await.unwrap_err();
        assert!(matches!(
            err,
            WeatherError::UpstreamStatus { status: 401, .. }
        ));
    }

    #[tokio::test]
    async fn fetch_reports_decode_failures() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let provider = OpenWeatherProvider::with_base_url(Some("KEY".into()), server.uri());
        let err = provider.fetch(40.0, -74.0).await.unwrap_err();
        assert!(matches!(err, WeatherError::UpstreamDecode { .. }));
    }
}
