use std::{convert::TryFrom, fmt::Debug, time::Duration};

use async_trait::async_trait;
use reqwest::Client;

use crate::{error::WeatherError, model::WeatherReport};

pub mod openmeteo;
pub mod openweather;
pub mod tomorrow;
pub mod weatherapi;
pub mod weatherbit;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderId {
    OpenMeteo,
    OpenWeather,
    WeatherApi,
    Weatherbit,
    Tomorrow,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::OpenMeteo => "openmeteo",
            ProviderId::OpenWeather => "openweather",
            ProviderId::WeatherApi => "weatherapi",
            ProviderId::Weatherbit => "weatherbit",
            ProviderId::Tomorrow => "tomorrow",
        }
    }

    pub const fn all() -> &'static [ProviderId] {
        &[
            ProviderId::OpenMeteo,
            ProviderId::OpenWeather,
            ProviderId::WeatherApi,
            ProviderId::Weatherbit,
            ProviderId::Tomorrow,
        ]
    }

    /// Environment variable holding this provider's API key, or `None` for
    /// the keyless open-data provider.
    pub fn key_env_var(&self) -> Option<&'static str> {
        match self {
            ProviderId::OpenMeteo => None,
            ProviderId::OpenWeather => Some("OPENWEATHER_API_KEY"),
            ProviderId::WeatherApi => Some("WEATHERAPI_API_KEY"),
            ProviderId::Weatherbit => Some("WEATHERBIT_API_KEY"),
            ProviderId::Tomorrow => Some("TOMORROW_API_KEY"),
        }
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ProviderId {
    type Error = WeatherError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let lower = value.to_lowercase();

        match lower.as_str() {
            "openmeteo" => Ok(ProviderId::OpenMeteo),
            "openweather" => Ok(ProviderId::OpenWeather),
            "weatherapi" => Ok(ProviderId::WeatherApi),
            "weatherbit" => Ok(ProviderId::Weatherbit),
            "tomorrow" => Ok(ProviderId::Tomorrow),
            _ => Err(WeatherError::UnknownProvider(value.to_string())),
        }
    }
}

/// Contract every upstream adapter implements. Adapters own their request
/// construction, response decoding, condition-code translation, and unit
/// normalization; callers only ever see [`WeatherReport`]s.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    fn id(&self) -> ProviderId;

    /// Whether this upstream needs an API key at all.
    fn requires_key(&self) -> bool;

    /// True iff no key is required, or a non-empty key is configured.
    fn is_available(&self) -> bool;

    async fn fetch(&self, lat: f64, lon: f64) -> Result<WeatherReport, WeatherError>;
}

/// Shared HTTP client for adapters. The timeout covers connect plus the full
/// response; a timed-out call surfaces as [`WeatherError::Network`] and is
/// treated like any upstream failure by the fallback chain.
pub(crate) fn http_client(timeout_secs: u64) -> Client {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .unwrap_or_default()
}
