//! Shared application state.

use std::sync::Arc;

use weather_core::{Config, WeatherService};

/// State handed to every handler. Cheaply cloneable; the service is the only
/// entry point handlers use for weather retrieval.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<WeatherService>,
    /// Whether any credential-requiring provider has a key configured.
    /// Captured at startup; the status endpoint must never expose key values.
    pub has_api_key: bool,
}

impl AppState {
    pub fn from_config(config: &Config) -> Self {
        Self {
            service: Arc::new(WeatherService::from_config(config)),
            has_api_key: config.has_any_api_key(),
        }
    }
}
