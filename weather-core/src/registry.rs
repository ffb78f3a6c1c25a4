use std::{collections::HashMap, sync::Arc};

use crate::{
    config::Config,
    error::WeatherError,
    model::ProviderAvailability,
    provider::{
        ProviderId, WeatherProvider, openmeteo::OpenMeteoProvider,
        openweather::OpenWeatherProvider, tomorrow::TomorrowProvider,
        weatherapi::WeatherApiProvider, weatherbit::WeatherbitProvider,
    },
};

/// Fixed map from provider name to adapter, built once at process start and
/// injected into the façade. There is no runtime registration; the provider
/// set is closed.
#[derive(Debug, Clone)]
pub struct ProviderRegistry {
    providers: HashMap<ProviderId, Arc<dyn WeatherProvider>>,
}

impl ProviderRegistry {
    /// Construct all five adapters from config.
    pub fn from_config(config: &Config) -> Self {
        let timeout = config.upstream_timeout_secs;
        let key = |id: ProviderId| config.provider_api_key(id).map(str::to_owned);

        let mut providers: HashMap<ProviderId, Arc<dyn WeatherProvider>> = HashMap::new();
        providers.insert(
            ProviderId::OpenMeteo,
            Arc::new(OpenMeteoProvider::new(timeout)),
        );
        providers.insert(
            ProviderId::OpenWeather,
            Arc::new(OpenWeatherProvider::new(key(ProviderId::OpenWeather), timeout)),
        );
        providers.insert(
            ProviderId::WeatherApi,
            Arc::new(WeatherApiProvider::new(key(ProviderId::WeatherApi), timeout)),
        );
        providers.insert(
            ProviderId::Weatherbit,
            Arc::new(WeatherbitProvider::new(key(ProviderId::Weatherbit), timeout)),
        );
        providers.insert(
            ProviderId::Tomorrow,
            Arc::new(TomorrowProvider::new(key(ProviderId::Tomorrow), timeout)),
        );

        Self { providers }
    }

    /// Registry over an explicit adapter set. Test use: swap in mocks.
    pub fn with_providers(providers: Vec<Arc<dyn WeatherProvider>>) -> Self {
        Self {
            providers: providers.into_iter().map(|p| (p.id(), p)).collect(),
        }
    }

    pub fn get(&self, id: ProviderId) -> Result<Arc<dyn WeatherProvider>, WeatherError> {
        self.providers
            .get(&id)
            .cloned()
            .ok_or_else(|| WeatherError::UnknownProvider(id.to_string()))
    }

    /// Resolve a provider by its wire name.
    pub fn get_by_name(&self, name: &str) -> Result<Arc<dyn WeatherProvider>, WeatherError> {
        let id = ProviderId::try_from(name)?;
        self.get(id)
    }

    /// Names of providers currently able to serve requests. Availability is
    /// recomputed on every call.
    pub fn available_names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self
            .providers
            .values()
            .filter(|p| p.is_available())
            .map(|p| p.id().as_str())
            .collect();
        names.sort_unstable();
        names
    }

    /// Availability of every registered provider, for diagnostics.
    pub fn describe_all(&self) -> Vec<ProviderAvailability> {
        let mut all: Vec<ProviderAvailability> = self
            .providers
            .values()
            .map(|p| ProviderAvailability {
                name: p.id().to_string(),
                requires_key: p.requires_key(),
                available: p.is_available(),
            })
            .collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_holds_all_five_providers() {
        let registry = ProviderRegistry::from_config(&Config::default());
        for id in ProviderId::all() {
            assert!(registry.get(*id).is_ok(), "missing adapter for {id}");
        }
    }

    #[test]
    fn only_keyless_provider_available_without_config() {
        let registry = ProviderRegistry::from_config(&Config::default());
        assert_eq!(registry.available_names(), vec!["openmeteo"]);
    }

    #[test]
    fn configured_key_makes_provider_available() {
        let mut cfg = Config::default();
        cfg.set_api_key(ProviderId::OpenWeather, "KEY");

        let registry = ProviderRegistry::from_config(&cfg);
        assert_eq!(registry.available_names(), vec!["openmeteo", "openweather"]);
    }

    #[test]
    fn get_by_name_rejects_unknown_names() {
        let registry = ProviderRegistry::from_config(&Config::default());
        let err = registry.get_by_name("doesnotexist").unwrap_err();
        assert!(matches!(err, WeatherError::UnknownProvider(_)));
    }

    #[test]
    fn describe_all_reports_key_requirements() {
        let registry = ProviderRegistry::from_config(&Config::default());
        let all = registry.describe_all();
        assert_eq!(all.len(), 5);

        let openmeteo = all.iter().find(|p| p.name == "openmeteo").expect("openmeteo");
        assert!(!openmeteo.requires_key);
        assert!(openmeteo.available);

        let openweather = all.iter().find(|p| p.name == "openweather").expect("openweather");
        assert!(openweather.requires_key);
        assert!(!openweather.available);
    }
}
