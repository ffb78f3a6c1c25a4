use std::collections::HashMap;

use crate::provider::ProviderId;

/// Default TTL for cached reports (one hour).
pub const DEFAULT_CACHE_TTL_SECS: u64 = 3600;

/// Default timeout applied to every upstream request.
pub const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 10;

/// Runtime configuration for the aggregation core, sourced from the
/// environment. Credentials are read once at process start; within a single
/// process lifetime availability never changes.
#[derive(Debug, Clone)]
pub struct Config {
    /// Per-provider API keys. Providers without an entry (or with an empty
    /// value) are unavailable unless they require no key.
    api_keys: HashMap<ProviderId, String>,

    /// First provider attempted for every request.
    pub primary: ProviderId,

    /// Provider attempted when the primary fails.
    pub fallback: ProviderId,

    pub cache_ttl_secs: u64,
    pub upstream_timeout_secs: u64,

    /// When both chain members fail, serve a synthetic demo report instead
    /// of surfacing the exhaustion error.
    pub demo_fallback: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_keys: HashMap::new(),
            primary: ProviderId::OpenWeather,
            fallback: ProviderId::OpenMeteo,
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
            upstream_timeout_secs: DEFAULT_UPSTREAM_TIMEOUT_SECS,
            demo_fallback: true,
        }
    }
}

impl Config {
    /// Build configuration from environment variables:
    /// `OPENWEATHER_API_KEY`, `WEATHERAPI_API_KEY`, `WEATHERBIT_API_KEY`,
    /// `TOMORROW_API_KEY`, `WEATHER_PRIMARY_PROVIDER`,
    /// `WEATHER_FALLBACK_PROVIDER`, `WEATHER_CACHE_TTL_SECS`,
    /// `WEATHER_UPSTREAM_TIMEOUT_SECS`, `WEATHER_DEMO_FALLBACK`.
    ///
    /// Fails fast on an unknown provider name in the chain variables.
    pub fn from_env() -> anyhow::Result<Self> {
        let mut cfg = Self::default();

        for id in ProviderId::all() {
            if let Some(var) = id.key_env_var() {
                if let Some(key) = non_empty_env(var) {
                    cfg.api_keys.insert(*id, key);
                }
            }
        }

        if let Some(name) = non_empty_env("WEATHER_PRIMARY_PROVIDER") {
            cfg.primary = ProviderId::try_from(name.as_str())?;
        }
        if let Some(name) = non_empty_env("WEATHER_FALLBACK_PROVIDER") {
            cfg.fallback = ProviderId::try_from(name.as_str())?;
        }

        if let Some(ttl) = non_empty_env("WEATHER_CACHE_TTL_SECS") {
            cfg.cache_ttl_secs = ttl
                .parse()
                .map_err(|_| anyhow::anyhow!("WEATHER_CACHE_TTL_SECS must be an integer, got '{ttl}'"))?;
        }
        if let Some(timeout) = non_empty_env("WEATHER_UPSTREAM_TIMEOUT_SECS") {
            cfg.upstream_timeout_secs = timeout.parse().map_err(|_| {
                anyhow::anyhow!("WEATHER_UPSTREAM_TIMEOUT_SECS must be an integer, got '{timeout}'")
            })?;
        }
        if let Some(demo) = non_empty_env("WEATHER_DEMO_FALLBACK") {
            cfg.demo_fallback = matches!(demo.to_lowercase().as_str(), "1" | "true" | "yes" | "on");
        }

        Ok(cfg)
    }

    /// Returns the API key for a provider, if configured.
    pub fn provider_api_key(&self, id: ProviderId) -> Option<&str> {
        self.api_keys.get(&id).map(String::as_str)
    }

    /// True when at least one credential-requiring provider has a key.
    pub fn has_any_api_key(&self) -> bool {
        !self.api_keys.is_empty()
    }

    /// Set/replace a provider API key. Mostly useful in tests.
    pub fn set_api_key(&mut self, id: ProviderId, key: impl Into<String>) {
        self.api_keys.insert(id, key.into());
    }
}

fn non_empty_env(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|v| !v.trim().is_empty())
}
