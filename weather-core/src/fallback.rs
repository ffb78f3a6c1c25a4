use tracing::warn;

use crate::{
    error::WeatherError,
    model::{Coordinates, WeatherReport, icon},
    provider::ProviderId,
    registry::ProviderRegistry,
};

/// Primary/fallback orchestration over the registry.
///
/// The primary is always attempted first; availability is necessary but not
/// sufficient, so a nominally available primary that fails at call time
/// still falls through to the fallback. Only exhaustion of both is terminal,
/// and even that can be softened into a synthetic demo report when
/// `demo_fallback` is on.
#[derive(Debug, Clone)]
pub struct FallbackChain {
    pub primary: ProviderId,
    pub fallback: ProviderId,
    pub demo_fallback: bool,
}

impl FallbackChain {
    pub fn new(primary: ProviderId, fallback: ProviderId, demo_fallback: bool) -> Self {
        Self { primary, fallback, demo_fallback }
    }

    pub async fn resolve(
        &self,
        registry: &ProviderRegistry,
        coords: Coordinates,
    ) -> Result<WeatherReport, WeatherError> {
        let primary_error = match self.try_provider(registry, self.primary, coords).await {
            Ok(report) => return Ok(report),
            Err(e) => e,
        };

        warn!(
            primary = %self.primary,
            fallback = %self.fallback,
            error = %primary_error,
            "primary provider failed, trying fallback"
        );

        let fallback_error = match self.try_provider(registry, self.fallback, coords).await {
            Ok(report) => return Ok(report),
            Err(e) => e,
        };

        if self.demo_fallback {
            warn!(
                primary = %self.primary,
                fallback = %self.fallback,
                "both providers failed, serving demo report"
            );
            return Ok(demo_report(coords));
        }

        Err(WeatherError::AllProvidersExhausted {
            primary: self.primary,
            primary_error: primary_error.to_string(),
            fallback: self.fallback,
            fallback_error: fallback_error.to_string(),
        })
    }

    async fn try_provider(
        &self,
        registry: &ProviderRegistry,
        id: ProviderId,
        coords: Coordinates,
    ) -> Result<WeatherReport, WeatherError> {
        let provider = registry.get(id)?;
        if !provider.is_available() {
            return Err(WeatherError::MissingCredential { provider: id });
        }

        let mut report = provider.fetch(coords.lat, coords.lon).await?;
        // The record always names the adapter that actually answered.
        report.provider = id.to_string();
        Ok(report)
    }
}

/// Synthetic report served when the whole chain is unreachable. Keeps the
/// "always show something" contract; callers must not treat it as an error.
pub fn demo_report(coords: Coordinates) -> WeatherReport {
    WeatherReport {
        temperature_c: 18,
        description: "Partly cloudy".to_string(),
        location_label: coords.label(),
        humidity_pct: 55,
        wind_speed_kmh: 10,
        icon: icon::PARTLY_CLOUDY_DAY.to_string(),
        provider: "demo".to_string(),
        is_mock: true,
    }
}
