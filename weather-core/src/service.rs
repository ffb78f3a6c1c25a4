use std::{collections::HashMap, sync::Arc};

use tokio::sync::Mutex;
use tracing::debug;

use crate::{
    cache::{CacheSnapshot, WeatherCache, cache_key},
    config::Config,
    error::WeatherError,
    fallback::FallbackChain,
    model::{Coordinates, WeatherReport},
    registry::ProviderRegistry,
};

/// The request façade: the single entry point the HTTP surface calls for
/// weather retrieval. Checks the cache first, then resolves through the
/// fallback chain, with single-flight coalescing so concurrent misses for
/// one key produce exactly one upstream fetch.
#[derive(Debug)]
pub struct WeatherService {
    registry: Arc<ProviderRegistry>,
    chain: FallbackChain,
    cache: Arc<WeatherCache>,
    // Per-key guards held across an upstream fetch. Waiters re-check the
    // cache after acquiring, so they ride on the first caller's result.
    inflight: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl WeatherService {
    pub fn new(registry: Arc<ProviderRegistry>, chain: FallbackChain, cache: Arc<WeatherCache>) -> Self {
        Self {
            registry,
            chain,
            cache,
            inflight: Mutex::new(HashMap::new()),
        }
    }

    /// Build the façade and its collaborators straight from config.
    pub fn from_config(config: &Config) -> Self {
        let registry = Arc::new(ProviderRegistry::from_config(config));
        let chain = FallbackChain::new(config.primary, config.fallback, config.demo_fallback);
        let cache = Arc::new(WeatherCache::new(config.cache_ttl_secs));
        Self::new(registry, chain, cache)
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    pub fn chain(&self) -> &FallbackChain {
        &self.chain
    }

    pub async fn get_weather(&self, lat: f64, lon: f64) -> Result<WeatherReport, WeatherError> {
        let coords = Coordinates::new(lat, lon)?;
        let key = cache_key(coords);

        if let Some(report) = self.cache.get_fresh(&key) {
            debug!(%key, "cache hit");
            return Ok(report);
        }

        let guard = self.key_guard(&key).await;
        let _held = guard.lock().await;

        // Another caller may have fetched while we waited on the guard.
        if let Some(report) = self.cache.get_fresh(&key) {
            debug!(%key, "cache hit after coalescing");
            return Ok(report);
        }

        let result = self.chain.resolve(&self.registry, coords).await;
        if let Ok(report) = &result {
            // Failures are never cached, and neither is the synthetic demo
            // record; the next request for this key retries the real chain.
            if !report.is_mock {
                self.cache.put(key.clone(), report.clone());
            }
        }

        result
    }

    /// Diagnostic path: call one named adapter directly, bypassing cache and
    /// fallback.
    pub async fn test_provider(
        &self,
        name: &str,
        lat: f64,
        lon: f64,
    ) -> Result<WeatherReport, WeatherError> {
        let coords = Coordinates::new(lat, lon)?;
        let provider = self.registry.get_by_name(name)?;
        provider.fetch(coords.lat, coords.lon).await
    }

    pub fn cache_snapshot(&self) -> CacheSnapshot {
        self.cache.snapshot()
    }

    // A guard stays in the map as long as any caller still holds a clone of
    // it, so every concurrent request for a key serializes on the same
    // mutex, including requests arriving after a failed fetch. Entries with
    // no remaining holders are pruned on the next acquisition.
    async fn key_guard(&self, key: &str) -> Arc<Mutex<()>> {
        let mut inflight = self.inflight.lock().await;
        inflight.retain(|_, guard| Arc::strong_count(guard) > 1);
        inflight
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::icon;
    use crate::provider::{ProviderId, WeatherProvider};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Adapter that counts fetches and answers slowly enough for concurrent
    /// callers to pile up on the same key.
    #[derive(Debug)]
    struct CountingProvider {
        calls: AtomicUsize,
        delay: Duration,
    }

    impl CountingProvider {
        fn new(delay: Duration) -> Arc<Self> {
            Arc::new(Self { calls: AtomicUsize::new(0), delay })
        }
    }

    #[async_trait]
    impl WeatherProvider for CountingProvider {
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
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            Ok(WeatherReport {
                temperature_c: 21,
                description: "Clear".to_string(),
                location_label: format!("{lat:.4}, {lon:.4}"),
                humidity_pct: 40,
                wind_speed_kmh: 6,
                icon: icon::CLEAR_DAY.to_string(),
                provider: self.id().to_string(),
                is_mock: false,
            })
        }
    }

    /// Adapter that fails its first N fetches and succeeds afterwards,
    /// while tracking how many fetches are in flight at once.
    #[derive(Debug)]
    struct FlakyProvider {
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        fail_first: usize,
        delay: Duration,
    }

    impl FlakyProvider {
        fn new(fail_first: usize, delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
                fail_first,
                delay,
            })
        }
    }

    #[async_trait]
    impl WeatherProvider for FlakyProvider {
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
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(current, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if call < self.fail_first {
                return Err(WeatherError::UpstreamStatus { provider: self.id(), status: 503 });
            }
            Ok(WeatherReport {
                temperature_c: 21,
                description: "Clear".to_string(),
                location_label: format!("{lat:.4}, {lon:.4}"),
                humidity_pct: 40,
                wind_speed_kmh: 6,
                icon: icon::CLEAR_DAY.to_string(),
                provider: self.id().to_string(),
                is_mock: false,
            })
        }
    }

    fn flaky_service(provider: Arc<FlakyProvider>, demo_fallback: bool) -> Arc<WeatherService> {
        let registry = Arc::new(ProviderRegistry::with_providers(vec![
            provider as Arc<dyn WeatherProvider>,
        ]));
        let chain = FallbackChain::new(ProviderId::OpenMeteo, ProviderId::OpenMeteo, demo_fallback);
        let cache = Arc::new(WeatherCache::new(3600));
        Arc::new(WeatherService::new(registry, chain, cache))
    }

    fn service_with(provider: Arc<CountingProvider>) -> Arc<WeatherService> {
        let registry = Arc::new(ProviderRegistry::with_providers(vec![provider as Arc<dyn WeatherProvider>]));
        let chain = FallbackChain::new(ProviderId::OpenMeteo, ProviderId::OpenMeteo, false);
        let cache = Arc::new(WeatherCache::new(3600));
        Arc::new(WeatherService::new(registry, chain, cache))
    }

    #[tokio::test]
    async fn invalid_coordinates_rejected_before_any_fetch() {
        let provider = CountingProvider::new(Duration::ZERO);
        let service = service_with(provider.clone());

        let err = service.get_weather(91.0, 0.0).await.unwrap_err();
        assert!(matches!(err, WeatherError::InvalidCoordinates { .. }));

        let err = service.get_weather(0.0, 200.0).await.unwrap_err();
        assert!(matches!(err, WeatherError::InvalidCoordinates { .. }));

        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn second_request_is_served_from_cache() {
        let provider = CountingProvider::new(Duration::ZERO);
        let service = service_with(provider.clone());

        let first = service.get_weather(40.7128, -74.0060).await.expect("first fetch");
        let second = service.get_weather(40.7128, -74.0060).await.expect("cached fetch");

        assert_eq!(first, second);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn nearby_coordinates_share_one_cache_entry() {
        let provider = CountingProvider::new(Duration::ZERO);
        let service = service_with(provider.clone());

        service.get_weather(40.7128, -74.0060).await.expect("first fetch");
        service.get_weather(40.7131, -74.0057).await.expect("same key");

        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn concurrent_cold_requests_coalesce_into_one_fetch() {
        let provider = CountingProvider::new(Duration::from_millis(50));
        let service = service_with(provider.clone());

        let mut handles = Vec::new();
        for _ in 0..8 {
            let service = service.clone();
            handles.push(tokio::spawn(async move {
                service.get_weather(40.7128, -74.0060).await
            }));
        }

        let mut reports = Vec::new();
        for handle in handles {
            reports.push(handle.await.expect("task").expect("fetch"));
        }

        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
        assert!(reports.windows(2).all(|w| w[0] == w[1]));
    }

    #[tokio::test]
    async fn failed_fetch_does_not_split_the_per_key_guard() {
        // First resolve fails on both chain attempts. A waiter queued behind
        // it and a request arriving after the failure must still serialize
        // on the same guard: never two upstream fetches for one key at once.
        let provider = FlakyProvider::new(2, Duration::from_millis(50));
        let service = flaky_service(provider.clone(), false);

        let mut handles = Vec::new();
        for start_ms in [0u64, 10, 120] {
            let service = service.clone();
            handles.push(tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(start_ms)).await;
                service.get_weather(40.7128, -74.0060).await
            }));
        }

        let mut results = Vec::new();
        for handle in handles {
            results.push(handle.await.expect("task"));
        }

        assert_eq!(provider.max_in_flight.load(Ordering::SeqCst), 1);
        assert!(matches!(
            results[0],
            Err(WeatherError::AllProvidersExhausted { .. })
        ));
        assert!(results[1].is_ok());
        assert!(results[2].is_ok());
        // Exhausted first resolve (two attempts) plus one recovery fetch;
        // the late arrival is served from the cache.
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn demo_report_is_not_cached_and_recovery_is_queried() {
        let provider = FlakyProvider::new(2, Duration::ZERO);
        let service = flaky_service(provider.clone(), true);

        let first = service.get_weather(40.7128, -74.0060).await.expect("demo report");
        assert!(first.is_mock);
        assert_eq!(first.provider, "demo");
        assert_eq!(service.cache_snapshot().total_entries, 0);

        let second = service.get_weather(40.7128, -74.0060).await.expect("recovered fetch");
        assert!(!second.is_mock);
        assert_eq!(second.provider, "openmeteo");
        assert_eq!(service.cache_snapshot().total_entries, 1);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn distinct_keys_fetch_independently() {
        let provider = CountingProvider::new(Duration::ZERO);
        let service = service_with(provider.clone());

        service.get_weather(40.7128, -74.0060).await.expect("new york");
        service.get_weather(51.5074, -0.1278).await.expect("london");

        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_provider_bypasses_cache() {
        let provider = CountingProvider::new(Duration::ZERO);
        let service = service_with(provider.clone());

        service.test_provider("openmeteo", 40.7128, -74.0060).await.expect("direct call");
        service.test_provider("openmeteo", 40.7128, -74.0060).await.expect("direct call");

        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
        assert_eq!(service.cache_snapshot().total_entries, 0);
    }

    #[tokio::test]
    async fn test_provider_rejects_unknown_name() {
        let provider = CountingProvider::new(Duration::ZERO);
        let service = service_with(provider);

        let err = service.test_provider("doesnotexist", 0.0, 0.0).await.unwrap_err();
        assert!(matches!(err, WeatherError::UnknownProvider(_)));
    }
}
