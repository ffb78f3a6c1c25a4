use crate::provider::ProviderId;

/// Typed errors for the aggregation core.
///
/// Adapter-level failures (`MissingCredential`, `UpstreamStatus`,
/// `UpstreamDecode`, `Network`) are caught by the fallback orchestrator and
/// converted into an attempt on the next provider; only
/// `AllProvidersExhausted` is user-visible.
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("invalid coordinates ({lat}, {lon}): latitude must be in [-90, 90], longitude in [-180, 180]")]
    InvalidCoordinates { lat: f64, lon: f64 },

    #[error("provider '{provider}' has no API key configured")]
    MissingCredential { provider: ProviderId },

    #[error("provider '{provider}' responded with HTTP {status}")]
    UpstreamStatus { provider: ProviderId, status: u16 },

    #[error("provider '{provider}' response could not be decoded: {detail}")]
    UpstreamDecode { provider: ProviderId, detail: String },

    #[error("provider '{provider}' request failed: {source}")]
    Network {
        provider: ProviderId,
        #[source]
        source: reqwest::Error,
    },

    #[error(
        "all providers exhausted: '{primary}' failed ({primary_error}); '{fallback}' failed ({fallback_error})"
    )]
    AllProvidersExhausted {
        primary: ProviderId,
        primary_error: String,
        fallback: ProviderId,
        fallback_error: String,
    },

    #[error("unknown provider '{0}'")]
    UnknownProvider(String),
}

impl WeatherError {
    /// Whether the orchestrator should move on to the next provider in the
    /// chain after this failure.
    pub fn triggers_fallback(&self) -> bool {
        matches!(
            self,
            WeatherError::MissingCredential { .. }
                | WeatherError::UpstreamStatus { .. }
                | WeatherError::UpstreamDecode { .. }
                | WeatherError::Network { .. }
        )
    }
}
