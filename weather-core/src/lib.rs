//! Core library for the weather aggregation service.
//!
//! This crate defines:
//! - The canonical weather report all providers normalize into
//! - Abstraction over weather providers (five upstream adapters)
//! - Provider registry, primary/fallback orchestration
//! - TTL response cache with single-flight request coalescing
//! - The request façade consumed by the HTTP surface
//!
//! It is used by `weather-server`, but can also be reused by other binaries
//! or services.

pub mod cache;
pub mod config;
pub mod error;
pub mod fallback;
pub mod model;
pub mod provider;
pub mod registry;
pub mod service;

pub use cache::{CacheSnapshot, WeatherCache};
pub use config::Config;
pub use error::WeatherError;
pub use fallback::FallbackChain;
pub use model::{Coordinates, ProviderAvailability, WeatherReport};
pub use provider::{ProviderId, WeatherProvider};
pub use registry::ProviderRegistry;
pub use service::WeatherService;
