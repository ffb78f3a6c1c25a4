//! HTTP surface for the weather aggregation core.
//!
//! Thin by design: routing, query parsing, and error-to-status mapping live
//! here; everything else is `weather-core`.

use axum::{Router, routing::get};

pub mod handlers;
pub mod state;

pub use state::AppState;

pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/api/weather", get(handlers::get_weather))
        .route("/api/weather/test", get(handlers::test_provider))
        .route("/api/weather/cache", get(handlers::cache_snapshot))
        .route("/api/status", get(handlers::status))
        .with_state(app_state)
}
