//! HTTP request handlers.
//!
//! Each handler extracts query parameters, calls the request façade, and
//! maps typed core errors onto HTTP statuses. No weather logic lives here.

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};
use serde::Serialize;
use serde_json::{Value, json};
use std::collections::HashMap;

use weather_core::{WeatherError, WeatherReport};

use crate::state::AppState;

/// Wire shape of a weather response: the canonical record plus the
/// product-level `mockData` flag the client branches on.
#[derive(Serialize)]
struct WeatherResponse {
    #[serde(flatten)]
    report: WeatherReport,
    #[serde(rename = "mockData")]
    mock_data: bool,
}

impl From<WeatherReport> for WeatherResponse {
    fn from(report: WeatherReport) -> Self {
        let mock_data = report.is_mock;
        Self { report, mock_data }
    }
}

/// `GET /api/weather?lat=<f64>&lon=<f64>`
pub async fn get_weather(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> (StatusCode, Json<Value>) {
    let (lat, lon) = match parse_coords(&params) {
        Ok(pair) => pair,
        Err(msg) => return bad_request(msg),
    };

    match state.service.get_weather(lat, lon).await {
        Ok(report) => {
            let body = serde_json::to_value(WeatherResponse::from(report))
                .unwrap_or_else(|_| json!({"error": "serialization failure"}));
            (StatusCode::OK, Json(body))
        }
        Err(err) => error_response(err),
    }
}

/// `GET /api/weather/test?provider=<name>&lat=<f64>&lon=<f64>`
///
/// Diagnostic path: one named adapter, no cache, no fallback.
pub async fn test_provider(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> (StatusCode, Json<Value>) {
    let Some(provider) = params.get("provider").cloned() else {
        return bad_request("missing 'provider' query parameter".to_string());
    };
    let (lat, lon) = match parse_coords(&params) {
        Ok(pair) => pair,
        Err(msg) => return bad_request(msg),
    };

    match state.service.test_provider(&provider, lat, lon).await {
        Ok(report) => {
            let mut body = serde_json::to_value(&report).unwrap_or_default();
            if let Some(obj) = body.as_object_mut() {
                obj.insert("success".to_string(), json!(true));
            }
            (StatusCode::OK, Json(body))
        }
        Err(err) => {
            let status = status_for(&err);
            let body = json!({
                "provider": provider,
                "success": false,
                "error": err.to_string(),
            });
            (status, Json(body))
        }
    }
}

/// `GET /api/weather/cache`, diagnostics only.
pub async fn cache_snapshot(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let body = serde_json::to_value(state.service.cache_snapshot())
        .unwrap_or_else(|_| json!({"error": "serialization failure"}));
    (StatusCode::OK, Json(body))
}

/// `GET /api/status` reports credential presence and provider availability,
/// never the key values themselves.
pub async fn status(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let providers = state.service.registry().describe_all();
    let chain = state.service.chain();

    let body = json!({
        "apiKey": {
            "hasKey": state.has_api_key,
            "status": if state.has_api_key { "configured" } else { "missing" },
        },
        "providers": providers,
        "defaultChain": {
            "primary": chain.primary.to_string(),
            "fallback": chain.fallback.to_string(),
        },
    });
    (StatusCode::OK, Json(body))
}

fn parse_coords(params: &HashMap<String, String>) -> Result<(f64, f64), String> {
    let lat = params
        .get("lat")
        .ok_or_else(|| "missing 'lat' query parameter".to_string())?
        .parse::<f64>()
        .map_err(|_| "'lat' must be a number".to_string())?;
    let lon = params
        .get("lon")
        .ok_or_else(|| "missing 'lon' query parameter".to_string())?
        .parse::<f64>()
        .map_err(|_| "'lon' must be a number".to_string())?;
    Ok((lat, lon))
}

fn bad_request(msg: String) -> (StatusCode, Json<Value>) {
    (StatusCode::BAD_REQUEST, Json(json!({"error": msg})))
}

fn status_for(err: &WeatherError) -> StatusCode {
    match err {
        WeatherError::InvalidCoordinates { .. } => StatusCode::BAD_REQUEST,
        WeatherError::UnknownProvider(_) => StatusCode::NOT_FOUND,
        WeatherError::AllProvidersExhausted { .. }
        | WeatherError::UpstreamStatus { .. }
        | WeatherError::UpstreamDecode { .. }
        | WeatherError::Network { .. } => StatusCode::BAD_GATEWAY,
        WeatherError::MissingCredential { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(err: WeatherError) -> (StatusCode, Json<Value>) {
    (status_for(&err), Json(json!({"error": err.to_string()})))
}
