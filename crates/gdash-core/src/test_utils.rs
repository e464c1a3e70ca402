//! Test utilities for gdash-core
//!
//! Provides a mock Open-Meteo server so collector code can be exercised
//! without network access.

use axum::{extract::Query, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde::Deserialize;
use serde_json::json;
use std::net::SocketAddr;
use tokio::sync::oneshot;

/// Mock Open-Meteo forecast API
pub struct MockOpenMeteoServer {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockOpenMeteoServer {
    /// Start a server that answers `/v1/forecast` with fixed current conditions
    pub async fn start() -> Self {
        Self::serve(Router::new().route("/v1/forecast", get(handle_forecast))).await
    }

    /// Start a server whose forecast endpoint always returns 503
    pub async fn start_failing() -> Self {
        Self::serve(Router::new().route("/v1/forecast", get(handle_unavailable))).await
    }

    async fn serve(app: Router) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .unwrap();
        });

        Self {
            addr,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Base URL to hand to `OpenMeteoProvider`
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockOpenMeteoServer {
    fn drop(&mut self) {
        self.stop();
    }
}

#[derive(Debug, Deserialize)]
struct ForecastQuery {
    latitude: f64,
    longitude: f64,
    current: Option<String>,
}

async fn handle_forecast(Query(query): Query<ForecastQuery>) -> impl IntoResponse {
    if query.current.is_none() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": true, "reason": "current parameter required"})),
        );
    }

    (
        StatusCode::OK,
        Json(json!({
            "latitude": query.latitude,
            "longitude": query.longitude,
            "timezone": "UTC",
            "current_units": {
                "time": "iso8601",
                "temperature_2m": "°C",
                "relative_humidity_2m": "%",
                "wind_speed_10m": "km/h",
                "weather_code": "wmo code"
            },
            "current": {
                "time": "2024-01-15T10:00",
                "interval": 900,
                "temperature_2m": 27.5,
                "relative_humidity_2m": 61,
                "wind_speed_10m": 8.3,
                "weather_code": 2
            }
        })),
    )
}

async fn handle_unavailable() -> impl IntoResponse {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({"error": true, "reason": "upstream unavailable"})),
    )
}
