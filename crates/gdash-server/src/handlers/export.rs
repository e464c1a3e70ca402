//! Weather log export handlers

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, Response, StatusCode},
    Extension,
};
use tracing::info;

use super::weather::WeatherQuery;
use crate::{AppError, AppState, AuthContext};
use gdash_core::export::ExportFormat;

/// GET /api/weather/export.csv - Download weather logs as CSV
pub async fn export_weather_csv(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Query(params): Query<WeatherQuery>,
) -> Result<Response<Body>, AppError> {
    export_weather(&state, &auth, &params, ExportFormat::Csv)
}

/// GET /api/weather/export.json - Download weather logs as JSON
pub async fn export_weather_json(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Query(params): Query<WeatherQuery>,
) -> Result<Response<Body>, AppError> {
    export_weather(&state, &auth, &params, ExportFormat::Json)
}

fn export_weather(
    state: &AppState,
    auth: &AuthContext,
    params: &WeatherQuery,
    format: ExportFormat,
) -> Result<Response<Body>, AppError> {
    let filter = params.to_filter(false)?;
    let content = state.db.export_weather(&filter, format)?;

    state.db.log_audit(
        &auth.subject,
        "export",
        Some("weather_log"),
        None,
        Some(&format!("format={}", format.extension())),
    )?;
    info!(user = %auth.subject, format = format.extension(), "Exported weather logs");

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, format.content_type())
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", format.file_name()),
        )
        .body(Body::from(content))?;

    Ok(response)
}
