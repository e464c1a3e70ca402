//! Weather log handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use tracing::info;

use crate::{AppError, AppState, AuthContext, SuccessResponse, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};
use gdash_core::models::{parse_timestamp, NewWeatherLog, WeatherLog, WeatherLogFilter};
use gdash_core::sample::sample_weather_log;

/// Query parameters shared by list, insights and export endpoints
#[derive(Debug, Default, Deserialize)]
pub struct WeatherQuery {
    /// Start of range (RFC 3339 or YYYY-MM-DD)
    pub from: Option<String>,
    /// End of range (RFC 3339, or YYYY-MM-DD for the whole day)
    pub to: Option<String>,
    /// Case-insensitive location substring
    pub location: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl WeatherQuery {
    /// Build a storage filter; pagination is only applied when `paginate` is set
    pub fn to_filter(&self, paginate: bool) -> Result<WeatherLogFilter, AppError> {
        let from = parse_bound(self.from.as_deref(), false)
            .map_err(|_| AppError::bad_request("Invalid 'from' (use RFC 3339 or YYYY-MM-DD)"))?;
        let to = parse_bound(self.to.as_deref(), true)
            .map_err(|_| AppError::bad_request("Invalid 'to' (use RFC 3339 or YYYY-MM-DD)"))?;

        if let (Some(from), Some(to)) = (from, to) {
            if from > to {
                return Err(AppError::bad_request("'from' must not be after 'to'"));
            }
        }

        let (limit, offset) = if paginate {
            (
                Some(
                    self.limit
                        .unwrap_or(DEFAULT_PAGE_LIMIT)
                        .clamp(1, MAX_PAGE_LIMIT),
                ),
                Some(self.offset.unwrap_or(0).max(0)),
            )
        } else {
            (None, None)
        };

        Ok(WeatherLogFilter {
            from,
            to,
            location: self
                .location
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            limit,
            offset,
        })
    }

    pub fn is_unfiltered(&self) -> bool {
        self.from.is_none() && self.to.is_none() && self.location.is_none()
    }
}

/// Parse a range bound; a bare date as an upper bound covers the whole day
fn parse_bound(value: Option<&str>, end_of_day: bool) -> Result<Option<DateTime<Utc>>, ()> {
    let Some(value) = value.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };

    if end_of_day {
        if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
            return date
                .and_hms_milli_opt(23, 59, 59, 999)
                .map(|dt| Some(dt.and_utc()))
                .ok_or(());
        }
    }

    parse_timestamp(value).map(Some).ok_or(())
}

fn has_data(log: &NewWeatherLog) -> bool {
    log.location.is_some()
        || log.temperature.is_some()
        || log.humidity.is_some()
        || log.wind_speed.is_some()
        || log.condition.is_some()
}

fn store(state: &AppState, log: &NewWeatherLog) -> Result<WeatherLog, AppError> {
    let id = state
        .db
        .insert_weather_log(log)
        .map_err(AppError::from_core)?
        .ok_or_else(|| AppError::conflict("Weather log already exists"))?;

    state
        .db
        .get_weather_log(id)?
        .ok_or_else(|| AppError::internal("Stored weather log could not be read back"))
}

/// GET /api/weather - List weather logs, newest first
pub async fn list_weather_logs(
    State(state): State<Arc<AppState>>,
    Query(params): Query<WeatherQuery>,
) -> Result<Json<Vec<WeatherLog>>, AppError> {
    let filter = params.to_filter(true)?;
    let logs = state.db.list_weather_logs(&filter)?;
    Ok(Json(logs))
}

/// GET /api/weather/:id - Get a single weather log
pub async fn get_weather_log(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<WeatherLog>, AppError> {
    let log = state
        .db
        .get_weather_log(id)?
        .ok_or_else(|| AppError::not_found("Weather log not found"))?;
    Ok(Json(log))
}

/// POST /api/weather - Record a weather log
///
/// The body is parsed leniently: malformed fields are dropped rather than
/// rejected. A missing timestamp means "now". Posting an identical reading
/// twice gives 409.
pub async fn create_weather_log(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Json(body): Json<WeatherLog>,
) -> Result<(StatusCode, Json<WeatherLog>), AppError> {
    let mut log = NewWeatherLog::from(body);
    if !has_data(&log) {
        return Err(AppError::bad_request("Weather log has no usable fields"));
    }
    if log.timestamp.is_none() {
        log.timestamp = Some(Utc::now());
    }
    // Resubmitting the same reading is a conflict, not a second row
    let log = log.with_import_hash();

    let stored = store(&state, &log)?;
    let id = stored.id.as_deref().and_then(|id| id.parse::<i64>().ok());

    state.db.log_audit(
        &auth.subject,
        "create",
        Some("weather_log"),
        id,
        log.source.as_deref(),
    )?;
    info!(user = %auth.subject, id = ?id, "Recorded weather log");

    Ok((StatusCode::CREATED, Json(stored)))
}

/// POST /api/weather/sample - Record a generated sample reading
pub async fn create_sample_weather_log(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
) -> Result<(StatusCode, Json<WeatherLog>), AppError> {
    let stored = store(&state, &sample_weather_log())?;
    let id = stored.id.as_deref().and_then(|id| id.parse::<i64>().ok());

    state
        .db
        .log_audit(&auth.subject, "create_sample", Some("weather_log"), id, None)?;

    Ok((StatusCode::CREATED, Json(stored)))
}

/// DELETE /api/weather/:id - Delete a weather log (admin)
pub async fn delete_weather_log(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> Result<Json<SuccessResponse>, AppError> {
    auth.require_admin()?;

    if !state.db.delete_weather_log(id)? {
        return Err(AppError::not_found("Weather log not found"));
    }

    state
        .db
        .log_audit(&auth.subject, "delete", Some("weather_log"), Some(id), None)?;

    Ok(Json(SuccessResponse { success: true }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_defaults_and_clamping() {
        let filter = WeatherQuery::default().to_filter(true).unwrap();
        assert_eq!(filter.limit, Some(DEFAULT_PAGE_LIMIT));
        assert_eq!(filter.offset, Some(0));

        let filter = WeatherQuery {
            limit: Some(50_000),
            offset: Some(-4),
            ..Default::default()
        }
        .to_filter(true)
        .unwrap();
        assert_eq!(filter.limit, Some(MAX_PAGE_LIMIT));
        assert_eq!(filter.offset, Some(0));

        let filter = WeatherQuery {
            limit: Some(5),
            ..Default::default()
        }
        .to_filter(false)
        .unwrap();
        assert_eq!(filter.limit, None);
    }

    #[test]
    fn test_query_date_bounds() {
        let filter = WeatherQuery {
            from: Some("2024-01-15".to_string()),
            to: Some("2024-01-15".to_string()),
            ..Default::default()
        }
        .to_filter(false)
        .unwrap();

        assert_eq!(filter.from.unwrap().to_rfc3339(), "2024-01-15T00:00:00+00:00");
        assert_eq!(
            filter.to.unwrap().to_rfc3339(),
            "2024-01-15T23:59:59.999+00:00"
        );
    }

    #[test]
    fn test_query_rejects_bad_dates() {
        let err = WeatherQuery {
            from: Some("last tuesday".to_string()),
            ..Default::default()
        }
        .to_filter(true)
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let err = WeatherQuery {
            from: Some("2024-02-01".to_string()),
            to: Some("2024-01-01".to_string()),
            ..Default::default()
        }
        .to_filter(true)
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}
