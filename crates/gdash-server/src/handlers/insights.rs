//! Weather insights handler

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use tracing::debug;

use super::weather::WeatherQuery;
use crate::{AppError, AppState};
use gdash_core::insights::WeatherInsights;

/// GET /api/weather/insights - Aggregate statistics over stored logs
///
/// Without query parameters every stored log is considered. `from`, `to`
/// and `location` narrow the set; pagination parameters are ignored.
pub async fn get_weather_insights(
    State(state): State<Arc<AppState>>,
    Query(params): Query<WeatherQuery>,
) -> Result<Json<WeatherInsights>, AppError> {
    let logs = if params.is_unfiltered() {
        state.db.all_weather_logs()?
    } else {
        state.db.list_weather_logs(&params.to_filter(false)?)?
    };

    let insights = state.engine.compute(&logs);
    debug!(
        count = insights.count,
        trend = ?insights.trend,
        "Computed weather insights"
    );

    Ok(Json(insights))
}
