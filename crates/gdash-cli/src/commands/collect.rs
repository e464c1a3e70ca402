//! One-shot collection from Open-Meteo

use std::path::Path;

use anyhow::{Context, Result};
use gdash_core::collector::{collect_once, CollectorConfig, OpenMeteoProvider, WeatherProvider};
use gdash_core::db::Database;

pub async fn cmd_collect(db: &Database, config_path: Option<&Path>) -> Result<()> {
    let config = CollectorConfig::load(config_path).context("Failed to load collector config")?;
    let provider = OpenMeteoProvider::from_config(&config)?;
    collect_with(db, &provider, &config).await
}

/// Collect one reading with any provider
pub async fn collect_with(
    db: &Database,
    provider: &dyn WeatherProvider,
    config: &CollectorConfig,
) -> Result<()> {
    println!(
        "📡 Fetching current conditions for {} ({:.4}, {:.4}) from {}...",
        config.station.name,
        config.station.latitude,
        config.station.longitude,
        provider.name()
    );

    let log = collect_once(db, provider, config)
        .await
        .context("Collection failed")?;
    let id = log.id.as_deref().and_then(|id| id.parse::<i64>().ok());
    db.log_audit("cli", "collect", Some("weather_log"), id, Some(provider.name()))?;

    println!(
        "✅ Stored reading #{}: {} °C, {}% humidity, {} km/h, {}",
        log.id.as_deref().unwrap_or("-"),
        log.temperature
            .map(|t| format!("{:.1}", t))
            .unwrap_or_else(|| "-".to_string()),
        log.humidity
            .map(|h| format!("{:.0}", h))
            .unwrap_or_else(|| "-".to_string()),
        log.wind_speed
            .map(|w| format!("{:.1}", w))
            .unwrap_or_else(|| "-".to_string()),
        log.condition.as_deref().unwrap_or("-"),
    );

    Ok(())
}
