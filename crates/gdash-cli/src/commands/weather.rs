//! Weather log commands (logs, add, sample, insights)

use anyhow::{Context, Result};
use chrono::Utc;
use gdash_core::db::Database;
use gdash_core::insights::InsightsEngine;
use gdash_core::models::{NewWeatherLog, WeatherLog, WeatherLogFilter};
use gdash_core::sample::sample_weather_log;

use super::{parse_date_arg, truncate};

/// Source tag for readings entered on the command line
pub const MANUAL_SOURCE: &str = "manual";

pub fn cmd_logs(db: &Database, limit: i64) -> Result<()> {
    let logs = db.list_weather_logs(&WeatherLogFilter {
        limit: Some(limit.max(1)),
        ..Default::default()
    })?;

    if logs.is_empty() {
        println!("No weather logs found. Try 'gdash sample' or 'gdash import'.");
        return Ok(());
    }

    println!();
    println!(
        "  {:>5}  {:20}  {:24}  {:>7}  {:>5}  {:>6}  {}",
        "ID", "Time (UTC)", "Location", "Temp °C", "Hum %", "km/h", "Condition"
    );
    println!("  {}", "─".repeat(90));
    for log in &logs {
        print_log_row(log);
    }
    println!();
    println!("  {} of {} logs", logs.len(), db.count_weather_logs(&Default::default())?);

    Ok(())
}

fn print_log_row(log: &WeatherLog) {
    fn num(v: Option<f64>, digits: usize) -> String {
        v.map(|n| format!("{:.*}", digits, n))
            .unwrap_or_else(|| "-".to_string())
    }

    println!(
        "  {:>5}  {:20}  {:24}  {:>7}  {:>5}  {:>6}  {}",
        log.id.as_deref().unwrap_or("-"),
        log.timestamp
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_string()),
        truncate(log.location.as_deref().unwrap_or("-"), 24),
        num(log.temperature, 1),
        num(log.humidity, 0),
        num(log.wind_speed, 1),
        log.condition.as_deref().unwrap_or("-"),
    );
}

/// Build a reading from `gdash add` flags
pub fn manual_log(
    location: Option<String>,
    temperature: Option<f64>,
    humidity: Option<f64>,
    wind_speed: Option<f64>,
    condition: Option<String>,
    timestamp: Option<&str>,
) -> Result<NewWeatherLog> {
    let timestamp = match timestamp {
        Some(s) => parse_date_arg(s, false)?,
        None => Utc::now(),
    };

    let log = NewWeatherLog {
        timestamp: Some(timestamp),
        location: location.filter(|s| !s.trim().is_empty()),
        temperature: temperature.filter(|n| n.is_finite()),
        humidity: humidity.filter(|n| n.is_finite()),
        wind_speed: wind_speed.filter(|n| n.is_finite()),
        condition: condition.filter(|s| !s.trim().is_empty()),
        source: Some(MANUAL_SOURCE.to_string()),
        import_hash: None,
    };

    if log.location.is_none()
        && log.temperature.is_none()
        && log.humidity.is_none()
        && log.wind_speed.is_none()
        && log.condition.is_none()
    {
        anyhow::bail!("Nothing to record: pass at least one of --location, --temperature, --humidity, --wind-speed, --condition");
    }

    Ok(log.with_import_hash())
}

pub fn cmd_add(db: &Database, log: NewWeatherLog) -> Result<()> {
    match db.insert_weather_log(&log)? {
        Some(id) => {
            db.log_audit("cli", "create", Some("weather_log"), Some(id), Some(MANUAL_SOURCE))?;
            println!("✅ Recorded weather log #{}", id);
        }
        None => println!("⏭️  Identical reading already recorded, skipped"),
    }
    Ok(())
}

pub fn cmd_sample(db: &Database, count: usize) -> Result<()> {
    let mut stored = 0;
    for _ in 0..count.max(1) {
        let log = sample_weather_log();
        if let Some(id) = db.insert_weather_log(&log)? {
            db.log_audit("cli", "create_sample", Some("weather_log"), Some(id), None)?;
            println!(
                "   #{} {} {:.1} °C, {:.0}% humidity",
                id,
                log.location.as_deref().unwrap_or("-"),
                log.temperature.unwrap_or_default(),
                log.humidity.unwrap_or_default(),
            );
            stored += 1;
        }
    }

    println!("✅ Recorded {} sample reading(s)", stored);
    Ok(())
}

pub fn cmd_insights(db: &Database, filter: &WeatherLogFilter, json: bool) -> Result<()> {
    let logs = if filter.has_time_bounds() || filter.location.is_some() {
        db.list_weather_logs(filter)?
    } else {
        db.all_weather_logs()?
    };
    let insights = InsightsEngine::new().compute(&logs);

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&insights).context("Failed to serialize insights")?
        );
        return Ok(());
    }

    println!();
    println!("🌤️  Weather Insights");
    println!("   ─────────────────────────────");
    for card in insights.display_rows() {
        println!("   {:24} {}", card.label, card.value);
    }
    println!();
    println!("   {}", insights.summary);
    println!();

    Ok(())
}
