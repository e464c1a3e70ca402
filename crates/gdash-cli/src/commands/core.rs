//! Core command implementations and shared utilities
//!
//! This module contains:
//! - `open_db` - Shared utility to open the database
//! - `build_filter` - Date/location filter from command-line flags
//! - `cmd_init` - Initialize the database

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use gdash_core::db::Database;
use gdash_core::models::{parse_timestamp, WeatherLogFilter};

/// Open database with encryption by default, or unencrypted if --no-encrypt
pub fn open_db(db_path: &Path, no_encrypt: bool) -> Result<Database> {
    let path_str = db_path
        .to_str()
        .with_context(|| format!("Database path is not valid UTF-8: {}", db_path.display()))?;
    if no_encrypt {
        Database::new_unencrypted(path_str).context("Failed to open database (unencrypted)")
    } else {
        Database::new(path_str).context("Failed to open database")
    }
}

/// Parse a date flag; a bare date as the upper bound covers the whole day
pub fn parse_date_arg(value: &str, end_of_day: bool) -> Result<DateTime<Utc>> {
    if end_of_day {
        if let Ok(date) = NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d") {
            if let Some(dt) = date.and_hms_milli_opt(23, 59, 59, 999) {
                return Ok(dt.and_utc());
            }
        }
    }

    parse_timestamp(value)
        .ok_or_else(|| anyhow::anyhow!("Invalid date '{}' (use YYYY-MM-DD or RFC 3339)", value))
}

/// Build a weather log filter from --from/--to/--location
pub fn build_filter(
    from: Option<&str>,
    to: Option<&str>,
    location: Option<&str>,
) -> Result<WeatherLogFilter> {
    let from = from.map(|s| parse_date_arg(s, false)).transpose()?;
    let to = to.map(|s| parse_date_arg(s, true)).transpose()?;

    if let (Some(from), Some(to)) = (from, to) {
        if from > to {
            anyhow::bail!("--from must not be after --to");
        }
    }

    Ok(WeatherLogFilter {
        from,
        to,
        location: location
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string),
        ..Default::default()
    })
}

pub fn cmd_init(db_path: &Path, no_encrypt: bool) -> Result<()> {
    println!("🔧 Initializing database at {}...", db_path.display());

    let db = open_db(db_path, no_encrypt)?;

    if no_encrypt {
        println!("   ⚠️  Encryption: DISABLED (--no-encrypt)");
    } else {
        println!("   🔒 Encryption: ENABLED");
    }

    if db.count_users()? == 0 {
        println!("   No users yet");
    }

    println!("✅ Database initialized successfully!");
    println!();
    println!("Next steps:");
    println!("  1. Create an admin: gdash users add --name Admin --email you@example.com --admin");
    println!("  2. Import readings: gdash import --file weather_logs.csv");
    println!("  3. Start web UI: gdash serve");

    Ok(())
}
