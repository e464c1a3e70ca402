//! Weather log operations

use rusqlite::{params, Row};
use tracing::debug;

use super::{format_timestamp, Database};
use crate::error::{Error, Result};
use crate::models::{is_storable_timestamp, parse_timestamp, NewWeatherLog, WeatherLog, WeatherLogFilter};

const WEATHER_COLUMNS: &str =
    "id, timestamp, location, temperature, humidity, wind_speed, condition, source";

fn row_to_weather_log(row: &Row) -> rusqlite::Result<WeatherLog> {
    let id: i64 = row.get(0)?;
    let timestamp: Option<String> = row.get(1)?;

    Ok(WeatherLog {
        id: Some(id.to_string()),
        timestamp: timestamp.as_deref().and_then(parse_timestamp),
        location: row.get(2)?,
        temperature: row.get(3)?,
        humidity: row.get(4)?,
        wind_speed: row.get(5)?,
        condition: row.get(6)?,
        source: row.get(7)?,
    })
}

/// WHERE clause and parameters for a [`WeatherLogFilter`]
fn filter_clause(filter: &WeatherLogFilter) -> (String, Vec<Box<dyn rusqlite::ToSql>>) {
    let mut conditions = Vec::new();
    let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

    if let Some(from) = filter.from {
        conditions.push("timestamp >= ?");
        params.push(Box::new(format_timestamp(&from)));
    }
    if let Some(to) = filter.to {
        conditions.push("timestamp <= ?");
        params.push(Box::new(format_timestamp(&to)));
    }
    if let Some(location) = filter.location.as_deref().map(str::trim) {
        if !location.is_empty() {
            conditions.push("LOWER(location) LIKE '%' || LOWER(?) || '%'");
            params.push(Box::new(location.to_string()));
        }
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    (where_clause, params)
}

impl Database {
    /// Store a weather log
    ///
    /// Returns `None` when a log with the same import hash already exists.
    /// Timestamps outside years 0000..=9999 are rejected.
    pub fn insert_weather_log(&self, log: &NewWeatherLog) -> Result<Option<i64>> {
        if let Some(ts) = log.timestamp.as_ref().filter(|ts| !is_storable_timestamp(ts)) {
            return Err(Error::InvalidData(format!(
                "Timestamp out of storable range: {}",
                ts
            )));
        }

        let conn = self.conn()?;

        let inserted = conn.execute(
            r#"
            INSERT OR IGNORE INTO weather_logs
                (timestamp, location, temperature, humidity, wind_speed, condition, source, import_hash)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                log.timestamp.as_ref().map(format_timestamp),
                log.location,
                log.temperature,
                log.humidity,
                log.wind_speed,
                log.condition,
                log.source,
                log.import_hash,
            ],
        )?;

        if inserted == 0 {
            debug!(hash = ?log.import_hash, "Skipped duplicate weather log");
            return Ok(None);
        }

        Ok(Some(conn.last_insert_rowid()))
    }

    /// Get a weather log by ID
    pub fn get_weather_log(&self, id: i64) -> Result<Option<WeatherLog>> {
        let conn = self.conn()?;
        let log = conn
            .query_row(
                &format!("SELECT {} FROM weather_logs WHERE id = ?", WEATHER_COLUMNS),
                params![id],
                row_to_weather_log,
            )
            .ok();

        Ok(log)
    }

    /// List weather logs matching a filter, newest first
    ///
    /// Undated logs sort last and are excluded whenever the filter has time bounds.
    pub fn list_weather_logs(&self, filter: &WeatherLogFilter) -> Result<Vec<WeatherLog>> {
        let conn = self.conn()?;
        let (where_clause, mut params) = filter_clause(filter);

        let mut sql = format!(
            "SELECT {} FROM weather_logs {} ORDER BY timestamp IS NULL, timestamp DESC, id DESC",
            WEATHER_COLUMNS, where_clause
        );

        if filter.limit.is_some() || filter.offset.is_some() {
            sql.push_str(" LIMIT ? OFFSET ?");
            params.push(Box::new(filter.limit.unwrap_or(-1)));
            params.push(Box::new(filter.offset.unwrap_or(0).max(0)));
        }

        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();
        let mut stmt = conn.prepare(&sql)?;
        let logs = stmt
            .query_map(param_refs.as_slice(), row_to_weather_log)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(logs)
    }

    /// All weather logs, oldest first (the input for insights and exports)
    pub fn all_weather_logs(&self) -> Result<Vec<WeatherLog>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM weather_logs ORDER BY timestamp IS NULL, timestamp ASC, id ASC",
            WEATHER_COLUMNS
        ))?;

        let logs = stmt
            .query_map([], row_to_weather_log)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(logs)
    }

    /// Count weather logs matching a filter (ignores limit/offset)
    pub fn count_weather_logs(&self, filter: &WeatherLogFilter) -> Result<i64> {
        let conn = self.conn()?;
        let (where_clause, params) = filter_clause(filter);
        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let count = conn.query_row(
            &format!("SELECT COUNT(*) FROM weather_logs {}", where_clause),
            param_refs.as_slice(),
            |row| row.get(0),
        )?;

        Ok(count)
    }

    /// Delete a weather log; returns false if it did not exist
    pub fn delete_weather_log(&self, id: i64) -> Result<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM weather_logs WHERE id = ?", params![id])?;
        Ok(deleted > 0)
    }

    /// Delete every weather log; returns how many were removed
    pub fn clear_weather_logs(&self) -> Result<usize> {
        let conn = self.conn()?;
        Ok(conn.execute("DELETE FROM weather_logs", [])?)
    }

    /// Timestamp of the newest dated reading
    pub fn latest_weather_timestamp(&self) -> Result<Option<String>> {
        let conn = self.conn()?;
        let latest = conn.query_row("SELECT MAX(timestamp) FROM weather_logs", [], |row| {
            row.get::<_, Option<String>>(0)
        })?;
        Ok(latest)
    }
}
