//! Weather log export
//!
//! Supports:
//! - CSV with a fixed header, readable by the CSV importer
//! - JSON array of records, readable by the JSON importer

use csv::WriterBuilder;
use serde::Serialize;
use tracing::debug;

use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::{WeatherLog, WeatherLogFilter};

/// Header row of the CSV export
pub const CSV_EXPORT_HEADER: [&str; 8] = [
    "id",
    "timestamp",
    "location",
    "temperature",
    "humidity",
    "windSpeed",
    "condition",
    "source",
];

/// Export format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Csv => "text/csv; charset=utf-8",
            Self::Json => "application/json",
        }
    }

    /// Download file name
    pub fn file_name(&self) -> String {
        format!("weather_logs.{}", self.extension())
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            "xlsx" => Err("XLSX export is not supported; use csv or json".to_string()),
            _ => Err(format!("Unknown export format: {}", s)),
        }
    }
}

/// One CSV row; missing values become empty cells
#[derive(Serialize)]
struct CsvRow<'a> {
    id: &'a str,
    timestamp: String,
    location: &'a str,
    temperature: Option<f64>,
    humidity: Option<f64>,
    #[serde(rename = "windSpeed")]
    wind_speed: Option<f64>,
    condition: &'a str,
    source: &'a str,
}

impl<'a> From<&'a WeatherLog> for CsvRow<'a> {
    fn from(log: &'a WeatherLog) -> Self {
        Self {
            id: log.id.as_deref().unwrap_or(""),
            timestamp: log.timestamp.map(|t| t.to_rfc3339()).unwrap_or_default(),
            location: log.location.as_deref().unwrap_or(""),
            temperature: log.temperature,
            humidity: log.humidity,
            wind_speed: log.wind_speed,
            condition: log.condition.as_deref().unwrap_or(""),
            source: log.source.as_deref().unwrap_or(""),
        }
    }
}

/// Render logs as CSV
pub fn weather_logs_to_csv(logs: &[WeatherLog]) -> Result<String> {
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(vec![]);

    // Written explicitly so an empty export still has a header
    writer.write_record(CSV_EXPORT_HEADER)?;
    for log in logs {
        writer.serialize(CsvRow::from(log))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| Error::InvalidData(format!("Failed to finish CSV export: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| Error::InvalidData(e.to_string()))
}

/// Render logs as a pretty-printed JSON array
pub fn weather_logs_to_json(logs: &[WeatherLog]) -> Result<String> {
    Ok(serde_json::to_string_pretty(logs)?)
}

impl Database {
    /// Logs matching the filter in chronological order
    fn logs_for_export(&self, filter: &WeatherLogFilter) -> Result<Vec<WeatherLog>> {
        let mut logs = self.list_weather_logs(filter)?;
        logs.reverse();
        debug!(count = logs.len(), "Collected weather logs for export");
        Ok(logs)
    }

    /// Export weather logs to CSV
    pub fn export_weather_csv(&self, filter: &WeatherLogFilter) -> Result<String> {
        weather_logs_to_csv(&self.logs_for_export(filter)?)
    }

    /// Export weather logs to JSON
    pub fn export_weather_json(&self, filter: &WeatherLogFilter) -> Result<String> {
        weather_logs_to_json(&self.logs_for_export(filter)?)
    }

    /// Export in the requested format
    pub fn export_weather(&self, filter: &WeatherLogFilter, format: ExportFormat) -> Result<String> {
        match format {
            ExportFormat::Csv => self.export_weather_csv(filter),
            ExportFormat::Json => self.export_weather_json(filter),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::{parse_weather_csv, parse_weather_json};
    use crate::models::NewWeatherLog;
    use chrono::{TimeZone, Utc};

    fn seed(db: &Database) {
        db.insert_weather_log(&NewWeatherLog {
            timestamp: Some(Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap()),
            location: Some("Fortaleza, BR".to_string()),
            temperature: Some(31.2),
            humidity: Some(70.0),
            wind_speed: None,
            condition: Some("clear".to_string()),
            source: Some("sample".to_string()),
            import_hash: None,
        })
        .unwrap();
        db.insert_weather_log(&NewWeatherLog {
            timestamp: Some(Utc.with_ymd_and_hms(2024, 1, 15, 11, 0, 0).unwrap()),
            temperature: Some(30.0),
            ..Default::default()
        })
        .unwrap();
    }

    #[test]
    fn test_csv_export_header_and_rows() {
        let db = Database::in_memory().unwrap();
        seed(&db);

        let csv = db.export_weather_csv(&WeatherLogFilter::default()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(
            lines[0],
            "id,timestamp,location,temperature,humidity,windSpeed,condition,source"
        );
        assert_eq!(lines.len(), 3);
        // Chronological, quoted location, empty wind speed
        assert!(lines[1].contains("\"Fortaleza, BR\",31.2,70.0,,clear,sample"));
        assert!(lines[2].ends_with(",30.0,,,,"));
    }

    #[test]
    fn test_empty_csv_export_has_header() {
        let csv = weather_logs_to_csv(&[]).unwrap();
        assert_eq!(
            csv.trim_end(),
            "id,timestamp,location,temperature,humidity,windSpeed,condition,source"
        );
    }

    #[test]
    fn test_exports_reimport() {
        let db = Database::in_memory().unwrap();
        seed(&db);

        let csv = db.export_weather_csv(&WeatherLogFilter::default()).unwrap();
        let from_csv = parse_weather_csv(csv.as_bytes()).unwrap();
        assert_eq!(from_csv.len(), 2);
        assert_eq!(from_csv[0].temperature, Some(31.2));
        assert_eq!(from_csv[0].location.as_deref(), Some("Fortaleza, BR"));

        let json = db.export_weather_json(&WeatherLogFilter::default()).unwrap();
        let from_json = parse_weather_json(json.as_bytes()).unwrap();
        assert_eq!(from_json.len(), 2);
        assert_eq!(from_json[1].temperature, Some(30.0));
        assert!(from_json[1].location.is_none());
    }

    #[test]
    fn test_format_parse() {
        assert_eq!("CSV".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert_eq!("json".parse::<ExportFormat>().unwrap(), ExportFormat::Json);
        assert!("xlsx".parse::<ExportFormat>().is_err());
        assert_eq!(ExportFormat::Csv.file_name(), "weather_logs.csv");
    }
}
