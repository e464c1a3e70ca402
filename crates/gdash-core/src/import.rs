//! Weather log import from JSON and CSV files
//!
//! Both parsers are lenient per field: a malformed cell leaves that field
//! missing instead of rejecting the row. Every parsed record carries an
//! import hash, so importing the same file twice stores nothing new.

use csv::{ReaderBuilder, StringRecord, Trim};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::Read;
use tracing::{debug, info};

use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::{parse_timestamp, NewWeatherLog, WeatherLog};

/// Columns written by the exporter and accepted by the CSV importer
pub const CSV_IMPORT_COLUMNS: [&str; 7] = [
    "timestamp",
    "location",
    "temperature",
    "humidity",
    "windSpeed",
    "condition",
    "source",
];

/// Outcome of an import run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportStats {
    /// Records read from the file
    pub parsed: usize,
    /// Records stored
    pub imported: usize,
    /// Records already present (same import hash)
    pub duplicates: usize,
    /// Records with no usable field at all
    pub skipped: usize,
}

/// Supported import file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportFormat {
    Json,
    Csv,
}

impl ImportFormat {
    /// Guess the format from a file extension
    pub fn from_path(path: &std::path::Path) -> Option<Self> {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("json") => Some(Self::Json),
            Some("csv") => Some(Self::Csv),
            _ => None,
        }
    }
}

/// Parse a JSON document holding one record or an array of records
pub fn parse_weather_json<R: Read>(reader: R) -> Result<Vec<NewWeatherLog>> {
    let value: Value = serde_json::from_reader(reader)?;

    if !matches!(value, Value::Array(_) | Value::Object(_)) {
        return Err(Error::Import(
            "Expected a JSON array of weather logs".to_string(),
        ));
    }

    let logs: Vec<NewWeatherLog> = WeatherLog::many_from_json(&value)
        .into_iter()
        .map(|log| NewWeatherLog::from(log).with_import_hash())
        .collect();

    debug!(count = logs.len(), "Parsed weather JSON");
    Ok(logs)
}

/// Column positions resolved from a CSV header row
#[derive(Debug, Default)]
struct CsvColumns {
    timestamp: Option<usize>,
    location: Option<usize>,
    temperature: Option<usize>,
    humidity: Option<usize>,
    wind_speed: Option<usize>,
    condition: Option<usize>,
    source: Option<usize>,
}

impl CsvColumns {
    fn from_headers(headers: &StringRecord) -> Result<Self> {
        let mut columns = Self::default();
        for (i, header) in headers.iter().enumerate() {
            let key: String = header
                .trim()
                .chars()
                .filter(|c| c.is_ascii_alphanumeric())
                .collect::<String>()
                .to_ascii_lowercase();
            let slot = match key.as_str() {
                "timestamp" | "time" | "date" => &mut columns.timestamp,
                "location" => &mut columns.location,
                "temperature" | "temp" => &mut columns.temperature,
                "humidity" => &mut columns.humidity,
                "windspeed" | "wind" => &mut columns.wind_speed,
                "condition" => &mut columns.condition,
                "source" => &mut columns.source,
                _ => continue,
            };
            slot.get_or_insert(i);
        }

        let known = [
            columns.timestamp,
            columns.location,
            columns.temperature,
            columns.humidity,
            columns.wind_speed,
            columns.condition,
            columns.source,
        ];
        if known.iter().all(Option::is_none) {
            return Err(Error::Import(format!(
                "Unrecognized CSV header. Expected columns: {}",
                CSV_IMPORT_COLUMNS.join(",")
            )));
        }

        Ok(columns)
    }

    fn cell<'r>(record: &'r StringRecord, index: Option<usize>) -> Option<&'r str> {
        index
            .and_then(|i| record.get(i))
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    fn number(record: &StringRecord, index: Option<usize>) -> Option<f64> {
        Self::cell(record, index)
            .and_then(|s| s.parse::<f64>().ok())
            .filter(|n| n.is_finite())
    }

    fn text(record: &StringRecord, index: Option<usize>) -> Option<String> {
        Self::cell(record, index).map(str::to_string)
    }

    fn to_log(&self, record: &StringRecord) -> NewWeatherLog {
        NewWeatherLog {
            timestamp: Self::cell(record, self.timestamp).and_then(parse_timestamp),
            location: Self::text(record, self.location),
            temperature: Self::number(record, self.temperature),
            humidity: Self::number(record, self.humidity),
            wind_speed: Self::number(record, self.wind_speed),
            condition: Self::text(record, self.condition),
            source: Self::text(record, self.source),
            import_hash: None,
        }
        .with_import_hash()
    }
}

/// Parse CSV with a header row naming the weather columns
///
/// Column order is free and unknown columns (such as an exported `id`) are ignored.
pub fn parse_weather_csv<R: Read>(reader: R) -> Result<Vec<NewWeatherLog>> {
    let mut rdr = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let columns = CsvColumns::from_headers(&headers)?;

    let mut logs = Vec::new();
    for result in rdr.records() {
        let record = result?;
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        logs.push(columns.to_log(&record));
    }

    debug!(count = logs.len(), "Parsed weather CSV");
    Ok(logs)
}

/// Parse a file in the given format
pub fn parse_weather_file<R: Read>(reader: R, format: ImportFormat) -> Result<Vec<NewWeatherLog>> {
    match format {
        ImportFormat::Json => parse_weather_json(reader),
        ImportFormat::Csv => parse_weather_csv(reader),
    }
}

fn is_blank(log: &NewWeatherLog) -> bool {
    log.timestamp.is_none()
        && log.location.is_none()
        && log.temperature.is_none()
        && log.humidity.is_none()
        && log.wind_speed.is_none()
        && log.condition.is_none()
        && log.source.is_none()
}

impl Database {
    /// Store parsed logs, skipping blanks and ones already imported
    pub fn import_weather_logs(&self, logs: &[NewWeatherLog]) -> Result<ImportStats> {
        let mut stats = ImportStats {
            parsed: logs.len(),
            ..Default::default()
        };

        for log in logs {
            if is_blank(log) {
                stats.skipped += 1;
                continue;
            }

            // Logs built by hand may lack a hash; give them one so re-runs dedupe
            let inserted = if log.import_hash.is_some() {
                self.insert_weather_log(log)?
            } else {
                self.insert_weather_log(&log.clone().with_import_hash())?
            };

            match inserted {
                Some(_) => stats.imported += 1,
                None => stats.duplicates += 1,
            }
        }

        info!(
            parsed = stats.parsed,
            imported = stats.imported,
            duplicates = stats.duplicates,
            skipped = stats.skipped,
            "Weather import complete"
        );
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_CSV: &str = "\
timestamp,location,temperature,humidity,windSpeed,condition,source
2024-01-15T10:00:00Z,Goiânia,27.5,60,8.2,clear,collector
2024-01-15T11:00:00Z,Goiânia,abc,,9.0,cloudy,collector
,,,,,,
2024-01-15 12:00:00,\"Fortaleza, BR\",31.0,70,,clear,sample
";

    #[test]
    fn test_parse_csv() {
        let logs = parse_weather_csv(SAMPLE_CSV.as_bytes()).unwrap();
        assert_eq!(logs.len(), 3);

        assert_eq!(logs[0].temperature, Some(27.5));
        assert_eq!(logs[0].humidity, Some(60.0));
        assert_eq!(logs[0].wind_speed, Some(8.2));
        assert_eq!(logs[0].location.as_deref(), Some("Goiânia"));

        // Garbage and empty cells are missing, not errors
        assert!(logs[1].temperature.is_none());
        assert!(logs[1].humidity.is_none());
        assert_eq!(logs[1].wind_speed, Some(9.0));

        assert_eq!(logs[2].location.as_deref(), Some("Fortaleza, BR"));
        assert!(logs[2].timestamp.is_some());
        assert!(logs.iter().all(|l| l.import_hash.is_some()));
    }

    #[test]
    fn test_parse_csv_reordered_and_extra_columns() {
        let csv = "id,source,temperature,wind_speed,timestamp\n7,manual,19.5,3,2024-02-01T00:00:00Z\n";
        let logs = parse_weather_csv(csv.as_bytes()).unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].temperature, Some(19.5));
        assert_eq!(logs[0].wind_speed, Some(3.0));
        assert_eq!(logs[0].source.as_deref(), Some("manual"));
        assert!(logs[0].location.is_none());
    }

    #[test]
    fn test_parse_csv_unknown_header() {
        let csv = "Date Posted,Amount\n2024-01-01,12.00\n";
        // "Date Posted" normalizes to "dateposted", which is not a known column
        let err = parse_weather_csv(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, Error::Import(_)));
    }

    #[test]
    fn test_parse_json_lenient() {
        let json = r#"[
            {"timestamp": "2024-01-15T10:00:00Z", "temperature": 25, "humidity": 50},
            {"temperature": "warm"},
            42
        ]"#;
        let logs = parse_weather_json(json.as_bytes()).unwrap();
        assert_eq!(logs.len(), 3);
        assert_eq!(logs[0].temperature, Some(25.0));
        assert!(logs[1].temperature.is_none());
        assert_eq!(logs[2].timestamp, None);
    }

    #[test]
    fn test_parse_json_rejects_scalars_and_syntax_errors() {
        assert!(matches!(
            parse_weather_json("\"hello\"".as_bytes()).unwrap_err(),
            Error::Import(_)
        ));
        assert!(matches!(
            parse_weather_json("[{".as_bytes()).unwrap_err(),
            Error::Json(_)
        ));
    }

    #[test]
    fn test_import_dedupes_and_skips_blanks() {
        let db = Database::in_memory().unwrap();
        let logs = parse_weather_csv(SAMPLE_CSV.as_bytes()).unwrap();

        let first = db.import_weather_logs(&logs).unwrap();
        assert_eq!(first.parsed, 3);
        assert_eq!(first.imported, 3);
        assert_eq!(first.duplicates, 0);

        let second = db.import_weather_logs(&logs).unwrap();
        assert_eq!(second.imported, 0);
        assert_eq!(second.duplicates, 3);

        let blanks = parse_weather_json("[{}, null]".as_bytes()).unwrap();
        let stats = db.import_weather_logs(&blanks).unwrap();
        assert_eq!(stats.skipped, 2);
        assert_eq!(db.all_weather_logs().unwrap().len(), 3);
    }

    #[test]
    fn test_format_from_path() {
        use std::path::Path;
        assert_eq!(
            ImportFormat::from_path(Path::new("logs.JSON")),
            Some(ImportFormat::Json)
        );
        assert_eq!(
            ImportFormat::from_path(Path::new("a/b.csv")),
            Some(ImportFormat::Csv)
        );
        assert_eq!(ImportFormat::from_path(Path::new("x.xlsx")), None);
    }
}
