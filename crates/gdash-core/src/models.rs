//! Domain models for GDASH

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

/// A single weather observation as it arrives from storage, imports or the API
///
/// Every field is optional. Records come from several producers (collectors,
/// manual entry, old exports) and any of them may omit or garble a field, so
/// deserialization never fails on a bad value: it just leaves the field empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherLog {
    pub id: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    pub location: Option<String>,
    /// Degrees Celsius
    pub temperature: Option<f64>,
    /// Relative humidity, percent
    pub humidity: Option<f64>,
    /// km/h
    pub wind_speed: Option<f64>,
    pub condition: Option<String>,
    /// Provenance tag (collector name, "sample", "manual", ...)
    pub source: Option<String>,
}

impl WeatherLog {
    /// Build a record from an arbitrary JSON value
    ///
    /// Non-object values yield a record with every field missing.
    pub fn from_json(value: &Value) -> Self {
        let Some(obj) = value.as_object() else {
            return Self::default();
        };

        let id = obj
            .get("id")
            .and_then(json_id)
            .or_else(|| obj.get("_id").and_then(json_id));

        Self {
            id,
            timestamp: obj.get("timestamp").and_then(json_timestamp),
            location: obj.get("location").and_then(json_text),
            temperature: obj.get("temperature").and_then(json_number),
            humidity: obj.get("humidity").and_then(json_number),
            wind_speed: obj
                .get("windSpeed")
                .or_else(|| obj.get("wind_speed"))
                .and_then(json_number),
            condition: obj.get("condition").and_then(json_text),
            source: obj.get("source").and_then(json_text),
        }
    }

    /// Parse a JSON array of records, tolerating malformed elements
    pub fn many_from_json(value: &Value) -> Vec<Self> {
        match value {
            Value::Array(items) => items.iter().map(Self::from_json).collect(),
            Value::Object(_) => vec![Self::from_json(value)],
            _ => vec![],
        }
    }
}

impl<'de> Deserialize<'de> for WeatherLog {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(Self::from_json(&value))
    }
}

fn json_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        // MongoDB extended JSON: {"$oid": "..."}
        Value::Object(obj) => obj.get("$oid").and_then(json_id),
        _ => None,
    }
}

fn json_text(value: &Value) -> Option<String> {
    value
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn json_number(value: &Value) -> Option<f64> {
    value.as_f64().filter(|n| n.is_finite())
}

fn json_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => parse_timestamp(s),
        // JavaScript-style epoch milliseconds, possibly written as a float
        Value::Number(n) => n
            .as_i64()
            .or_else(|| {
                n.as_f64()
                    .filter(|ms| ms.is_finite())
                    .map(|ms| ms.trunc() as i64)
            })
            .and_then(timestamp_from_millis),
        // MongoDB extended JSON: {"$date": "..."} or {"$date": {"$numberLong": "..."}}
        Value::Object(obj) => match obj.get("$date")? {
            Value::Object(inner) => inner
                .get("$numberLong")
                .and_then(Value::as_str)
                .and_then(|s| s.parse::<i64>().ok())
                .and_then(timestamp_from_millis),
            other => json_timestamp(other),
        },
        _ => None,
    }
}

fn timestamp_from_millis(ms: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .filter(is_storable_timestamp)
}

/// Whether a timestamp fits the stored `YYYY-MM-DDTHH:MM:SS.sssZ` form
///
/// Years outside 0000..=9999 gain a sign or a fifth digit, which breaks
/// both parsing back and lexical ordering in storage.
pub fn is_storable_timestamp(ts: &DateTime<Utc>) -> bool {
    (0..=9999).contains(&ts.year())
}

/// Parse a timestamp string in any of the formats producers are known to send
///
/// Returns `None` for anything unparseable or outside years 0000..=9999.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    parse_timestamp_any(s).filter(is_storable_timestamp)
}

fn parse_timestamp_any(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    // Naive timestamps (e.g. Python's datetime.utcnow().isoformat()) are UTC
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.and_utc());
        }
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// A weather log to be stored
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewWeatherLog {
    pub timestamp: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub wind_speed: Option<f64>,
    pub condition: Option<String>,
    pub source: Option<String>,
    /// Deduplication key for imports; `None` for live readings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub import_hash: Option<String>,
}

impl NewWeatherLog {
    /// SHA-256 over the canonical field values
    pub fn content_hash(&self) -> String {
        fn opt_num(v: Option<f64>) -> String {
            v.map(|n| format!("{:.3}", n)).unwrap_or_default()
        }

        let canonical = [
            self.timestamp.map(|t| t.to_rfc3339()).unwrap_or_default(),
            self.location.clone().unwrap_or_default(),
            opt_num(self.temperature),
            opt_num(self.humidity),
            opt_num(self.wind_speed),
            self.condition.clone().unwrap_or_default(),
            self.source.clone().unwrap_or_default(),
        ]
        .join("|");

        hex::encode(Sha256::digest(canonical.as_bytes()))
    }

    /// Attach the content hash so duplicates are skipped on insert
    pub fn with_import_hash(mut self) -> Self {
        self.import_hash = Some(self.content_hash());
        self
    }
}

impl From<WeatherLog> for NewWeatherLog {
    fn from(log: WeatherLog) -> Self {
        Self {
            timestamp: log.timestamp,
            location: log.location,
            temperature: log.temperature,
            humidity: log.humidity,
            wind_speed: log.wind_speed,
            condition: log.condition,
            source: log.source,
            import_hash: None,
        }
    }
}

/// Filters for listing weather logs
#[derive(Debug, Clone, Default)]
pub struct WeatherLogFilter {
    /// Only readings at or after this instant
    pub from: Option<DateTime<Utc>>,
    /// Only readings at or before this instant
    pub to: Option<DateTime<Utc>>,
    /// Case-insensitive substring match on location
    pub location: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl WeatherLogFilter {
    /// True when the filter restricts by time, which drops undated readings
    pub fn has_time_bounds(&self) -> bool {
        self.from.is_some() || self.to.is_some()
    }
}

/// Role of a dashboard user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    #[default]
    User,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::User => "user",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Ok(Self::Admin),
            "user" => Ok(Self::User),
            _ => Err(format!("Unknown role: {}", s)),
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A dashboard user account (never carries the password hash)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

/// A user to be created
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub role: UserRole,
}

/// Partial update for a user; `None` leaves the field unchanged
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<UserRole>,
}

/// Minimum accepted password length
pub const MIN_PASSWORD_LEN: usize = 6;

/// Normalize an email address for storage and lookup
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_weather_log_full_record() {
        let log: WeatherLog = serde_json::from_value(json!({
            "_id": "65a1f0",
            "timestamp": "2024-01-15T10:30:00Z",
            "location": "Goiânia",
            "temperature": 27.5,
            "humidity": 60,
            "windSpeed": 8.2,
            "condition": "clear",
            "source": "python-collector"
        }))
        .unwrap();

        assert_eq!(log.id.as_deref(), Some("65a1f0"));
        assert_eq!(log.timestamp.unwrap().to_rfc3339(), "2024-01-15T10:30:00+00:00");
        assert_eq!(log.temperature, Some(27.5));
        assert_eq!(log.humidity, Some(60.0));
        assert_eq!(log.wind_speed, Some(8.2));
        assert_eq!(log.source.as_deref(), Some("python-collector"));
    }

    #[test]
    fn test_weather_log_garbage_fields_are_missing() {
        let log: WeatherLog = serde_json::from_value(json!({
            "timestamp": "not a date",
            "temperature": "hot",
            "humidity": null,
            "windSpeed": true,
            "location": 42
        }))
        .unwrap();

        assert_eq!(log, WeatherLog::default());
    }

    #[test]
    fn test_weather_log_non_object() {
        let logs = WeatherLog::many_from_json(&json!([1, "x", null, {"temperature": 20}]));
        assert_eq!(logs.len(), 4);
        assert_eq!(logs[0], WeatherLog::default());
        assert_eq!(logs[3].temperature, Some(20.0));
    }

    #[test]
    fn test_weather_log_id_and_underscore_id() {
        let log = WeatherLog::from_json(&json!({"id": "a", "_id": "b"}));
        assert_eq!(log.id.as_deref(), Some("a"));

        let log = WeatherLog::from_json(&json!({"_id": {"$oid": "abc123"}}));
        assert_eq!(log.id.as_deref(), Some("abc123"));
    }

    #[test]
    fn test_timestamp_formats() {
        assert!(parse_timestamp("2024-01-15T10:30:00Z").is_some());
        assert!(parse_timestamp("2024-01-15T10:30:00.123456").is_some());
        assert!(parse_timestamp("2024-01-15 10:30:00").is_some());
        assert!(parse_timestamp("2024-01-15T10:30").is_some());
        assert!(parse_timestamp("2024-01-15").is_some());
        assert!(parse_timestamp("").is_none());
        assert!(parse_timestamp("yesterday").is_none());

        let log = WeatherLog::from_json(&json!({"timestamp": 1_705_314_600_000i64}));
        assert_eq!(log.timestamp.unwrap().to_rfc3339(), "2024-01-15T10:30:00+00:00");

        let log = WeatherLog::from_json(&json!({"timestamp": {"$date": "2024-01-15T10:30:00Z"}}));
        assert!(log.timestamp.is_some());
    }

    #[test]
    fn test_float_epoch_millis() {
        let log = WeatherLog::from_json(&json!({"timestamp": 1_705_314_600_000.0}));
        assert_eq!(log.timestamp.unwrap().to_rfc3339(), "2024-01-15T10:30:00+00:00");

        let log = WeatherLog::from_json(&json!({"timestamp": {"$date": 1_705_314_600_000.7}}));
        assert_eq!(log.timestamp.unwrap().timestamp_millis(), 1_705_314_600_000);
    }

    #[test]
    fn test_timestamps_outside_four_digit_years_are_missing() {
        // 9999-12-31T23:59:59.999Z is the last storable instant
        let log = WeatherLog::from_json(&json!({"timestamp": 253_402_300_799_999i64}));
        assert_eq!(log.timestamp.unwrap().year(), 9999);

        for ms in [253_402_300_800_000i64, -62_167_219_200_001] {
            let log = WeatherLog::from_json(&json!({"timestamp": ms}));
            assert!(log.timestamp.is_none(), "{ms} should be rejected");
        }

        let log = WeatherLog::from_json(&json!({"timestamp": {"$date": {"$numberLong": "253402300800000"}}}));
        assert!(log.timestamp.is_none());

        assert!(parse_timestamp("+10000-01-01T00:00:00Z").is_none());
        assert!(parse_timestamp("0000-01-01T00:00:00Z").is_some());
        assert!(!is_storable_timestamp(
            &Utc.timestamp_millis_opt(253_402_300_800_000).unwrap()
        ));
    }

    #[test]
    fn test_serialize_camel_case() {
        let log = WeatherLog {
            wind_speed: Some(3.0),
            ..Default::default()
        };
        let json = serde_json::to_value(&log).unwrap();
        assert_eq!(json["windSpeed"], 3.0);
        assert!(json["temperature"].is_null());
    }

    #[test]
    fn test_content_hash_is_stable() {
        let a = NewWeatherLog {
            location: Some("Fortaleza, BR".into()),
            temperature: Some(31.2),
            ..Default::default()
        };
        let b = a.clone();
        assert_eq!(a.content_hash(), b.content_hash());

        let c = NewWeatherLog {
            temperature: Some(31.3),
            ..a.clone()
        };
        assert_ne!(a.content_hash(), c.content_hash());
    }

    #[test]
    fn test_user_role_parse() {
        assert_eq!("admin".parse::<UserRole>().unwrap(), UserRole::Admin);
        assert_eq!(" User ".parse::<UserRole>().unwrap(), UserRole::User);
        assert!("root".parse::<UserRole>().is_err());
        assert!(UserRole::Admin.is_admin());
        assert!(!UserRole::User.is_admin());
    }
}
