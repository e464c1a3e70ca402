//! Weather collection from external providers
//!
//! A [`WeatherProvider`] turns a [`Station`] into a fresh reading. The
//! built-in provider talks to the Open-Meteo forecast API, which needs no
//! API key. [`collect_once`] fetches one reading and stores it.
//!
//! # Configuration
//!
//! Read from `~/.local/share/gdash/config/collector.toml` (or a path given
//! explicitly), then overridden by environment variables:
//!
//! ```toml
//! [station]
//! name = "Goiânia"
//! latitude = -16.6869
//! longitude = -49.2648
//!
//! [collector]
//! base_url = "https://api.open-meteo.com"
//! interval_secs = 60
//! timeout_secs = 10
//! source = "gdash-collector"
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::{parse_timestamp, NewWeatherLog, WeatherLog};

pub const DEFAULT_STATION_NAME: &str = "Goiânia";
pub const DEFAULT_LATITUDE: f64 = -16.6869;
pub const DEFAULT_LONGITUDE: f64 = -49.2648;
pub const DEFAULT_OPEN_METEO_URL: &str = "https://api.open-meteo.com";
pub const DEFAULT_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_SOURCE: &str = "gdash-collector";

/// Shortest accepted collection interval
pub const MIN_INTERVAL_SECS: u64 = 10;

/// Environment variables that override the config file
pub const ENV_INTERVAL: &str = "GDASH_COLLECT_INTERVAL_SECS";
pub const ENV_STATION_NAME: &str = "GDASH_STATION_NAME";
pub const ENV_LATITUDE: &str = "GDASH_STATION_LAT";
pub const ENV_LONGITUDE: &str = "GDASH_STATION_LON";
pub const ENV_BASE_URL: &str = "GDASH_OPEN_METEO_URL";

/// Where readings are taken
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl Default for Station {
    fn default() -> Self {
        Self {
            name: DEFAULT_STATION_NAME.to_string(),
            latitude: DEFAULT_LATITUDE,
            longitude: DEFAULT_LONGITUDE,
        }
    }
}

impl Station {
    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Config("Station name must not be empty".to_string()));
        }
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(Error::Config(format!("Latitude out of range: {}", self.latitude)));
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(Error::Config(format!(
                "Longitude out of range: {}",
                self.longitude
            )));
        }
        Ok(())
    }
}

/// Collector settings
#[derive(Debug, Clone, PartialEq)]
pub struct CollectorConfig {
    pub station: Station,
    pub base_url: String,
    pub interval: Duration,
    pub timeout: Duration,
    /// Provenance tag written on collected readings
    pub source: String,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            station: Station::default(),
            base_url: DEFAULT_OPEN_METEO_URL.to_string(),
            interval: Duration::from_secs(DEFAULT_INTERVAL_SECS),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            source: DEFAULT_SOURCE.to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    station: Option<RawStation>,
    collector: Option<RawCollector>,
}

#[derive(Debug, Deserialize)]
struct RawStation {
    name: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawCollector {
    base_url: Option<String>,
    interval_secs: Option<u64>,
    timeout_secs: Option<u64>,
    source: Option<String>,
}

/// Default collector config path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("gdash").join("config").join("collector.toml"))
}

impl CollectorConfig {
    /// Load from the given file (must exist) or the default location (optional),
    /// then apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let content = fs::read_to_string(path).map_err(|e| {
                    Error::Config(format!("Failed to read {}: {}", path.display(), e))
                })?;
                Self::from_toml(&content)?
            }
            None => match default_config_path().filter(|p| p.exists()) {
                Some(default_path) => {
                    let content = fs::read_to_string(&default_path).map_err(|e| {
                        Error::Config(format!("Failed to read {}: {}", default_path.display(), e))
                    })?;
                    Self::from_toml(&content)?
                }
                None => Self::default(),
            },
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Parse TOML content on top of the defaults
    pub fn from_toml(content: &str) -> Result<Self> {
        let raw: RawConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Invalid collector TOML: {}", e)))?;

        let mut config = Self::default();

        if let Some(station) = raw.station {
            if let Some(name) = station.name {
                config.station.name = name;
            }
            if let Some(lat) = station.latitude {
                config.station.latitude = lat;
            }
            if let Some(lon) = station.longitude {
                config.station.longitude = lon;
            }
        }

        if let Some(collector) = raw.collector {
            if let Some(url) = collector.base_url {
                config.base_url = url;
            }
            if let Some(secs) = collector.interval_secs {
                config.interval = Duration::from_secs(secs);
            }
            if let Some(secs) = collector.timeout_secs {
                config.timeout = Duration::from_secs(secs);
            }
            if let Some(source) = collector.source {
                config.source = source;
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a key lookup (normally the process environment)
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(name) = get(ENV_STATION_NAME) {
            self.station.name = name;
        }
        if let Some(lat) = get(ENV_LATITUDE) {
            self.station.latitude = parse_env(ENV_LATITUDE, &lat)?;
        }
        if let Some(lon) = get(ENV_LONGITUDE) {
            self.station.longitude = parse_env(ENV_LONGITUDE, &lon)?;
        }
        if let Some(url) = get(ENV_BASE_URL) {
            self.base_url = url;
        }
        if let Some(secs) = get(ENV_INTERVAL) {
            self.interval = Duration::from_secs(parse_env(ENV_INTERVAL, &secs)?);
        }

        self.validate()
    }

    fn validate(&self) -> Result<()> {
        self.station.validate()?;
        if self.interval < Duration::from_secs(MIN_INTERVAL_SECS) {
            return Err(Error::Config(format!(
                "Collection interval must be at least {} seconds",
                MIN_INTERVAL_SECS
            )));
        }
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(Error::Config(format!("Invalid base URL: {}", self.base_url)));
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| Error::Config(format!("Invalid value for {}: {}", key, value)))
}

/// Source of current weather readings
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    /// Provider name for logs
    fn name(&self) -> &str;

    /// Fetch the current conditions at a station
    async fn current(&self, station: &Station) -> Result<NewWeatherLog>;
}

/// Open-Meteo forecast API client
#[derive(Clone)]
pub struct OpenMeteoProvider {
    http_client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    current: Option<CurrentConditions>,
}

#[derive(Debug, Deserialize)]
struct CurrentConditions {
    time: Option<String>,
    temperature_2m: Option<f64>,
    relative_humidity_2m: Option<f64>,
    wind_speed_10m: Option<f64>,
    weather_code: Option<u16>,
}

const CURRENT_FIELDS: &str = "temperature_2m,relative_humidity_2m,wind_speed_10m,weather_code";

impl OpenMeteoProvider {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http_client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &CollectorConfig) -> Result<Self> {
        Self::new(&config.base_url, config.timeout)
    }
}

#[async_trait]
impl WeatherProvider for OpenMeteoProvider {
    fn name(&self) -> &str {
        "open-meteo"
    }

    async fn current(&self, station: &Station) -> Result<NewWeatherLog> {
        let url = format!("{}/v1/forecast", self.base_url);
        debug!(%url, station = %station.name, "Requesting current weather");

        let response = self
            .http_client
            .get(&url)
            .query(&[
                ("latitude", station.latitude.to_string()),
                ("longitude", station.longitude.to_string()),
                ("current", CURRENT_FIELDS.to_string()),
                ("wind_speed_unit", "kmh".to_string()),
                ("timezone", "UTC".to_string()),
            ])
            .send()
            .await?;

        let response = response.error_for_status()?;
        let body: ForecastResponse = response.json().await?;
        let current = body
            .current
            .ok_or_else(|| Error::Provider("Response has no current conditions".to_string()))?;

        let finite = |v: Option<f64>| v.filter(|n| n.is_finite());

        Ok(NewWeatherLog {
            timestamp: Some(
                current
                    .time
                    .as_deref()
                    .and_then(parse_timestamp)
                    .unwrap_or_else(Utc::now),
            ),
            location: Some(station.name.clone()),
            temperature: finite(current.temperature_2m),
            humidity: finite(current.relative_humidity_2m),
            wind_speed: finite(current.wind_speed_10m),
            condition: current.weather_code.map(|c| wmo_condition(c).to_string()),
            source: None,
            import_hash: None,
        })
    }
}

/// Map a WMO weather interpretation code to a short condition word
pub fn wmo_condition(code: u16) -> &'static str {
    match code {
        0 => "clear",
        1 | 2 => "partly cloudy",
        3 => "overcast",
        45 | 48 => "fog",
        51..=57 => "drizzle",
        61..=67 => "rain",
        71..=77 => "snow",
        80..=82 => "rain showers",
        85 | 86 => "snow showers",
        95..=99 => "thunderstorm",
        _ => "unknown",
    }
}

/// Fetch one reading and store it
pub async fn collect_once(
    db: &Database,
    provider: &dyn WeatherProvider,
    config: &CollectorConfig,
) -> Result<WeatherLog> {
    let mut reading = provider.current(&config.station).await?;
    if reading.source.is_none() {
        reading.source = Some(config.source.clone());
    }

    let id = db
        .insert_weather_log(&reading)?
        .ok_or_else(|| Error::InvalidData("Collected reading was not stored".to_string()))?;

    info!(
        provider = provider.name(),
        station = %config.station.name,
        temperature = ?reading.temperature,
        humidity = ?reading.humidity,
        "Collected weather reading"
    );

    db.get_weather_log(id)?
        .ok_or_else(|| Error::NotFound(format!("Weather log {}", id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MockOpenMeteoServer;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = CollectorConfig::default();
        assert_eq!(config.station.name, "Goiânia");
        assert_eq!(config.station.latitude, -16.6869);
        assert_eq!(config.interval, Duration::from_secs(60));
    }

    #[test]
    fn test_parse_toml() {
        let config = CollectorConfig::from_toml(
            r#"
            [station]
            name = "Fortaleza, BR"
            latitude = -3.7319
            longitude = -38.5267

            [collector]
            interval_secs = 300
            "#,
        )
        .unwrap();

        assert_eq!(config.station.name, "Fortaleza, BR");
        assert_eq!(config.interval, Duration::from_secs(300));
        assert_eq!(config.base_url, DEFAULT_OPEN_METEO_URL);
    }

    #[test]
    fn test_invalid_toml_values() {
        assert!(matches!(
            CollectorConfig::from_toml("[station]\nlatitude = 123.0").unwrap_err(),
            Error::Config(_)
        ));
        assert!(CollectorConfig::from_toml("[collector]\ninterval_secs = 1").is_err());
        assert!(CollectorConfig::from_toml("not = [valid").is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_STATION_NAME, "Recife"),
            (ENV_LATITUDE, "-8.05"),
            (ENV_INTERVAL, "120"),
        ]
        .into_iter()
        .collect();

        let mut config = CollectorConfig::default();
        config
            .apply_overrides(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.station.name, "Recife");
        assert_eq!(config.station.latitude, -8.05);
        assert_eq!(config.station.longitude, DEFAULT_LONGITUDE);
        assert_eq!(config.interval, Duration::from_secs(120));

        let mut config = CollectorConfig::default();
        let err = config
            .apply_overrides(|k| (k == ENV_INTERVAL).then(|| "soon".to_string()))
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_load_missing_explicit_file() {
        let err = CollectorConfig::load(Some(Path::new("/nonexistent/collector.toml"))).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_wmo_mapping() {
        assert_eq!(wmo_condition(0), "clear");
        assert_eq!(wmo_condition(3), "overcast");
        assert_eq!(wmo_condition(63), "rain");
        assert_eq!(wmo_condition(95), "thunderstorm");
        assert_eq!(wmo_condition(42), "unknown");
    }

    #[tokio::test]
    async fn test_open_meteo_provider() {
        let server = MockOpenMeteoServer::start().await;
        let provider = OpenMeteoProvider::new(&server.url(), Duration::from_secs(5)).unwrap();

        let reading = provider.current(&Station::default()).await.unwrap();
        assert_eq!(reading.location.as_deref(), Some("Goiânia"));
        assert_eq!(reading.temperature, Some(27.5));
        assert_eq!(reading.humidity, Some(61.0));
        assert_eq!(reading.wind_speed, Some(8.3));
        assert_eq!(reading.condition.as_deref(), Some("partly cloudy"));
        assert_eq!(
            reading.timestamp.unwrap().to_rfc3339(),
            "2024-01-15T10:00:00+00:00"
        );
    }

    #[tokio::test]
    async fn test_provider_http_error() {
        let server = MockOpenMeteoServer::start_failing().await;
        let provider = OpenMeteoProvider::new(&server.url(), Duration::from_secs(5)).unwrap();

        let err = provider.current(&Station::default()).await.unwrap_err();
        assert!(matches!(err, Error::Http(_)));
    }

    #[tokio::test]
    async fn test_collect_once_stores_reading() {
        let server = MockOpenMeteoServer::start().await;
        let db = Database::in_memory().unwrap();
        let config = CollectorConfig {
            base_url: server.url(),
            ..Default::default()
        };
        let provider = OpenMeteoProvider::from_config(&config).unwrap();

        let stored = collect_once(&db, &provider, &config).await.unwrap();
        assert!(stored.id.is_some());
        assert_eq!(stored.source.as_deref(), Some(DEFAULT_SOURCE));
        assert_eq!(db.all_weather_logs().unwrap().len(), 1);
    }
}
