//! GDASH Core Library
//!
//! Shared functionality for the GDASH climate log dashboard:
//! - Database access and migrations (weather logs, users, audit trail)
//! - Weather insights engine
//! - JSON/CSV import and export
//! - Open-Meteo collector
//! - Sample readings for demos

pub mod collector;
pub mod db;
pub mod error;
pub mod export;
pub mod import;
pub mod insights;
pub mod models;
pub mod sample;

/// Test utilities including a mock Open-Meteo server
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use collector::{collect_once, CollectorConfig, OpenMeteoProvider, Station, WeatherProvider};
pub use db::{AuditEntry, Database};
pub use error::{Error, Result};
pub use export::ExportFormat;
pub use import::{ImportFormat, ImportStats};
pub use insights::{compute_insights, InsightsEngine, Trend, WeatherInsights};
pub use models::{NewWeatherLog, WeatherLog, WeatherLogFilter};
pub use sample::sample_weather_log;
