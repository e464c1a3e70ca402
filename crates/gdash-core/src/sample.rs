//! Plausible sample readings for demos and empty dashboards

use chrono::Utc;
use rand::Rng;

use crate::models::NewWeatherLog;

pub const SAMPLE_LOCATION: &str = "Fortaleza, BR";
pub const SAMPLE_SOURCE: &str = "sample";

/// A warm, humid coastal reading stamped with the current time
pub fn sample_weather_log() -> NewWeatherLog {
    sample_weather_log_with(&mut rand::thread_rng())
}

/// Same as [`sample_weather_log`] with a caller-supplied RNG
pub fn sample_weather_log_with<R: Rng + ?Sized>(rng: &mut R) -> NewWeatherLog {
    NewWeatherLog {
        timestamp: Some(Utc::now()),
        location: Some(SAMPLE_LOCATION.to_string()),
        temperature: Some(round1(rng.gen_range(30.0..=33.0))),
        humidity: Some(rng.gen_range(60..=75) as f64),
        wind_speed: Some(round1(rng.gen_range(5.0..=15.0))),
        condition: Some("clear".to_string()),
        source: Some(SAMPLE_SOURCE.to_string()),
        import_hash: None,
    }
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}
