//! Insights engine - turns weather logs into aggregate statistics

use chrono::{DateTime, Utc};

use crate::models::WeatherLog;

use super::types::{format_metric, Trend, WeatherInsights};

/// Minimum change (°C) between the earlier and later half means before a
/// trend counts as rising or falling
pub const TREND_THRESHOLD_CELSIUS: f64 = 0.5;

/// Dated temperature readings needed before a trend is reported
pub const MIN_TREND_READINGS: usize = 2;

/// Computes [`WeatherInsights`] from weather logs
///
/// The engine is a plain value: it holds configuration only, so a single
/// instance can be shared freely between threads and request handlers.
///
/// # Comfort index
///
/// `comfort = avg_temperature - (100 - avg_humidity) / 5`
///
/// Dry air pulls the score down, humid air keeps it close to the
/// temperature. 30 °C at 70 % humidity gives 24.0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InsightsEngine {
    trend_threshold: f64,
}

impl Default for InsightsEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl InsightsEngine {
    pub fn new() -> Self {
        Self {
            trend_threshold: TREND_THRESHOLD_CELSIUS,
        }
    }

    /// Use a different trend threshold (°C); negative values are treated as 0
    pub fn with_trend_threshold(threshold: f64) -> Self {
        Self {
            trend_threshold: if threshold.is_finite() {
                threshold.max(0.0)
            } else {
                TREND_THRESHOLD_CELSIUS
            },
        }
    }

    pub fn trend_threshold(&self) -> f64 {
        self.trend_threshold
    }

    /// Compute insights over the full record set
    ///
    /// Never fails: missing or malformed fields only make the matching
    /// statistics unavailable.
    pub fn compute(&self, records: &[WeatherLog]) -> WeatherInsights {
        let count = records.len();

        let temperatures = sorted_present(records.iter().map(|r| r.temperature));
        let humidities = sorted_present(records.iter().map(|r| r.humidity));

        let average_temperature = mean(&temperatures);
        let average_humidity = mean(&humidities);
        // Values are sorted, so the extrema sit at the ends
        let min_temperature = temperatures.first().copied();
        let max_temperature = temperatures.last().copied();

        let trend = self.classify_trend(records);

        let comfort_index = match (average_temperature, average_humidity) {
            (Some(t), Some(h)) => Some(comfort_index(t, h)),
            _ => None,
        };

        let summary = summarize(count, average_temperature, average_humidity, trend, comfort_index);

        WeatherInsights {
            count,
            average_temperature,
            average_humidity,
            max_temperature,
            min_temperature,
            trend,
            comfort_index,
            summary,
        }
    }

    /// Compare the later half of the dated temperature series with the earlier half
    fn classify_trend(&self, records: &[WeatherLog]) -> Option<Trend> {
        let mut series: Vec<(DateTime<Utc>, f64)> = records
            .iter()
            .filter_map(|r| match (r.timestamp, r.temperature) {
                (Some(ts), Some(t)) if t.is_finite() => Some((ts, t)),
                _ => None,
            })
            .collect();

        if series.len() < MIN_TREND_READINGS {
            return None;
        }

        // Stable sort: readings sharing a timestamp keep their input order
        series.sort_by_key(|(ts, _)| *ts);

        // Earlier half takes the extra element for odd counts
        let split = series.len().div_ceil(2);
        let (earlier, later) = series.split_at(split);

        let earlier_mean = mean(&sorted_present(earlier.iter().map(|(_, t)| Some(*t))))?;
        let later_mean = mean(&sorted_present(later.iter().map(|(_, t)| Some(*t))))?;
        let delta = later_mean - earlier_mean;

        Some(if delta > self.trend_threshold {
            Trend::Rising
        } else if delta < -self.trend_threshold {
            Trend::Falling
        } else {
            Trend::Stable
        })
    }
}

/// Compute insights with the default engine configuration
pub fn compute_insights(records: &[WeatherLog]) -> WeatherInsights {
    InsightsEngine::new().compute(records)
}

/// Heat-index style comfort score from average temperature (°C) and humidity (%)
pub fn comfort_index(average_temperature: f64, average_humidity: f64) -> f64 {
    average_temperature - ((100.0 - average_humidity) / 5.0)
}

/// Present, finite values in ascending order
///
/// Summing in sorted order makes averages independent of input order.
fn sorted_present(values: impl Iterator<Item = Option<f64>>) -> Vec<f64> {
    let mut out: Vec<f64> = values.flatten().filter(|v| v.is_finite()).collect();
    out.sort_by(f64::total_cmp);
    out
}

/// Arithmetic mean of sorted, finite values
///
/// A sum that overflows is redone over pre-scaled terms, which stay within
/// range. The result is clamped to the extrema so rounding never puts the
/// average outside `[min, max]`.
fn mean(values: &[f64]) -> Option<f64> {
    let (first, last) = (*values.first()?, *values.last()?);
    let n = values.len() as f64;

    let sum: f64 = values.iter().sum();
    let avg = if sum.is_finite() {
        sum / n
    } else {
        values.iter().map(|v| v / n).sum()
    };

    Some(avg.clamp(first, last))
}

fn summarize(
    count: usize,
    average_temperature: Option<f64>,
    average_humidity: Option<f64>,
    trend: Option<Trend>,
    comfort_index: Option<f64>,
) -> String {
    if count == 0 {
        return "No data available yet: 0 readings recorded, average temperature: no data, \
                trend: unavailable."
            .to_string();
    }

    let readings = if count == 1 { "reading" } else { "readings" };
    let temperature = match average_temperature {
        Some(t) => format!("{} °C", format_metric(Some(t), 1)),
        None => "no data".to_string(),
    };
    let trend = match trend {
        Some(t) => t.as_str(),
        None => "unavailable",
    };

    let mut summary = format!(
        "{} {} analyzed, average temperature: {}, trend: {}.",
        count, readings, temperature, trend
    );

    if let Some(h) = average_humidity {
        summary.push_str(&format!(" Average humidity {}%.", format_metric(Some(h), 0)));
    }
    if let Some(c) = comfort_index {
        summary.push_str(&format!(" Comfort index {}.", format_metric(Some(c), 1)));
    }
    if average_temperature.is_none() {
        summary.push_str(" No temperature data available yet.");
    }

    summary
}
