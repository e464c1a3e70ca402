//! Core types for the insights engine

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Placeholder shown wherever a statistic is unavailable
pub const UNAVAILABLE_PLACEHOLDER: &str = "—";

/// Direction of temperature change across the ordered readings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    /// Later readings are warmer than earlier ones
    Rising,
    /// Later readings are cooler than earlier ones
    Falling,
    /// Change stays within the threshold band
    Stable,
}

impl Trend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Trend::Rising => "rising",
            Trend::Falling => "falling",
            Trend::Stable => "stable",
        }
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Trend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rising" => Ok(Trend::Rising),
            "falling" => Ok(Trend::Falling),
            "stable" => Ok(Trend::Stable),
            _ => Err(format!("Unknown trend: {}", s)),
        }
    }
}

/// Aggregate statistics derived from a set of weather logs
///
/// `None` means "unavailable": the input had nothing to compute that
/// field from. Averages carry full precision; rounding happens when the
/// values are rendered (see [`format_metric`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherInsights {
    /// Number of records considered, including ones with missing fields
    pub count: usize,
    pub average_temperature: Option<f64>,
    pub average_humidity: Option<f64>,
    pub max_temperature: Option<f64>,
    pub min_temperature: Option<f64>,
    pub trend: Option<Trend>,
    pub comfort_index: Option<f64>,
    pub summary: String,
}

/// A labeled statistic ready for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InsightCard {
    pub label: &'static str,
    pub value: String,
}

impl WeatherInsights {
    /// Statistic cards in dashboard order
    pub fn display_rows(&self) -> Vec<InsightCard> {
        vec![
            InsightCard {
                label: "Records",
                value: self.count.to_string(),
            },
            InsightCard {
                label: "Avg. temperature (°C)",
                value: format_metric(self.average_temperature, 1),
            },
            InsightCard {
                label: "Avg. humidity (%)",
                value: format_metric(self.average_humidity, 0),
            },
            InsightCard {
                label: "Max temperature (°C)",
                value: format_metric(self.max_temperature, 1),
            },
            InsightCard {
                label: "Min temperature (°C)",
                value: format_metric(self.min_temperature, 1),
            },
            InsightCard {
                label: "Trend",
                value: self
                    .trend
                    .map(|t| t.as_str().to_string())
                    .unwrap_or_else(|| UNAVAILABLE_PLACEHOLDER.to_string()),
            },
            InsightCard {
                label: "Comfort index",
                value: format_metric(self.comfort_index, 1),
            },
        ]
    }
}

/// Render an optional statistic with a fixed number of decimals
///
/// Unavailable values render as the placeholder dash, never as `0` or `null`.
pub fn format_metric(value: Option<f64>, digits: usize) -> String {
    match value {
        Some(v) if v.is_finite() => {
            let s = format!("{:.*}", digits, v);
            // Avoid "-0.0" for tiny negatives that round to zero
            if s.starts_with('-') && s[1..].chars().all(|c| c == '0' || c == '.') {
                s[1..].to_string()
            } else {
                s
            }
        }
        _ => UNAVAILABLE_PLACEHOLDER.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trend_serialization() {
        assert_eq!(Trend::Rising.as_str(), "rising");
        assert_eq!(Trend::from_str("falling").unwrap(), Trend::Falling);
        assert!(Trend::from_str("subindo").is_err());
        assert_eq!(serde_json::to_string(&Trend::Stable).unwrap(), "\"stable\"");
    }

    #[test]
    fn test_format_metric() {
        assert_eq!(format_metric(Some(20.0), 1), "20.0");
        assert_eq!(format_metric(Some(64.6), 0), "65");
        assert_eq!(format_metric(Some(-0.04), 1), "0.0");
        assert_eq!(format_metric(Some(-3.26), 1), "-3.3");
        assert_eq!(format_metric(None, 1), "—");
        assert_eq!(format_metric(Some(f64::NAN), 1), "—");
    }

    #[test]
    fn test_insights_json_shape() {
        let insights = WeatherInsights {
            count: 0,
            average_temperature: None,
            average_humidity: None,
            max_temperature: None,
            min_temperature: None,
            trend: None,
            comfort_index: None,
            summary: "No data available yet".to_string(),
        };

        let json = serde_json::to_value(&insights).unwrap();
        assert_eq!(json["count"], 0);
        assert!(json["averageTemperature"].is_null());
        assert!(json["comfortIndex"].is_null());
        assert!(json["trend"].is_null());
    }

    #[test]
    fn test_display_rows_use_placeholder() {
        let insights = WeatherInsights {
            count: 2,
            average_temperature: Some(21.26),
            average_humidity: None,
            max_temperature: Some(22.5),
            min_temperature: Some(20.0),
            trend: Some(Trend::Rising),
            comfort_index: None,
            summary: String::new(),
        };

        let rows = insights.display_rows();
        assert_eq!(rows[0].value, "2");
        assert_eq!(rows[1].value, "21.3");
        assert_eq!(rows[2].value, "—");
        assert_eq!(rows[5].value, "rising");
        assert_eq!(rows[6].value, "—");
    }

    #[test]
    fn test_display_row_labels() {
        let insights = WeatherInsights {
            count: 0,
            average_temperature: None,
            average_humidity: None,
            max_temperature: None,
            min_temperature: None,
            trend: None,
            comfort_index: None,
            summary: String::new(),
        };

        let labels: Vec<&str> = insights.display_rows().iter().map(|r| r.label).collect();
        assert_eq!(
            labels,
            [
                "Records",
                "Avg. temperature (°C)",
                "Avg. humidity (%)",
                "Max temperature (°C)",
                "Min temperature (°C)",
                "Trend",
                "Comfort index",
            ]
        );
    }
}
