//! Weather Insights
//!
//! Derives aggregate statistics from the weather log: averages, extrema,
//! a temperature trend, a comfort index and a one-line summary.
//!
//! The computation is pure. It reads a slice of [`WeatherLog`](crate::models::WeatherLog)
//! values, never mutates them, and gives the same result for the same input.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use gdash_core::insights::compute_insights;
//!
//! let logs = db.all_weather_logs()?;
//! let insights = compute_insights(&logs);
//! for card in insights.display_rows() {
//!     println!("{}: {}", card.label, card.value);
//! }
//! ```

pub mod engine;
pub mod types;

pub use engine::{
    comfort_index, compute_insights, InsightsEngine, MIN_TREND_READINGS, TREND_THRESHOLD_CELSIUS,
};
pub use types::{format_metric, InsightCard, Trend, WeatherInsights, UNAVAILABLE_PLACEHOLDER};
