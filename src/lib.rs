//! # Tide Chart Core Library
//!
//! This library provides the building blocks of a small dashboard widget that
//! polls NOAA's CO-OPS data API and charts today's predicted tide against the
//! measured water level at a single station.
//!
//! ## Design Philosophy
//!
//! ### Thin Core, Pluggable Edges
//! The widget owns timing and state, nothing else:
//! - **Network**: delegated to a [`tide_data::TideFetcher`] (NOAA over HTTPS by default)
//! - **Drawing**: delegated to a [`renderer::ChartSurface`] (JSON file or terminal)
//! - **Configuration**: injected once at construction, never mutated
//!
//! ### Whole-Snapshot Updates
//! Fetcher replies carry the complete dataset for the day. A reply either
//! replaces the displayed data entirely or is rejected; there is no merging.
//!
//! ### Data Flow
//! 1. **Tick**: the [`scheduler::RefreshScheduler`] fires
//! 2. **Build**: [`request::RequestBuilder`] produces the predicted/measured URLs for today
//! 3. **Fetch**: the fetcher runs in its own task and replies with a [`TideSnapshot`]
//! 4. **Apply**: the snapshot is validated and swapped into the [`store::DataStore`]
//! 5. **Render**: [`chart::ChartRenderer`] turns it into a chart spec for the surface
//!
//! ## Core Types
//!
//! - [`TideSnapshot`]: station name plus two parallel time/value series
//! - [`Units`]: the unit system NOAA should report heights in

pub mod chart;
pub mod config;
pub mod renderer;
pub mod request;
pub mod scheduler;
pub mod store;
pub mod tide_data;
pub mod widget;

use tide_data::TideError;

/// Unit system understood by the NOAA API.
///
/// NOAA calls imperial units `english`; both sides agree on `metric`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Units {
    #[default]
    English,
    Metric,
}

impl Units {
    /// Normalize a configured unit name.
    ///
    /// Only the exact string `"metric"` selects metric units; anything else,
    /// including `"imperial"` or an empty string, falls back to English.
    ///
    /// ```
    /// use tide_chart_lib::Units;
    ///
    /// assert_eq!(Units::resolve("metric"), Units::Metric);
    /// assert_eq!(Units::resolve("imperial"), Units::English);
    /// assert_eq!(Units::resolve("Metric"), Units::English);
    /// ```
    pub fn resolve(configured: &str) -> Self {
        if configured == "metric" {
            Units::Metric
        } else {
            Units::English
        }
    }

    /// Query parameter value for the `units` field.
    pub fn as_str(self) -> &'static str {
        match self {
            Units::English => "english",
            Units::Metric => "metric",
        }
    }
}

/// Complete tide dataset for one station and one calendar day.
///
/// Measured and predicted series are parallel arrays: `*_times[i]` is the
/// timestamp of `*_values[i]`. Predictions normally cover the whole day while
/// measurements stop at the latest reading.
///
/// Missing readings are carried as `NaN`; the chart output writes them as
/// `null` so chart libraries draw a gap.
///
/// # Example
/// ```
/// use tide_chart_lib::TideSnapshot;
///
/// let snapshot = TideSnapshot {
///     station_name: "New Haven".to_string(),
///     measured_times: vec!["2024-03-05 00:00".to_string()],
///     measured_values: vec![0.42],
///     predicted_times: vec!["2024-03-05 00:00".to_string(), "2024-03-05 00:06".to_string()],
///     predicted_values: vec![0.40, 0.47],
/// };
///
/// assert!(snapshot.validate().is_ok());
/// assert!(TideSnapshot::default().is_empty());
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TideSnapshot {
    /// Station display name (falls back to the station id)
    pub station_name: String,
    /// Timestamps of observed water levels
    pub measured_times: Vec<String>,
    /// Observed water levels
    pub measured_values: Vec<f64>,
    /// Timestamps of predicted tide levels
    pub predicted_times: Vec<String>,
    /// Predicted tide levels
    pub predicted_values: Vec<f64>,
}

impl TideSnapshot {
    /// True when there is nothing to chart yet.
    pub fn is_empty(&self) -> bool {
        self.predicted_times.is_empty()
    }

    /// Check that each time series has exactly one value per timestamp.
    pub fn validate(&self) -> Result<(), TideError> {
        if self.measured_times.len() != self.measured_values.len() {
            return Err(TideError::Malformed {
                series: "measured",
                times: self.measured_times.len(),
                values: self.measured_values.len(),
            });
        }
        if self.predicted_times.len() != self.predicted_values.len() {
            return Err(TideError::Malformed {
                series: "predicted",
                times: self.predicted_times.len(),
                values: self.predicted_values.len(),
            });
        }
        Ok(())
    }
}
