//! # Chart Specification
//!
//! Maps a [`TideSnapshot`] to a declarative, Chart.js-style line chart
//! configuration. Nothing here draws: the resulting [`ChartSpec`] is handed
//! to a [`crate::renderer::ChartSurface`].
//!
//! ## Layout
//!
//! - **X axis**: the predicted timestamps, which always cover the whole day.
//!   Measured values are plotted against the same labels, so the measured
//!   line simply stops at the latest observation.
//! - **Datasets**: an empty legend entry carrying the station name, then
//!   "Measured" (blue, filled down to the next dataset), then "Predicted"
//!   (gray, unfilled). Point markers are fully transparent on both lines.
//! - **Ticks**: heights get a unit suffix, times are shown as `HH:MM`.
//! - **Animation**: disabled; a redraw every few minutes must not animate.
//!
//! Tick callbacks cannot travel through JSON, so the formatted x labels are
//! precomputed into `ticks.labels` and the y suffix is carried as data.

use crate::config::SuffixPolicy;
use crate::{TideSnapshot, Units};
use chrono::{DateTime, Local, NaiveDateTime, Timelike};
use serde::Serialize;

const MEASURED_FILL: &str = "rgba(31, 133, 224, 0.25)";
const MEASURED_BORDER: &str = "rgba(31, 133, 224, 0.75)";
const PREDICTED_BORDER: &str = "gray";
const HIDDEN_POINT: &str = "rgba(0,0,0,0)";
const GOLDEN_RATIO: f64 = 1.618;

/// Result of one render request.
#[derive(Clone, Debug, PartialEq)]
pub enum Rendered {
    /// No predictions yet: show a loading placeholder
    Loading,
    Chart(ChartSpec),
}

/// Top-level chart configuration.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChartSpec {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub data: ChartData,
    pub options: ChartOptions,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChartData {
    pub labels: Vec<String>,
    pub datasets: Vec<Dataset>,
}

/// `fill` accepts either a relative dataset reference or `false`.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Fill {
    Relative(&'static str),
    Off(bool),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    pub label: String,
    /// `NaN` readings serialize as `null`, drawn as a gap
    pub data: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill: Option<Fill>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_color: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_color: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub point_border_color: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub point_background_color: Option<&'static str>,
}

impl Dataset {
    fn legend_only(label: &str) -> Self {
        Dataset {
            label: label.to_string(),
            data: Vec::new(),
            fill: None,
            background_color: None,
            border_color: None,
            point_border_color: None,
            point_background_color: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartOptions {
    pub aspect_ratio: f64,
    pub scales: Scales,
    pub animation: Animation,
    pub plugins: Plugins,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Scales {
    pub y: YAxis,
    pub x: XAxis,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct YAxis {
    pub ticks: YTicks,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YTicks {
    pub begin_at_zero: bool,
    /// Appended to every tick value, e.g. `" ft"`
    pub suffix: &'static str,
}

impl YTicks {
    /// Label for a tick at `value`.
    pub fn label(&self, value: f64) -> String {
        format_height_tick(value, self.suffix)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct XAxis {
    pub ticks: XTicks,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct XTicks {
    /// `HH:MM` form of every entry in `data.labels`
    pub labels: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Animation {
    pub duration: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Plugins {
    pub filler: Filler,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Filler {
    pub propagate: bool,
}

/// Builds [`ChartSpec`]s for one unit system and suffix policy.
#[derive(Clone, Copy, Debug)]
pub struct ChartRenderer {
    suffix: &'static str,
}

impl ChartRenderer {
    pub fn new(units: Units, policy: SuffixPolicy) -> Self {
        ChartRenderer {
            suffix: unit_suffix(units, policy),
        }
    }

    /// Y-axis suffix in use.
    pub fn suffix(&self) -> &'static str {
        self.suffix
    }

    /// Map a snapshot to a chart, or to the loading placeholder when there
    /// are no predictions to draw against.
    pub fn render(&self, snapshot: &TideSnapshot) -> Rendered {
        if snapshot.is_empty() {
            return Rendered::Loading;
        }

        let labels = snapshot.predicted_times.clone();
        let tick_labels = labels.iter().map(|l| format_time_tick(l)).collect();

        let measured = Dataset {
            label: "Measured".to_string(),
            data: snapshot.measured_values.clone(),
            fill: Some(Fill::Relative("+1")),
            background_color: Some(MEASURED_FILL),
            border_color: Some(MEASURED_BORDER),
            point_border_color: Some(HIDDEN_POINT),
            point_background_color: Some(HIDDEN_POINT),
        };
        let predicted = Dataset {
            label: "Predicted".to_string(),
            data: snapshot.predicted_values.clone(),
            fill: Some(Fill::Off(false)),
            background_color: None,
            border_color: Some(PREDICTED_BORDER),
            point_border_color: Some(HIDDEN_POINT),
            point_background_color: Some(HIDDEN_POINT),
        };

        Rendered::Chart(ChartSpec {
            kind: "line",
            data: ChartData {
                labels,
                datasets: vec![
                    Dataset::legend_only(&snapshot.station_name),
                    measured,
                    predicted,
                ],
            },
            options: ChartOptions {
                aspect_ratio: GOLDEN_RATIO,
                scales: Scales {
                    y: YAxis {
                        ticks: YTicks {
                            begin_at_zero: true,
                            suffix: self.suffix,
                        },
                    },
                    x: XAxis {
                        ticks: XTicks {
                            labels: tick_labels,
                        },
                    },
                },
                animation: Animation { duration: 0 },
                plugins: Plugins {
                    filler: Filler { propagate: true },
                },
            },
        })
    }
}

/// Resolve the y-axis suffix.
///
/// Under [`SuffixPolicy::Source`] heights are always labelled in feet, even
/// when NOAA was asked for metric values.
pub fn unit_suffix(units: Units, policy: SuffixPolicy) -> &'static str {
    match (policy, units) {
        (SuffixPolicy::Units, Units::Metric) => " m",
        _ => " ft",
    }
}

/// Format a height tick: the plain number followed by the suffix.
pub fn format_height_tick(value: f64, suffix: &str) -> String {
    format!("{value}{suffix}")
}

/// Format a timestamp label as zero-padded 24-hour `HH:MM`.
///
/// Naive timestamps are taken as local time; timestamps with an offset are
/// converted to local time first. Labels that don't parse are returned as-is.
pub fn format_time_tick(label: &str) -> String {
    match parse_timestamp(label) {
        Some(t) => format!("{:02}:{:02}", t.hour(), t.minute()),
        None => label.to_string(),
    }
}

fn parse_timestamp(label: &str) -> Option<NaiveDateTime> {
    const NAIVE_FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%d %H:%M:%S",
    ];

    let label = label.trim();
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(label, fmt).ok())
        .or_else(|| {
            DateTime::parse_from_rfc3339(label)
                .ok()
                .map(|t| t.with_timezone(&Local).naive_local())
        })
}
