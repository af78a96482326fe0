//! # Configuration Management
//!
//! This module handles loading and parsing configuration from the tide-config.toml file.
//! It provides a centralized way to configure the NOAA station, the refresh timers,
//! and how the chart is labelled and where it is written.
//!
//! Every field has a default, so a file only needs the settings it changes:
//!
//! ```toml
//! [station]
//! id = "8443970"
//! units = "metric"
//!
//! [chart]
//! y_axis_suffix = "units"
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Default configuration file name, looked up in the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "tide-config.toml";

/// Application configuration loaded from tide-config.toml
#[derive(Debug, Default, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// NOAA station and query parameters
    pub station: StationConfig,
    /// Timer settings for the refresh cycle
    pub refresh: RefreshConfig,
    /// Chart labelling and output
    pub chart: ChartConfig,
}

/// NOAA tide station configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct StationConfig {
    /// NOAA station ID (e.g., "8465705" for New Haven, CT)
    pub id: String,
    /// Vertical datum code, see https://tidesandcurrents.noaa.gov/datum_options.html
    pub datum: String,
    /// Time zone mode (`lst_ldt` = local standard/daylight time, `gmt`, `lst`)
    pub time: String,
    /// `english` or `metric`; any other value is treated as `english`
    pub units: String,
    /// Base URL, ending right before the begin date value
    pub api_base: String,
}

impl Default for StationConfig {
    fn default() -> Self {
        StationConfig {
            id: "8465705".to_string(),
            datum: "MSL".to_string(),
            time: "lst_ldt".to_string(),
            units: "english".to_string(),
            api_base: "https://api.tidesandcurrents.noaa.gov/api/prod/datagetter?begin_date="
                .to_string(),
        }
    }
}

/// Refresh timing, all in milliseconds unless noted
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RefreshConfig {
    /// Fallback delay for a deferred refresh when none is given
    pub update_interval_ms: u64,
    /// Period of the steady-state refresh (NOAA publishes every 6 minutes)
    pub animation_speed_ms: u64,
    /// Delay of the second, warm-up refresh after start
    pub initial_load_delay_ms: u64,
    /// Pause between the two API calls of one fetch
    pub retry_delay_ms: u64,
    /// HTTP request timeout in seconds
    pub request_timeout_secs: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        RefreshConfig {
            update_interval_ms: 2500,
            animation_speed_ms: 6 * 60 * 1000,
            initial_load_delay_ms: 2500,
            retry_delay_ms: 2500,
            request_timeout_secs: 30,
        }
    }
}

impl RefreshConfig {
    pub fn update_interval(&self) -> Duration {
        Duration::from_millis(self.update_interval_ms)
    }

    pub fn animation_speed(&self) -> Duration {
        Duration::from_millis(self.animation_speed_ms)
    }

    pub fn initial_load_delay(&self) -> Duration {
        Duration::from_millis(self.initial_load_delay_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// How the y-axis unit suffix is chosen.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SuffixPolicy {
    /// Always label heights in feet, whatever unit system NOAA reports in.
    /// This is how the widget has always behaved, including for metric stations.
    #[default]
    Source,
    /// Label heights in feet for English units and meters for metric units.
    Units,
}

/// Chart output configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ChartConfig {
    /// Y-axis unit suffix policy
    pub y_axis_suffix: SuffixPolicy,
    /// Where the JSON surface writes the chart configuration
    pub output: PathBuf,
}

impl Default for ChartConfig {
    fn default() -> Self {
        ChartConfig {
            y_axis_suffix: SuffixPolicy::Source,
            output: PathBuf::from("tide-chart.json"),
        }
    }
}

impl Config {
    /// Load configuration from specified path
    /// Falls back to default configuration if file doesn't exist or is invalid
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<Config>(&contents) {
                Ok(config) => {
                    info!(station = %config.station.id, "loaded configuration from {}", path.display());
                    config
                }
                Err(e) => {
                    warn!("invalid config file format in {}: {}", path.display(), e);
                    warn!("using default configuration (New Haven, CT)");
                    Self::default()
                }
            },
            Err(_) => {
                info!(
                    "no config file at {}, using default configuration (New Haven, CT)",
                    path.display()
                );
                Self::default()
            }
        }
    }

    /// Save current configuration to the given path
    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(&path, contents)?;
        info!("configuration saved to {}", path.as_ref().display());
        Ok(())
    }
}
