//! # NOAA Tide Data Fetching
//!
//! This module handles all network operations for fetching today's tide data
//! from NOAA's CO-OPS datagetter API, and defines the [`TideFetcher`] seam the
//! widget talks to.
//!
//! ## Data Source
//!
//! ### NOAA CO-OPS API
//! - **URL**: https://api.tidesandcurrents.noaa.gov/api/prod/datagetter
//! - **Products**: `predictions` (harmonic forecast) and `water_level` (observed)
//! - **Format**: JSON, one object per reading, values encoded as strings
//! - **Cadence**: new observations every 6 minutes
//!
//! ### Response Shapes
//! ```json
//! {"predictions": [{"t": "2024-03-05 00:00", "v": "1.234"}]}
//! {"metadata": {"id": "8465705", "name": "New Haven", "lat": "41.2833", "lon": "-72.9083"},
//!  "data": [{"t": "2024-03-05 00:00", "v": "1.190", "s": "0.003", "f": "0,0,0,0", "q": "p"}]}
//! {"error": {"message": "No data was found. This product may not be offered at this station at the requested time."}}
//! ```
//!
//! ## Error Handling
//!
//! - **Predictions unavailable**: the whole fetch fails, nothing to chart
//! - **Water level unavailable**: common for prediction-only stations and
//!   just after midnight; the snapshot is returned with empty measured series
//! - **Empty readings**: an empty `"v"` becomes `NaN`, a gap in the chart
//!
//! All errors propagate through the `TideError` enum for consistent handling.

use crate::config::Config;
use crate::request::RequestPair;
use crate::TideSnapshot;
use serde::Deserialize;
use std::future::Future;
use std::io;
use std::time::Duration;
use thiserror::Error;
use tokio::time;
use tracing::{debug, warn};

/// Errors that can occur while fetching, validating or publishing tide data.
#[derive(Error, Debug)]
pub enum TideError {
    /// HTTP request failed (network, server, or protocol error)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// NOAA answered with an error object instead of data
    #[error("NOAA API error: {0}")]
    Api(String),

    /// Response body did not match the expected structure
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A reading could not be interpreted
    #[error("parse error: {0}")]
    Parse(String),

    /// A snapshot whose time and value series differ in length
    #[error("malformed {series} series: {times} times, {values} values")]
    Malformed {
        series: &'static str,
        times: usize,
        values: usize,
    },

    /// Writing chart output failed (permissions, disk space)
    #[error("output IO: {0}")]
    Io(#[from] io::Error),
}

/// Anything that can turn a [`RequestPair`] into a [`TideSnapshot`].
///
/// The returned future runs on its own task, so it must be `Send`. Replies
/// may arrive in any order relative to the requests that caused them.
pub trait TideFetcher: Send + Sync + 'static {
    fn fetch(
        &self,
        request: RequestPair,
    ) -> impl Future<Output = Result<TideSnapshot, TideError>> + Send;
}

/// Fetcher backed by the public NOAA API.
#[derive(Clone, Debug)]
pub struct NoaaFetcher {
    client: reqwest::Client,
    station_id: String,
    retry_delay: Duration,
}

impl NoaaFetcher {
    pub fn new(config: &Config) -> Result<Self, TideError> {
        let client = reqwest::Client::builder()
            .timeout(config.refresh.request_timeout())
            .user_agent(concat!("tide-chart/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(NoaaFetcher {
            client,
            station_id: config.station.id.clone(),
            retry_delay: config.refresh.retry_delay(),
        })
    }

    async fn get_text(&self, url: &str) -> Result<String, TideError> {
        debug!(%url, "GET");
        let body = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(body)
    }
}

impl TideFetcher for NoaaFetcher {
    fn fetch(
        &self,
        request: RequestPair,
    ) -> impl Future<Output = Result<TideSnapshot, TideError>> + Send {
        let fetcher = self.clone();
        async move {
            let predicted = parse_predictions(&fetcher.get_text(&request.predicted).await?)?;

            // Space the two calls out so the API isn't hit back to back
            time::sleep(fetcher.retry_delay).await;

            let measured = match fetcher.get_text(&request.measured).await {
                Ok(body) => parse_water_level(&body),
                Err(e) => Err(e),
            };

            assemble(&fetcher.station_id, predicted, measured)
        }
    }
}

// -- Wire Format --

#[derive(Debug, Deserialize)]
struct NoaaResponse {
    #[serde(default)]
    metadata: Option<StationMetadata>,
    #[serde(default)]
    data: Option<Vec<Reading>>,
    #[serde(default)]
    predictions: Option<Vec<Reading>>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct StationMetadata {
    name: String,
}

#[derive(Debug, Deserialize)]
struct Reading {
    t: String,
    v: String,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

/// One parsed time/value series.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Series {
    pub times: Vec<String>,
    pub values: Vec<f64>,
}

/// Parsed `water_level` response.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct WaterLevel {
    pub station_name: Option<String>,
    pub series: Series,
}

fn parse_value(raw: &str) -> Result<f64, TideError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(f64::NAN);
    }
    raw.parse::<f64>()
        .map_err(|_| TideError::Parse(format!("invalid reading {raw:?}")))
}

fn to_series(readings: Vec<Reading>) -> Result<Series, TideError> {
    let mut series = Series {
        times: Vec::with_capacity(readings.len()),
        values: Vec::with_capacity(readings.len()),
    };
    for reading in readings {
        series.values.push(parse_value(&reading.v)?);
        series.times.push(reading.t);
    }
    Ok(series)
}

fn decode(body: &str) -> Result<NoaaResponse, TideError> {
    let response: NoaaResponse = serde_json::from_str(body)?;
    if let Some(error) = &response.error {
        return Err(TideError::Api(error.message.trim().to_string()));
    }
    Ok(response)
}

/// Parse a `product=predictions` response body.
pub fn parse_predictions(body: &str) -> Result<Series, TideError> {
    let response = decode(body)?;
    let readings = response
        .predictions
        .ok_or_else(|| TideError::Parse("missing \"predictions\" array".to_string()))?;
    to_series(readings)
}

/// Parse a `product=water_level` response body.
pub fn parse_water_level(body: &str) -> Result<WaterLevel, TideError> {
    let response = decode(body)?;
    let readings = response
        .data
        .ok_or_else(|| TideError::Parse("missing \"data\" array".to_string()))?;
    Ok(WaterLevel {
        station_name: response.metadata.map(|m| m.name),
        series: to_series(readings)?,
    })
}

/// Combine both responses into one snapshot.
///
/// A water-level error reported by NOAA itself leaves the measured series
/// empty; transport and format errors fail the fetch.
pub fn assemble(
    station_id: &str,
    predicted: Series,
    measured: Result<WaterLevel, TideError>,
) -> Result<TideSnapshot, TideError> {
    let measured = match measured {
        Ok(level) => level,
        Err(TideError::Api(message)) => {
            warn!(station = %station_id, "no water level data: {message}");
            WaterLevel::default()
        }
        Err(e) => return Err(e),
    };

    let station_name = measured
        .station_name
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| station_id.to_string());

    Ok(TideSnapshot {
        station_name,
        measured_times: measured.series.times,
        measured_values: measured.series.values,
        predicted_times: predicted.times,
        predicted_values: predicted.values,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::RequestBuilder;
    use std::sync::{Arc, Mutex};
    use std::time::Instant;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    const PREDICTIONS: &str = r#"{"predictions": [
        {"t": "2024-03-05 00:00", "v": "1.234"},
        {"t": "2024-03-05 00:06", "v": "1.301"},
        {"t": "2024-03-05 00:12", "v": "-0.05"}
    ]}"#;

    const WATER_LEVEL: &str = r#"{
        "metadata": {"id": "8465705", "name": "New Haven", "lat": "41.2833", "lon": "-72.9083"},
        "data": [
            {"t": "2024-03-05 00:00", "v": "1.190", "s": "0.003", "f": "0,0,0,0", "q": "p"},
            {"t": "2024-03-05 00:06", "v": "", "s": "", "f": "1,0,0,0", "q": "p"}
        ]
    }"#;

    const NO_DATA: &str = r#"{"error": {"message": "No data was found. This product may not be offered at this station at the requested time."}}"#;

    #[test]
    fn test_parse_predictions() {
        let series = parse_predictions(PREDICTIONS).unwrap();
        assert_eq!(series.times.len(), 3);
        assert_eq!(series.times[1], "2024-03-05 00:06");
        assert_eq!(series.values, vec![1.234, 1.301, -0.05]);
    }

    #[test]
    fn test_parse_water_level_with_gap() {
        let level = parse_water_level(WATER_LEVEL).unwrap();
        assert_eq!(level.station_name.as_deref(), Some("New Haven"));
        assert_eq!(level.series.times.len(), 2);
        assert_eq!(level.series.values[0], 1.19);
        assert!(level.series.values[1].is_nan());
    }

    #[test]
    fn test_api_error_is_reported() {
        let err = parse_predictions(NO_DATA).unwrap_err();
        assert!(matches!(err, TideError::Api(ref msg) if msg.starts_with("No data was found")));
    }

    #[test]
    fn test_bad_reading_is_parse_error() {
        let body = r#"{"predictions": [{"t": "2024-03-05 00:00", "v": "high"}]}"#;
        assert!(matches!(parse_predictions(body), Err(TideError::Parse(_))));
    }

    #[test]
    fn test_missing_array_is_parse_error() {
        assert!(matches!(parse_water_level("{}"), Err(TideError::Parse(_))));
        assert!(matches!(parse_predictions("not json"), Err(TideError::Json(_))));
    }

    #[test]
    fn test_assemble_full() {
        let snapshot = assemble(
            "8465705",
            parse_predictions(PREDICTIONS).unwrap(),
            parse_water_level(WATER_LEVEL),
        )
        .unwrap();

        assert_eq!(snapshot.station_name, "New Haven");
        assert_eq!(snapshot.predicted_times.len(), 3);
        assert_eq!(snapshot.measured_times.len(), 2);
        assert!(snapshot.validate().is_ok());
    }

    #[test]
    fn test_assemble_without_water_level() {
        let snapshot = assemble(
            "8465705",
            parse_predictions(PREDICTIONS).unwrap(),
            parse_water_level(NO_DATA),
        )
        .unwrap();

        assert_eq!(snapshot.station_name, "8465705");
        assert!(snapshot.measured_times.is_empty());
        assert!(snapshot.measured_values.is_empty());
        assert_eq!(snapshot.predicted_values.len(), 3);
    }

    #[test]
    fn test_assemble_propagates_format_errors() {
        let result = assemble(
            "8465705",
            parse_predictions(PREDICTIONS).unwrap(),
            parse_water_level("{}"),
        );
        assert!(matches!(result, Err(TideError::Parse(_))));
    }

    /// Local HTTP server answering predictions with [`PREDICTIONS`] and
    /// water levels with a fixed status and body.
    struct CannedServer {
        base: String,
        seen: Arc<Mutex<Vec<(String, Instant)>>>,
    }

    impl CannedServer {
        async fn start(water_level_status: u16, water_level_body: &'static str) -> Self {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            let seen = Arc::new(Mutex::new(Vec::new()));
            let log = Arc::clone(&seen);

            tokio::spawn(async move {
                while let Ok((mut socket, _)) = listener.accept().await {
                    let mut buf = vec![0u8; 8192];
                    let mut read = 0;
                    while !buf[..read].windows(4).any(|w| w == b"\r\n\r\n") {
                        let n = socket.read(&mut buf[read..]).await.unwrap();
                        if n == 0 {
                            break;
                        }
                        read += n;
                    }

                    let request = String::from_utf8_lossy(&buf[..read]).to_string();
                    let path = request.split_whitespace().nth(1).unwrap_or_default().to_string();
                    let (status, body) = if path.contains("product=predictions") {
                        (200, PREDICTIONS)
                    } else {
                        (water_level_status, water_level_body)
                    };
                    log.lock().unwrap().push((path, Instant::now()));

                    let response = format!(
                        "HTTP/1.1 {status} Canned\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                        body.len()
                    );
                    socket.write_all(response.as_bytes()).await.unwrap();
                    let _ = socket.shutdown().await;
                }
            });

            CannedServer {
                base: format!("http://{addr}/api/prod/datagetter?begin_date="),
                seen,
            }
        }

        async fn fetch(&self) -> Result<TideSnapshot, TideError> {
            let mut config = Config::default();
            config.station.api_base = self.base.clone();
            config.refresh.retry_delay_ms = 50;

            let fetcher = NoaaFetcher::new(&config).unwrap();
            let request = RequestBuilder::new(&config.station).build_today();
            fetcher.fetch(request).await
        }

        fn paths(&self) -> Vec<String> {
            self.seen.lock().unwrap().iter().map(|(p, _)| p.clone()).collect()
        }
    }

    #[tokio::test]
    async fn test_fetch_predictions_then_water_level() {
        let server = CannedServer::start(200, WATER_LEVEL).await;
        let snapshot = server.fetch().await.unwrap();

        assert_eq!(snapshot.station_name, "New Haven");
        assert_eq!(snapshot.predicted_values.len(), 3);
        assert_eq!(snapshot.measured_values.len(), 2);

        let seen = server.seen.lock().unwrap().clone();
        assert_eq!(seen.len(), 2);
        assert!(seen[0].0.contains("&station=8465705&product=predictions&"));
        assert!(seen[1].0.contains("&station=8465705&product=water_level&"));
        // Water level is requested only after the retry delay
        assert!(seen[1].1.duration_since(seen[0].1) >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_fetch_without_water_level_data() {
        let server = CannedServer::start(200, NO_DATA).await;
        let snapshot = server.fetch().await.unwrap();

        assert_eq!(snapshot.station_name, "8465705");
        assert!(snapshot.measured_times.is_empty());
        assert!(snapshot.measured_values.is_empty());
        assert_eq!(snapshot.predicted_times.len(), 3);
        assert_eq!(server.paths().len(), 2);
    }

    #[tokio::test]
    async fn test_fetch_fails_on_water_level_server_error() {
        let server = CannedServer::start(500, "{}").await;
        let result = server.fetch().await;

        assert!(matches!(result, Err(TideError::Http(_))));
        assert_eq!(server.paths().len(), 2);
    }

    #[test]
    fn test_fetcher_builds_from_config() {
        let fetcher = NoaaFetcher::new(&Config::default()).unwrap();
        assert_eq!(fetcher.station_id, "8465705");
        assert_eq!(fetcher.retry_delay, Duration::from_millis(2500));
    }
}
