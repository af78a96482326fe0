//! # Tide Chart Application Entry Point
//!
//! This binary runs the tide widget until Ctrl-C, publishing the chart either
//! as a Chart.js configuration file (default) or as ASCII art (`--stdout`).
//!
//! ```text
//! tide-chart [CONFIG] [--stdout] [--once] [--init-config]
//! ```
//!
//! - `CONFIG`: configuration file, `tide-config.toml` by default
//! - `--stdout`: development mode, draw in the terminal
//! - `--once`: fetch and draw a single time, then exit
//! - `--init-config`: write the default configuration to `CONFIG` and exit
//!
//! Log verbosity follows `RUST_LOG` (default `info`).


use anyhow::Context;
use std::env;
use std::path::PathBuf;
use tide_chart_lib::config::{Config, DEFAULT_CONFIG_PATH};
use tide_chart_lib::renderer::{AsciiSurface, ChartSurface, JsonSurface};
use tide_chart_lib::tide_data::NoaaFetcher;
use tide_chart_lib::widget::TideWidget;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

/// Main application entry point.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let development_mode = args.iter().any(|arg| arg == "--stdout");
    let once = args.iter().any(|arg| arg == "--once");
    let init_config = args.iter().any(|arg| arg == "--init-config");
    let config_path = args
        .iter()
        .find(|arg| !arg.starts_with("--"))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

    if init_config {
        return Config::default()
            .save_to_path(&config_path)
            .map_err(|e| anyhow::anyhow!("writing {}: {e}", config_path.display()));
    }

    let config = Config::load_from_path(&config_path);
    let fetcher = NoaaFetcher::new(&config).context("building HTTP client")?;

    // Development mode: ASCII output for testing
    if development_mode {
        run(config, fetcher, AsciiSurface::stdout(), once).await
    } else {
        let surface = JsonSurface::new(&config.chart.output);
        info!("writing chart to {}", surface.path().display());
        run(config, fetcher, surface, once).await
    }
}

async fn run<S: ChartSurface>(
    config: Config,
    fetcher: NoaaFetcher,
    surface: S,
    once: bool,
) -> anyhow::Result<()> {
    let widget = TideWidget::new(config, fetcher, surface);

    if once {
        widget.refresh_once().await.context("refreshing tide chart")?;
        return Ok(());
    }

    let handle = widget.start();
    tokio::signal::ctrl_c()
        .await
        .context("waiting for Ctrl-C")?;
    info!("shutting down");
    handle.stop().await;
    Ok(())
}
