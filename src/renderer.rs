//! # Chart Surfaces
//!
//! This module hands finished chart specs to whatever actually displays them.
//! The widget only knows the [`ChartSurface`] trait; two surfaces ship here:
//!
//! - [`JsonSurface`]: writes the chart configuration to a file that a host
//!   page polls. The layout follows Chart.js, but two fields are not Chart.js
//!   options: `scales.y.ticks.suffix` and `scales.x.ticks.labels`. The host
//!   wires them into its tick callbacks (`value + suffix` on y, `labels[index]`
//!   on x) before calling `new Chart(...)`. The file is replaced atomically so
//!   a reader never sees half a document.
//! - [`AsciiSurface`]: development mode, plots both series in the terminal.

use crate::chart::{ChartSpec, Rendered};
use crate::tide_data::TideError;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Destination for rendered charts.
pub trait ChartSurface: Send + 'static {
    /// Replace whatever is shown with `spec`.
    fn draw(&mut self, spec: &ChartSpec) -> Result<(), TideError>;

    /// Show the loading placeholder.
    fn show_loading(&mut self) -> Result<(), TideError>;

    fn present(&mut self, rendered: &Rendered) -> Result<(), TideError> {
        match rendered {
            Rendered::Loading => self.show_loading(),
            Rendered::Chart(spec) => self.draw(spec),
        }
    }
}

/// Writes the chart configuration as JSON.
///
/// Writes are blocking `std::fs` calls made on the caller's task. A chart is
/// a few tens of kilobytes, written at most once per refresh.
#[derive(Debug, Clone)]
pub struct JsonSurface {
    path: PathBuf,
}

impl JsonSurface {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        JsonSurface {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn replace(&self, contents: &[u8]) -> Result<(), TideError> {
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, contents)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl ChartSurface for JsonSurface {
    fn draw(&mut self, spec: &ChartSpec) -> Result<(), TideError> {
        self.replace(&serde_json::to_vec_pretty(spec)?)
    }

    fn show_loading(&mut self) -> Result<(), TideError> {
        self.replace(&serde_json::to_vec(&serde_json::json!({ "loading": true }))?)
    }
}

/// Plots charts as text.
#[derive(Debug)]
pub struct AsciiSurface<W> {
    out: W,
}

impl AsciiSurface<io::Stdout> {
    pub fn stdout() -> Self {
        AsciiSurface { out: io::stdout() }
    }
}

impl<W: Write + Send + 'static> AsciiSurface<W> {
    pub fn new(out: W) -> Self {
        AsciiSurface { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send + 'static> ChartSurface for AsciiSurface<W> {
    fn draw(&mut self, spec: &ChartSpec) -> Result<(), TideError> {
        draw_ascii(spec, &mut self.out)?;
        self.out.flush()?;
        Ok(())
    }

    fn show_loading(&mut self) -> Result<(), TideError> {
        writeln!(self.out, "Loading")?;
        self.out.flush()?;
        Ok(())
    }
}

/// Render a chart spec as ASCII art.
///
/// Long days are downsampled to fit a terminal; measured readings are drawn
/// over predictions where both land on the same cell.
pub fn draw_ascii<W: Write>(spec: &ChartSpec, out: &mut W) -> io::Result<()> {
    const ROWS: usize = 16;
    const MAX_COLUMNS: usize = 72;
    const Y_AXIS_WIDTH: usize = 10;

    let labels = &spec.options.scales.x.ticks.labels;
    let y_ticks = &spec.options.scales.y.ticks;
    let station = spec
        .data
        .datasets
        .first()
        .map(|d| d.label.as_str())
        .unwrap_or_default();
    let series = |name: &str| {
        spec.data
            .datasets
            .iter()
            .skip(1)
            .find(|d| d.label == name)
            .map(|d| d.data.as_slice())
            .unwrap_or_default()
    };
    let measured = series("Measured");
    let predicted = series("Predicted");

    let step = labels.len().div_ceil(MAX_COLUMNS).max(1);
    let columns = labels.len().div_ceil(step);

    let (mut min, mut max) = measured
        .iter()
        .chain(predicted)
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    if !min.is_finite() {
        min = 0.0;
        max = 1.0;
    }
    if max - min < f64::EPSILON {
        min -= 0.5;
        max += 0.5;
    }

    let to_row = |v: f64| {
        let normalized = (v - min) / (max - min);
        (((1.0 - normalized) * (ROWS as f64 - 1.0)).round() as usize).min(ROWS - 1)
    };

    let mut grid = vec![vec![' '; columns]; ROWS];
    for (column, index) in (0..labels.len()).step_by(step).enumerate() {
        if let Some(&v) = predicted.get(index).filter(|v| v.is_finite()) {
            grid[to_row(v)][column] = '·';
        }
        if let Some(&v) = measured.get(index).filter(|v| v.is_finite()) {
            grid[to_row(v)][column] = '█';
        }
    }

    let round = |v: f64| (v * 10.0).round() / 10.0;

    writeln!(out, "{station}")?;
    writeln!(out, "█ Measured  · Predicted")?;
    for (r, row) in grid.into_iter().enumerate() {
        let label = match r {
            0 => y_ticks.label(round(max)),
            r if r == ROWS / 2 => y_ticks.label(round((max + min) / 2.0)),
            r if r == ROWS - 1 => y_ticks.label(round(min)),
            _ => String::new(),
        };
        writeln!(
            out,
            "{:>width$} │{}",
            label,
            row.into_iter().collect::<String>(),
            width = Y_AXIS_WIDTH
        )?;
    }

    let padding = " ".repeat(Y_AXIS_WIDTH + 1);
    writeln!(out, "{}└{}", padding, "─".repeat(columns))?;

    let first = labels.first().map(String::as_str).unwrap_or_default();
    let last = labels.last().map(String::as_str).unwrap_or_default();
    let gap = (columns + 1).saturating_sub(first.len() + last.len());
    writeln!(out, "{}{}{}{}", padding, first, " ".repeat(gap), last)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::ChartRenderer;
    use crate::config::SuffixPolicy;
    use crate::{TideSnapshot, Units};
    use tempfile::TempDir;

    fn test_snapshot() -> TideSnapshot {
        let predicted_times: Vec<String> = (0..240)
            .map(|i| format!("2024-03-05 {:02}:{:02}", i / 10, (i % 10) * 6))
            .collect();
        let predicted_values: Vec<f64> = (0..240)
            .map(|i| 1.3 * (i as f64 / 240.0 * std::f64::consts::TAU * 2.0).sin())
            .collect();
        TideSnapshot {
            station_name: "New Haven".to_string(),
            measured_times: predicted_times[..100].to_vec(),
            measured_values: predicted_values[..100].iter().map(|v| v + 0.1).collect(),
            predicted_times,
            predicted_values,
        }
    }

    fn test_spec() -> ChartSpec {
        match ChartRenderer::new(Units::English, SuffixPolicy::Source).render(&test_snapshot()) {
            Rendered::Chart(spec) => spec,
            Rendered::Loading => panic!("expected a chart"),
        }
    }

    #[test]
    fn test_ascii_rendering() {
        let mut out = Vec::new();
        draw_ascii(&test_spec(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.starts_with("New Haven\n"));
        // One in the legend, the rest plotted
        assert!(text.matches('█').count() > 1);
        assert!(text.contains('·'));
        assert!(text.contains(" ft │"));
        assert!(text.contains("00:00"));
        assert!(text.contains("23:54"));
        // 240 samples fit in 72 columns at every 4th sample
        assert!(text.contains(&format!("└{}", "─".repeat(60))));
    }

    #[test]
    fn test_ascii_surface_loading() {
        let mut surface = AsciiSurface::new(Vec::new());
        surface.present(&Rendered::Loading).unwrap();
        assert_eq!(surface.into_inner(), b"Loading\n");
    }

    #[test]
    fn test_ascii_handles_gaps_and_flat_data() {
        let mut snapshot = test_snapshot();
        snapshot.predicted_values.iter_mut().for_each(|v| *v = 2.0);
        snapshot.measured_values.iter_mut().for_each(|v| *v = f64::NAN);
        let spec = match ChartRenderer::new(Units::English, SuffixPolicy::Source).render(&snapshot)
        {
            Rendered::Chart(spec) => spec,
            Rendered::Loading => panic!("expected a chart"),
        };

        let mut out = Vec::new();
        draw_ascii(&spec, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.matches('█').count(), 1);
        assert!(text.contains("2 ft"));
    }

    #[test]
    fn test_json_surface_writes_chart_and_loading() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("chart.json");
        let mut surface = JsonSurface::new(&path);

        surface.present(&Rendered::Loading).unwrap();
        let loading: serde_json::Value =
            serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        assert_eq!(loading["loading"], true);

        surface.draw(&test_spec()).unwrap();
        let chart: serde_json::Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        assert_eq!(chart["type"], "line");
        assert_eq!(chart["data"]["labels"].as_array().unwrap().len(), 240);
        assert_eq!(chart["data"]["datasets"][0]["label"], "New Haven");

        // No temp file left behind
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_json_surface_reports_io_errors() {
        let mut surface = JsonSurface::new("/nonexistent/dir/chart.json");
        assert!(matches!(surface.show_loading(), Err(TideError::Io(_))));
    }
}
