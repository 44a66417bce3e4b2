//! Temperature trend chart: filter, resample, pivot per city, render to PNG.

use anyhow::{Context, Result};
use chrono::{DateTime, TimeDelta, Utc};
use plotters::prelude::*;
use std::{
    collections::{BTreeMap, BTreeSet},
    fmt, fs,
    path::{Path, PathBuf},
};
use tracing::{info, warn};

use crate::{
    History, Units,
    resample::{Sample, resample},
};

/// Default number of most recent time-axis points kept on the chart.
pub const DEFAULT_POINT_LIMIT: usize = 400;

const CHART_SIZE: (u32, u32) = (1280, 720);

#[derive(Debug, Clone, PartialEq)]
pub struct PlotRequest {
    /// Rows strictly after this instant are excluded.
    pub cutoff: DateTime<Utc>,
    pub city: Option<String>,
    pub limit: Option<usize>,
    pub resample: Option<TimeDelta>,
    pub units: Units,
}

impl PlotRequest {
    pub fn new(cutoff: DateTime<Utc>, units: Units) -> Self {
        Self {
            cutoff,
            city: None,
            limit: Some(DEFAULT_POINT_LIMIT),
            resample: None,
            units,
        }
    }
}

/// Why no chart was drawn. None of these are errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    NoHistory,
    NoDataInWindow,
    NoDataForCity(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoHistory => f.write_str("no history available"),
            SkipReason::NoDataInWindow => f.write_str("no data inside the plot window"),
            SkipReason::NoDataForCity(city) => write!(f, "no data for city '{city}'"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlotOutcome {
    Written(PathBuf),
    Skipped(SkipReason),
}

/// Temperature per city on a shared time axis.
///
/// A city with no value at an axis instant simply has no point there.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemperatureTable {
    axis: Vec<DateTime<Utc>>,
    series: BTreeMap<String, Vec<(DateTime<Utc>, f64)>>,
}

impl TemperatureTable {
    pub fn pivot(samples: &[Sample]) -> Self {
        let axis: BTreeSet<DateTime<Utc>> = samples.iter().map(|s| s.timestamp).collect();

        let mut series: BTreeMap<String, Vec<(DateTime<Utc>, f64)>> = BTreeMap::new();
        for s in samples {
            if let Some(temp) = s.temperature {
                series
                    .entry(s.city.clone())
                    .or_default()
                    .push((s.timestamp, temp));
            }
        }
        for points in series.values_mut() {
            points.sort_by_key(|(t, _)| *t);
        }

        Self {
            axis: axis.into_iter().collect(),
            series,
        }
    }

    /// Keep only the most recent `n` instants of the time axis.
    pub fn keep_last(&mut self, n: usize) {
        if self.axis.len() <= n {
            return;
        }

        self.axis.drain(..self.axis.len() - n);
        match self.axis.first().copied() {
            Some(first) => {
                for points in self.series.values_mut() {
                    points.retain(|(t, _)| *t >= first);
                }
                self.series.retain(|_, points| !points.is_empty());
            }
            None => self.series.clear(),
        }
    }

    pub fn axis(&self) -> &[DateTime<Utc>] {
        &self.axis
    }

    pub fn series(&self) -> &BTreeMap<String, Vec<(DateTime<Utc>, f64)>> {
        &self.series
    }

    pub fn point_count(&self) -> usize {
        self.series.values().map(Vec::len).sum()
    }

    fn points(&self) -> impl Iterator<Item = &(DateTime<Utc>, f64)> {
        self.series.values().flatten()
    }

    fn time_range(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let start = self.points().map(|(t, _)| *t).min()?;
        let end = self.points().map(|(t, _)| *t).max()?;

        if start == end {
            let pad = TimeDelta::minutes(30);
            Some((start - pad, end + pad))
        } else {
            Some((start, end))
        }
    }

    fn value_range(&self) -> Option<(f64, f64)> {
        let lo = self.points().map(|(_, v)| *v).reduce(f64::min)?;
        let hi = self.points().map(|(_, v)| *v).reduce(f64::max)?;

        let pad = if hi - lo < f64::EPSILON {
            1.0
        } else {
            (hi - lo) * 0.05
        };
        Some((lo - pad, hi + pad))
    }
}

/// Apply cutoff, city filter, resampling, pivot and point limit, in that order.
pub fn prepare(
    history: Option<&History>,
    request: &PlotRequest,
) -> Result<TemperatureTable, SkipReason> {
    let history = history
        .filter(|h| !h.is_empty())
        .ok_or(SkipReason::NoHistory)?;

    let mut samples: Vec<Sample> = history
        .rows()
        .iter()
        .filter(|row| row.timestamp <= request.cutoff)
        .map(Sample::from)
        .collect();
    if samples.is_empty() {
        return Err(SkipReason::NoDataInWindow);
    }

    if let Some(city) = &request.city {
        samples.retain(|s| &s.city == city);
        if samples.is_empty() {
            return Err(SkipReason::NoDataForCity(city.clone()));
        }
    }

    if let Some(interval) = request.resample {
        samples = resample(&samples, interval);
    }

    let mut table = TemperatureTable::pivot(&samples);
    if let Some(limit) = request.limit {
        table.keep_last(limit);
    }

    if table.point_count() == 0 {
        return Err(SkipReason::NoDataInWindow);
    }

    Ok(table)
}

/// Render the history to `path`, overwriting any previous chart.
///
/// No-data situations are logged and reported as [`PlotOutcome::Skipped`]; no file is written.
pub fn plot_history(
    history: Option<&History>,
    request: &PlotRequest,
    path: &Path,
) -> Result<PlotOutcome> {
    let table = match prepare(history, request) {
        Ok(table) => table,
        Err(reason) => {
            warn!("Skipping plot: {reason}");
            if let Some(history) = history.filter(|h| cutoff_hides_all(h, request.cutoff)) {
                info!(
                    "All {} history rows are after the plot cutoff {}; pass --cutoff or set plot_cutoff to plot them",
                    history.len(),
                    request.cutoff.to_rfc3339()
                );
            }
            return Ok(PlotOutcome::Skipped(reason));
        }
    };

    render(&table, request.units, path)?;

    info!(
        "Plotted {} points for {} cities to {}",
        table.point_count(),
        table.series().len(),
        path.display()
    );

    Ok(PlotOutcome::Written(path.to_path_buf()))
}

/// True when the history has rows and every one of them is past `cutoff`.
fn cutoff_hides_all(history: &History, cutoff: DateTime<Utc>) -> bool {
    !history.is_empty() && history.rows().iter().all(|row| row.timestamp > cutoff)
}

#[cfg_attr(not(feature = "labels"), allow(unused_variables))]
fn render(table: &TemperatureTable, units: Units, path: &Path) -> Result<()> {
    let ((start, end), (lo, hi)) = match (table.time_range(), table.value_range()) {
        (Some(t), Some(v)) => (t, v),
        _ => return Ok(()),
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create plot directory: {}", parent.display()))?;
    }

    let symbol = units.temperature_symbol();
    let root = BitMapBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut builder = ChartBuilder::on(&root);
    builder.margin(16).x_label_area_size(48).y_label_area_size(64);
    #[cfg(feature = "labels")]
    builder.caption(
        format!("Temperature trend ({symbol})"),
        ("sans-serif", 28).into_font(),
    );
    let mut chart = builder.build_cartesian_2d(start..end, lo..hi)?;

    let format_time = |t: &DateTime<Utc>| t.format("%m-%d %H:%M").to_string();
    let mut mesh = chart.configure_mesh();
    mesh.x_label_formatter(&format_time);
    // Without a font backend plotters panics on any text, so ticks stay unlabeled.
    #[cfg(feature = "labels")]
    mesh.x_desc("Time (UTC)")
        .y_desc(format!("Temperature ({symbol})"))
        .x_labels(8);
    #[cfg(not(feature = "labels"))]
    mesh.x_labels(0).y_labels(0);
    mesh.draw()?;

    for (idx, (city, points)) in table.series().iter().enumerate() {
        let color = Palette99::pick(idx).to_rgba();

        chart
            .draw_series(LineSeries::new(points.iter().copied(), color.stroke_width(2)))?
            .label(city.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));

        chart.draw_series(
            points
                .iter()
                .map(|&(t, v)| Circle::new((t, v), 4, color.filled())),
        )?;
    }

    #[cfg(feature = "labels")]
    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(WHITE.mix(0.85))
        .border_style(&BLACK)
        .draw()?;

    root.present()
        .with_context(|| format!("Failed to write plot file: {}", path.display()))?;

    Ok(())
}
