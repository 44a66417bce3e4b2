//! One collection run: fetch → {snapshot, history} → load → plot.

use anyhow::{Context, Result};
use tracing::{error, info, instrument};

use crate::{
    DataPaths, HistoryStore, Observation, WeatherProvider,
    plot::{PlotOutcome, PlotRequest, plot_history},
    snapshot::write_snapshot,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Number of cities fetched successfully.
    pub fetched: usize,
    /// Cities skipped because their fetch failed, in configured order.
    pub failed: Vec<String>,
    /// `None` when nothing was fetched and the downstream steps were skipped.
    pub plot: Option<PlotOutcome>,
}

/// Fetch every city one at a time, in order. Failures are logged by the provider and collected.
pub async fn fetch_all(
    provider: &dyn WeatherProvider,
    cities: &[String],
) -> (Vec<Observation>, Vec<String>) {
    let mut observations = Vec::with_capacity(cities.len());
    let mut failed = Vec::new();

    for city in cities {
        match provider.current(city).await {
            Ok(obs) => observations.push(obs),
            Err(_) => failed.push(city.clone()),
        }
    }

    (observations, failed)
}

/// Run the whole pipeline once.
///
/// Only storage and rendering failures are returned as errors; per-city fetch
/// failures and empty results are logged and reflected in the summary.
#[instrument(skip_all, fields(cities = cities.len()))]
pub async fn run_once(
    provider: &dyn WeatherProvider,
    store: &dyn HistoryStore,
    cities: &[String],
    paths: &DataPaths,
    request: &PlotRequest,
) -> Result<RunSummary> {
    let (observations, failed) = fetch_all(provider, cities).await;

    if observations.is_empty() {
        error!(
            "No weather data fetched for any of {} cities; skipping snapshot, history and plot",
            cities.len()
        );
        return Ok(RunSummary {
            fetched: 0,
            failed,
            plot: None,
        });
    }

    info!(
        "Fetched {} of {} cities",
        observations.len(),
        cities.len()
    );

    paths.ensure_dir()?;
    write_snapshot(&paths.snapshot, provider.source(), &observations)?;
    store
        .append(&observations)
        .context("Failed to append observations to history")?;

    let history = store.load().context("Failed to load history")?;
    let plot = plot_history(history.as_ref(), request, &paths.plot)?;

    Ok(RunSummary {
        fetched: observations.len(),
        failed,
        plot: Some(plot),
    })
}
