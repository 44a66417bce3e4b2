use chrono::{DateTime, TimeDelta, Utc};
use clap::Parser;
use std::path::PathBuf;
use tracing::{debug, info};
use weatherlog_core::{
    Config, CsvHistoryStore, DEFAULT_POINT_LIMIT, DataPaths, PlotOutcome, PlotRequest, Units,
    parse_interval, provider::provider_from_config, run_once,
};

/// Top-level CLI struct. Every run fetches, records and plots.
#[derive(Debug, Parser)]
#[command(
    name = "weatherlog",
    version,
    about = "Fetch current weather for configured cities, log it and plot temperature trends"
)]
pub struct Cli {
    /// Plot only this city.
    #[arg(long)]
    pub city: Option<String>,

    /// Keep only the most recent N points of the plotted time axis.
    #[arg(long, value_name = "N", default_value_t = DEFAULT_POINT_LIMIT)]
    pub last: usize,

    /// Average readings into buckets of this size before plotting, e.g. "15 minutes" or "1 hour".
    #[arg(long, value_name = "INTERVAL", value_parser = parse_resample)]
    pub resample: Option<TimeDelta>,

    /// Exclude readings after this RFC 3339 instant from the plot (overrides the config file).
    ///
    /// The built-in default is 2025-12-31T23:59:59Z; newer readings are still
    /// recorded but only plotted once this is moved past them.
    #[arg(long, value_name = "INSTANT")]
    pub cutoff: Option<DateTime<Utc>>,

    /// Directory for the snapshot, history and plot files.
    #[arg(long, value_name = "PATH")]
    pub data_dir: Option<PathBuf>,

    /// Unit system requested from the API: imperial, metric or standard.
    #[arg(long, value_parser = parse_units)]
    pub units: Option<Units>,

    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(short, long)]
    pub verbose: bool,
}

fn parse_resample(value: &str) -> Result<TimeDelta, String> {
    parse_interval(value).map_err(|e| e.to_string())
}

fn parse_units(value: &str) -> Result<Units, String> {
    Units::try_from(value).map_err(|e| e.to_string())
}

impl Cli {
    /// Merge flags over the config file and environment.
    fn resolve_config(&self, config: Config) -> Config {
        let mut config = config.with_env_overrides();

        if let Some(dir) = &self.data_dir {
            config.data_dir = Some(dir.clone());
        }
        if let Some(units) = self.units {
            config.units = units;
        }
        if let Some(cutoff) = self.cutoff {
            config.plot_cutoff = cutoff;
        }

        config
    }

    fn plot_request(&self, config: &Config) -> PlotRequest {
        PlotRequest {
            cutoff: config.plot_cutoff,
            city: self.city.clone(),
            limit: Some(self.last),
            resample: self.resample,
            units: config.units,
        }
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let config = self.resolve_config(Config::load()?);
        debug!("Resolved configuration for {} cities", config.cities.len());

        // Fails fast on a missing API key, before any request is sent.
        let provider = provider_from_config(&config)?;

        let paths = DataPaths::new(config.resolve_data_dir()?);
        let store = CsvHistoryStore::new(&paths.history);
        let request = self.plot_request(&config);

        let summary = run_once(
            provider.as_ref(),
            &store,
            &config.cities,
            &paths,
            &request,
        )
        .await?;

        info!(
            "Run finished: {} fetched, {} failed",
            summary.fetched,
            summary.failed.len()
        );

        println!("Fetched {}/{} cities", summary.fetched, config.cities.len());
        if !summary.failed.is_empty() {
            println!("Skipped: {}", summary.failed.join(", "));
        }
        match summary.plot {
            Some(PlotOutcome::Written(path)) => println!("Plot written to {}", path.display()),
            Some(PlotOutcome::Skipped(reason)) => println!("Plot skipped: {reason}"),
            None => println!("Nothing fetched; snapshot, history and plot left untouched"),
        }

        Ok(())
    }
}
