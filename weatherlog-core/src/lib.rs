//! Core library for the `weatherlog` collector.
//!
//! This crate defines:
//! - Configuration & data directory handling
//! - The weather provider abstraction and its OpenWeather implementation
//! - The fixed observation schema shared by every writer
//! - Snapshot (JSON) and history (CSV) persistence
//! - Resampling and plotting of the temperature history
//! - The single-pass pipeline tying it all together
//!
//! It is used by `weatherlog-cli`, but can also be driven by other binaries or schedulers.

pub mod config;
pub mod error;
pub mod history;
pub mod model;
pub mod pipeline;
pub mod plot;
pub mod provider;
pub mod resample;
pub mod snapshot;

pub use config::{Config, DataPaths};
pub use error::{FetchError, HistoryError};
pub use history::{CsvHistoryStore, History, HistoryStore};
pub use model::{Observation, SCHEMA_VERSION, Units};
pub use pipeline::{RunSummary, run_once};
pub use plot::{DEFAULT_POINT_LIMIT, PlotOutcome, PlotRequest, SkipReason, plot_history};
pub use provider::{WeatherProvider, openweather::OpenWeatherProvider};
pub use resample::parse_interval;
pub use snapshot::{Snapshot, SnapshotMetadata, read_snapshot, write_snapshot};
