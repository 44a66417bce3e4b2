use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::model::Units;

/// Environment variable holding the OpenWeather API key.
pub const API_KEY_ENV: &str = "OPENWEATHER_API_KEY";

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "WEATHERLOG_DATA_DIR";

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/data/2.5/weather";

/// 2025-12-31T23:59:59Z, the end of the default analysis window.
const DEFAULT_PLOT_CUTOFF_TS: i64 = 1_767_225_599;

const SNAPSHOT_FILE: &str = "weather_data.json";
const HISTORY_FILE: &str = "weather_history.csv";
const PLOT_FILE: &str = "temperature_trend.png";

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// units = "metric"
/// cities = ["Oslo", "Bergen"]
/// plot_cutoff = "2026-03-01T00:00:00Z"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Usually supplied through `OPENWEATHER_API_KEY` instead.
    pub api_key: Option<String>,
    pub base_url: String,
    pub units: Units,
    pub cities: Vec<String>,
    /// Falls back to the platform data directory when unset.
    pub data_dir: Option<PathBuf>,
    /// Rows after this instant are left out of the plot.
    pub plot_cutoff: DateTime<Utc>,
    pub timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            units: Units::default(),
            cities: vec![
                "Los Angeles".to_string(),
                "San Francisco".to_string(),
                "Seattle".to_string(),
            ],
            data_dir: None,
            plot_cutoff: default_plot_cutoff(),
            timeout_secs: 10,
        }
    }
}

pub fn default_plot_cutoff() -> DateTime<Utc> {
    DateTime::from_timestamp(DEFAULT_PLOT_CUTOFF_TS, 0).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

impl Config {
    /// Load config from the platform config directory, or defaults if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        Self::load_from(&path)
    }

    /// Load config from an explicit path; a missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        Ok(project_dirs()?.config_dir().join("config.toml"))
    }

    /// Apply `OPENWEATHER_API_KEY` and `WEATHERLOG_DATA_DIR` from the process environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary variable lookup. Empty values are ignored.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty(API_KEY_ENV) {
            self.api_key = Some(key.trim().to_string());
        }
        if let Some(dir) = non_empty(DATA_DIR_ENV) {
            self.data_dir = Some(PathBuf::from(dir));
        }

        self
    }

    /// The configured API key, or a configuration error with a hint.
    pub fn api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                anyhow!(
                    "No API key configured.\n\
                     Hint: export {API_KEY_ENV}=<key> (a .env file in the working directory works too) or set `api_key` in the config file."
                )
            })
    }

    /// Directory holding the snapshot, history and plot files.
    pub fn resolve_data_dir(&self) -> Result<PathBuf> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(project_dirs()?.data_dir().to_path_buf()),
        }
    }
}

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("dev", "weatherlog", "weatherlog")
        .ok_or_else(|| anyhow!("Could not determine platform directories"))
}

/// Locations of the files produced by a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPaths {
    pub dir: PathBuf,
    pub snapshot: PathBuf,
    pub history: PathBuf,
    pub plot: PathBuf,
}

impl DataPaths {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            snapshot: dir.join(SNAPSHOT_FILE),
            history: dir.join(HISTORY_FILE),
            plot: dir.join(PLOT_FILE),
            dir,
        }
    }

    /// Create the data directory if it does not exist yet.
    pub fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create data directory: {}", self.dir.display()))
    }
}
