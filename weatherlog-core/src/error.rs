use std::path::PathBuf;
use thiserror::Error;

/// Why a single city could not be fetched. Never fatal for the run.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("City name must not be empty")]
    EmptyCity,

    #[error("Request for '{city}' failed with status {status}: {body}")]
    Status {
        city: String,
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("Network error while fetching '{city}': {source}")]
    Network {
        city: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to decode response for '{city}': {source}")]
    Decode {
        city: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("I/O error on history file '{0}'")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("CSV error in history file '{0}'")]
    Csv(PathBuf, #[source] csv::Error),

    #[error("History file '{path}' has columns [{found}], expected [{expected}]")]
    SchemaMismatch {
        path: PathBuf,
        expected: String,
        found: String,
    },
}
