//! Append-only observation history.
//!
//! The [`HistoryStore`] trait is the only thing the pipeline and the plotter see, so the
//! CSV file can be replaced by another store without touching them.

use std::{
    collections::BTreeSet,
    fmt::Debug,
    fs::{self, OpenOptions},
    io,
    path::{Path, PathBuf},
};
use tracing::{debug, info};

use crate::{HistoryError, Observation};

pub trait HistoryStore: Send + Sync + Debug {
    /// Append rows in the given order. Existing rows are never touched.
    fn append(&self, observations: &[Observation]) -> Result<usize, HistoryError>;

    /// Load every row sorted ascending by timestamp, or `None` when there is no data yet.
    fn load(&self) -> Result<Option<History>, HistoryError>;
}

/// Read-only, time-ordered view of the stored observations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct History {
    rows: Vec<Observation>,
}

impl History {
    /// Sorts by timestamp; rows sharing an instant keep their input order.
    pub fn from_rows(mut rows: Vec<Observation>) -> Self {
        rows.sort_by_key(|row| row.timestamp);
        Self { rows }
    }

    pub fn rows(&self) -> &[Observation] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn cities(&self) -> BTreeSet<&str> {
        self.rows.iter().map(|row| row.city.as_str()).collect()
    }
}

/// History kept in a single CSV file with a fixed header.
#[derive(Debug, Clone)]
pub struct CsvHistoryStore {
    path: PathBuf,
}

impl CsvHistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_err(&self, err: io::Error) -> HistoryError {
        HistoryError::Io(self.path.clone(), err)
    }

    fn csv_err(&self, err: csv::Error) -> HistoryError {
        HistoryError::Csv(self.path.clone(), err)
    }

    /// True when the file is absent or zero-length.
    fn is_blank(&self) -> Result<bool, HistoryError> {
        match fs::metadata(&self.path) {
            Ok(meta) => Ok(meta.len() == 0),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(true),
            Err(err) => Err(self.io_err(err)),
        }
    }

    fn check_header(&self) -> Result<(), HistoryError> {
        let mut reader = csv::Reader::from_path(&self.path).map_err(|e| self.csv_err(e))?;
        let found = reader.headers().map_err(|e| self.csv_err(e))?;

        if found.iter().ne(Observation::FIELDS) {
            return Err(HistoryError::SchemaMismatch {
                path: self.path.clone(),
                expected: Observation::FIELDS.join(","),
                found: found.iter().collect::<Vec<_>>().join(","),
            });
        }

        Ok(())
    }
}

impl HistoryStore for CsvHistoryStore {
    fn append(&self, observations: &[Observation]) -> Result<usize, HistoryError> {
        if observations.is_empty() {
            return Ok(0);
        }

        let needs_header = self.is_blank()?;
        if !needs_header {
            self.check_header()?;
        }

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.io_err(e))?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.io_err(e))?;

        let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);

        if needs_header {
            debug!("Writing history header to {}", self.path.display());
            writer
                .write_record(Observation::FIELDS)
                .map_err(|e| self.csv_err(e))?;
        }

        for obs in observations {
            writer.serialize(obs).map_err(|e| self.csv_err(e))?;
        }

        writer.flush().map_err(|e| self.io_err(e))?;

        info!(
            "Appended {} rows to history {}",
            observations.len(),
            self.path.display()
        );

        Ok(observations.len())
    }

    fn load(&self) -> Result<Option<History>, HistoryError> {
        if !self.path.exists() {
            info!("No history yet at {}", self.path.display());
            return Ok(None);
        }

        let mut reader = csv::Reader::from_path(&self.path).map_err(|e| self.csv_err(e))?;
        let rows = reader
            .deserialize::<Observation>()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| self.csv_err(e))?;

        if rows.is_empty() {
            info!("History at {} has no rows", self.path.display());
            return Ok(None);
        }

        debug!("Loaded {} history rows", rows.len());
        Ok(Some(History::from_rows(rows)))
    }
}
