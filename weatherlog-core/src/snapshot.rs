//! The per-run JSON snapshot: only the current run's observations, replaced wholesale.

use anyhow::{Context, Result};
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};
use tracing::info;

use crate::model::{Observation, SCHEMA_VERSION};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    pub generated_at: DateTime<Utc>,
    pub source: String,
    /// Always equal to the number of entries in [`Snapshot::data`].
    pub records: usize,
    pub schema_version: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub metadata: SnapshotMetadata,
    pub data: Vec<Observation>,
}

impl Snapshot {
    pub fn new(source: impl Into<String>, data: Vec<Observation>) -> Self {
        Self {
            metadata: SnapshotMetadata {
                generated_at: Utc::now().trunc_subsecs(0),
                source: source.into(),
                records: data.len(),
                schema_version: SCHEMA_VERSION,
            },
            data,
        }
    }
}

/// Write `observations` as the new snapshot at `path`, replacing any previous one.
///
/// Not atomic: a crash mid-write can leave a truncated file.
pub fn write_snapshot(path: &Path, source: &str, observations: &[Observation]) -> Result<Snapshot> {
    let snapshot = Snapshot::new(source, observations.to_vec());

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create snapshot directory: {}", parent.display()))?;
    }

    let json =
        serde_json::to_string_pretty(&snapshot).context("Failed to serialize snapshot to JSON")?;

    fs::write(path, json)
        .with_context(|| format!("Failed to write snapshot file: {}", path.display()))?;

    info!(
        "Wrote snapshot with {} records to {}",
        snapshot.metadata.records,
        path.display()
    );

    Ok(snapshot)
}

pub fn read_snapshot(path: &Path) -> Result<Snapshot> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read snapshot file: {}", path.display()))?;

    serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse snapshot file: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Units;

    fn obs(city: &str, temp: f64) -> Observation {
        Observation {
            temperature: Some(temp),
            ..Observation::empty(city, Units::Imperial, "2025-06-01T12:00:00Z".parse().unwrap())
        }
    }

    #[test]
    fn records_matches_input_length() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("weather_data.json");

        let written = write_snapshot(&path, "http://api", &[obs("A", 1.0), obs("B", 2.0)]).unwrap();
        assert_eq!(written.metadata.records, 2);

        let read = read_snapshot(&path).unwrap();
        assert_eq!(read, written);
        assert_eq!(read.metadata.source, "http://api");
        assert_eq!(read.metadata.schema_version, SCHEMA_VERSION);
    }

    #[test]
    fn second_run_replaces_first() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("weather_data.json");

        write_snapshot(&path, "src", &[obs("A", 1.0), obs("B", 2.0), obs("C", 3.0)]).unwrap();
        write_snapshot(&path, "src", &[obs("D", 4.0)]).unwrap();

        let read = read_snapshot(&path).unwrap();
        assert_eq!(read.metadata.records, 1);
        assert_eq!(read.data.len(), 1);
        assert_eq!(read.data[0].city, "D");
    }

    #[test]
    fn creates_missing_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/weather_data.json");

        write_snapshot(&path, "src", &[obs("A", 1.0)]).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn json_layout_has_metadata_and_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("weather_data.json");
        write_snapshot(&path, "src", &[obs("A", 72.0)]).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["metadata"]["records"], 1);
        assert_eq!(value["data"][0]["city"], "A");
        assert_eq!(value["data"][0]["temperature"], 72.0);
    }
}
