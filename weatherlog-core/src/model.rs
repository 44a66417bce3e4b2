use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{convert::TryFrom, fmt};

/// Version of the [`Observation`] column layout.
///
/// Bump it whenever [`Observation::FIELDS`] changes; existing history files
/// with a different header are then refused instead of silently misaligned.
pub const SCHEMA_VERSION: u32 = 1;

/// Unit system requested from the weather API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    #[default]
    Imperial,
    Metric,
    Standard,
}

impl Units {
    pub fn as_str(&self) -> &'static str {
        match self {
            Units::Imperial => "imperial",
            Units::Metric => "metric",
            Units::Standard => "standard",
        }
    }

    pub const fn all() -> &'static [Units] {
        &[Units::Imperial, Units::Metric, Units::Standard]
    }

    /// Symbol of the temperature unit returned for this system.
    pub fn temperature_symbol(&self) -> &'static str {
        match self {
            Units::Imperial => "°F",
            Units::Metric => "°C",
            Units::Standard => "K",
        }
    }
}

impl fmt::Display for Units {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Units {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let lower = value.trim().to_lowercase();

        match lower.as_str() {
            "imperial" => Ok(Units::Imperial),
            "metric" => Ok(Units::Metric),
            "standard" => Ok(Units::Standard),
            _ => Err(anyhow::anyhow!(
                "Unknown unit system '{value}'. Supported: imperial, metric, standard."
            )),
        }
    }
}

/// One normalized weather reading for one city at one fetch instant.
///
/// Field order is the on-disk column order; keep it in sync with [`Observation::FIELDS`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub city: String,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub temperature: Option<f64>,
    pub feels_like: Option<f64>,
    pub temp_min: Option<f64>,
    pub temp_max: Option<f64>,
    pub humidity: Option<u8>,
    pub pressure: Option<f64>,
    pub wind_speed: Option<f64>,
    pub description: Option<String>,
    pub units: Units,
    pub timestamp: DateTime<Utc>,
}

impl Observation {
    /// Column names, in order, for schema version [`SCHEMA_VERSION`].
    pub const FIELDS: [&'static str; 13] = [
        "city",
        "lat",
        "lon",
        "temperature",
        "feels_like",
        "temp_min",
        "temp_max",
        "humidity",
        "pressure",
        "wind_speed",
        "description",
        "units",
        "timestamp",
    ];

    /// An observation carrying only the city, unit tag and timestamp.
    pub fn empty(city: impl Into<String>, units: Units, timestamp: DateTime<Utc>) -> Self {
        Self {
            city: city.into(),
            lat: None,
            lon: None,
            temperature: None,
            feels_like: None,
            temp_min: None,
            temp_max: None,
            humidity: None,
            pressure: None,
            wind_speed: None,
            description: None,
            units,
            timestamp,
        }
    }
}
