use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::{Config, FetchError, Observation, Units};

use super::WeatherProvider;

/// Client for the OpenWeather "current weather" endpoint.
#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: String,
    base_url: String,
    units: Units,
    http: Client,
}

impl OpenWeatherProvider {
    pub fn new(api_key: String, base_url: String, units: Units, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            api_key,
            base_url,
            units,
            http,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let api_key = config.api_key()?;

        Self::new(
            api_key.to_owned(),
            config.base_url.clone(),
            config.units,
            Duration::from_secs(config.timeout_secs),
        )
    }

    async fn fetch_current(&self, city: &str) -> Result<Observation, FetchError> {
        let network = |source| FetchError::Network {
            city: city.to_string(),
            source,
        };

        let res = self
            .http
            .get(&self.base_url)
            .query(&[
                ("q", city),
                ("appid", self.api_key.as_str()),
                ("units", self.units.as_str()),
            ])
            .send()
            .await
            .map_err(network)?;

        let status = res.status();
        if !status.is_success() {
            return Err(status_error(city, status, res.text().await));
        }

        let body = res.text().await.map_err(network)?;

        let parsed: OwCurrentResponse =
            serde_json::from_str(&body).map_err(|source| FetchError::Decode {
                city: city.to_string(),
                source,
            })?;

        Ok(parsed.into_observation(city, self.units, Utc::now()))
    }
}

// Every field is optional: the API omits nested blocks freely.

#[derive(Debug, Default, Deserialize)]
struct OwCoord {
    lat: Option<f64>,
    lon: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct OwMain {
    temp: Option<f64>,
    feels_like: Option<f64>,
    temp_min: Option<f64>,
    temp_max: Option<f64>,
    humidity: Option<u8>,
    pressure: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct OwWind {
    speed: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct OwCurrentResponse {
    name: Option<String>,
    coord: Option<OwCoord>,
    main: Option<OwMain>,
    wind: Option<OwWind>,
    weather: Option<Vec<OwWeather>>,
}

impl OwCurrentResponse {
    fn into_observation(
        self,
        requested: &str,
        units: Units,
        fetched_at: DateTime<Utc>,
    ) -> Observation {
        let city = self
            .name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| requested.to_string());
        let coord = self.coord.unwrap_or_default();
        let main = self.main.unwrap_or_default();
        let wind = self.wind.unwrap_or_default();
        let description = self
            .weather
            .and_then(|entries| entries.into_iter().next())
            .and_then(|w| w.description);

        Observation {
            city,
            lat: coord.lat,
            lon: coord.lon,
            temperature: main.temp,
            feels_like: main.feels_like,
            temp_min: main.temp_min,
            temp_max: main.temp_max,
            humidity: main.humidity,
            pressure: main.pressure,
            wind_speed: wind.speed,
            description,
            units,
            timestamp: fetched_at.trunc_subsecs(0),
        }
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    fn source(&self) -> &str {
        &self.base_url
    }

    async fn current(&self, city: &str) -> Result<Observation, FetchError> {
        let city = city.trim();
        let result = if city.is_empty() {
            Err(FetchError::EmptyCity)
        } else {
            debug!("Requesting current weather for {city}");
            self.fetch_current(city).await
        };

        match result {
            Ok(obs) => {
                info!(
                    "Fetched {}: temperature={:?}{} humidity={:?}",
                    obs.city,
                    obs.temperature,
                    self.units.temperature_symbol(),
                    obs.humidity
                );
                Ok(obs)
            }
            Err(err) => {
                warn!("Skipping city '{city}': {err}");
                Err(err)
            }
        }
    }
}

/// A non-2xx response keeps its status even when the body cannot be read.
fn status_error<E: std::fmt::Display>(
    city: &str,
    status: StatusCode,
    body: Result<String, E>,
) -> FetchError {
    let body = match body {
        Ok(body) => truncate_body(&body),
        Err(err) => format!("<unreadable body: {err}>"),
    };

    FetchError::Status {
        city: city.to_string(),
        status,
        body,
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}
