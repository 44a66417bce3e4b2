use async_trait::async_trait;
use std::fmt::Debug;

use crate::{Config, FetchError, Observation, provider::openweather::OpenWeatherProvider};

pub mod openweather;

/// A source of current weather observations, one city per call.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    /// Endpoint recorded as the snapshot `source`.
    fn source(&self) -> &str;

    async fn current(&self, city: &str) -> Result<Observation, FetchError>;
}

/// Construct the provider described by the config.
///
/// Fails when no API key is configured; this happens before any network activity.
pub fn provider_from_config(config: &Config) -> anyhow::Result<Box<dyn WeatherProvider>> {
    Ok(Box::new(OpenWeatherProvider::from_config(config)?))
}
