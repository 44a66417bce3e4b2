//! Numeric view of observations and per-city time-bucket averaging.

use anyhow::{Result, anyhow, bail};
use chrono::{DateTime, TimeDelta, Utc};
use std::collections::BTreeMap;

use crate::Observation;

/// The numeric columns of an [`Observation`], ready for averaging and plotting.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub city: String,
    pub timestamp: DateTime<Utc>,
    pub temperature: Option<f64>,
    pub feels_like: Option<f64>,
    pub temp_min: Option<f64>,
    pub temp_max: Option<f64>,
    pub humidity: Option<f64>,
    pub pressure: Option<f64>,
    pub wind_speed: Option<f64>,
}

impl From<&Observation> for Sample {
    fn from(obs: &Observation) -> Self {
        Self {
            city: obs.city.clone(),
            timestamp: obs.timestamp,
            temperature: obs.temperature,
            feels_like: obs.feels_like,
            temp_min: obs.temp_min,
            temp_max: obs.temp_max,
            humidity: obs.humidity.map(f64::from),
            pressure: obs.pressure,
            wind_speed: obs.wind_speed,
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Mean {
    sum: f64,
    count: u32,
}

impl Mean {
    fn add(&mut self, value: Option<f64>) {
        if let Some(v) = value {
            self.sum += v;
            self.count += 1;
        }
    }

    fn value(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / f64::from(self.count))
    }
}

#[derive(Debug, Default)]
struct BucketMean {
    temperature: Mean,
    feels_like: Mean,
    temp_min: Mean,
    temp_max: Mean,
    humidity: Mean,
    pressure: Mean,
    wind_speed: Mean,
}

impl BucketMean {
    fn add(&mut self, s: &Sample) {
        self.temperature.add(s.temperature);
        self.feels_like.add(s.feels_like);
        self.temp_min.add(s.temp_min);
        self.temp_max.add(s.temp_max);
        self.humidity.add(s.humidity);
        self.pressure.add(s.pressure);
        self.wind_speed.add(s.wind_speed);
    }

    fn finish(self, city: String, timestamp: DateTime<Utc>) -> Sample {
        Sample {
            city,
            timestamp,
            temperature: self.temperature.value(),
            feels_like: self.feels_like.value(),
            temp_min: self.temp_min.value(),
            temp_max: self.temp_max.value(),
            humidity: self.humidity.value(),
            pressure: self.pressure.value(),
            wind_speed: self.wind_speed.value(),
        }
    }
}

/// Start of the bucket containing `ts`, aligned to multiples of `secs` since the Unix epoch.
fn bucket_start(ts: DateTime<Utc>, secs: i64) -> DateTime<Utc> {
    let t = ts.timestamp();
    DateTime::from_timestamp(t - t.rem_euclid(secs), 0).unwrap_or(ts)
}

/// Average every numeric field per city within fixed buckets of `interval`.
///
/// Each output sample is stamped with its bucket start. Buckets without rows
/// produce nothing, so gaps stay gaps. Output is sorted by bucket, then city.
pub fn resample(samples: &[Sample], interval: TimeDelta) -> Vec<Sample> {
    let secs = interval.num_seconds().max(1);

    let mut buckets: BTreeMap<(DateTime<Utc>, String), BucketMean> = BTreeMap::new();
    for s in samples {
        buckets
            .entry((bucket_start(s.timestamp, secs), s.city.clone()))
            .or_default()
            .add(s);
    }

    buckets
        .into_iter()
        .map(|((start, city), mean)| mean.finish(city, start))
        .collect()
}

/// Parse a resampling interval such as `"15 minutes"`, `"1 hour"`, `"15min"` or `"2d"`.
pub fn parse_interval(text: &str) -> Result<TimeDelta> {
    let trimmed = text.trim();
    let split = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    let (number, unit) = trimmed.split_at(split);

    if number.is_empty() {
        bail!("Invalid interval '{text}': expected a number followed by a unit, e.g. '15 minutes'");
    }

    let amount: i64 = number
        .parse()
        .map_err(|_| anyhow!("Invalid interval '{text}': number is out of range"))?;
    if amount == 0 {
        bail!("Invalid interval '{text}': must be greater than zero");
    }

    let unit_secs = match unit.trim().to_lowercase().as_str() {
        "s" | "sec" | "secs" | "second" | "seconds" => 1,
        "m" | "min" | "mins" | "minute" | "minutes" => 60,
        "h" | "hr" | "hrs" | "hour" | "hours" => 3_600,
        "d" | "day" | "days" => 86_400,
        "w" | "week" | "weeks" => 604_800,
        other => bail!(
            "Invalid interval '{text}': unknown unit '{other}' (use seconds, minutes, hours, days or weeks)"
        ),
    };

    amount
        .checked_mul(unit_secs)
        .and_then(TimeDelta::try_seconds)
        .ok_or_else(|| anyhow!("Invalid interval '{text}': too large"))
}
