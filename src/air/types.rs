//! Core types for the air quality pipeline.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Unit suffix used for every formatted concentration.
pub const UNIT: &str = "µg/m³";

/// Label shown for a pollutant with no valid reading.
pub const NO_DATA: &str = "no data";

/// A fixed-location monitoring station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    pub id: u64,
    pub lat: f64,
    pub lon: f64,
    /// Province-level region, resolved from the first non-empty source field.
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
}

/// One pollutant-measuring instrument at a station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sensor {
    pub id: u64,
    pub station_id: u64,
    /// Pollutant parameter name as reported by the provider.
    pub pollutant: String,
    /// Short formula code (e.g. "PM10"), when the provider sends one.
    #[serde(default)]
    pub code: Option<String>,
}

/// A single raw reading. `value` is `None` when the feed reported null.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub date: String,
    pub value: Option<f64>,
}

/// Discrete classification of a concentration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QualityBand {
    VeryGood,
    Good,
    Fair,
    Moderate,
    Poor,
    VeryPoor,
    Unknown,
}

impl fmt::Display for QualityBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::VeryGood => write!(f, "very-good"),
            Self::Good => write!(f, "good"),
            Self::Fair => write!(f, "fair"),
            Self::Moderate => write!(f, "moderate"),
            Self::Poor => write!(f, "poor"),
            Self::VeryPoor => write!(f, "very-poor"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Mean concentration of one pollutant across a region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionalAverage {
    pub mean: f64,
    /// Mean rounded to two decimals with unit, e.g. "20.00 µg/m³".
    pub label: String,
    pub band: QualityBand,
}

/// Pollutant name → average.
pub type PollutantAverages = BTreeMap<String, RegionalAverage>;

/// Region name → pollutant name → average.
pub type RegionAverages = BTreeMap<String, PollutantAverages>;

/// Latest reading of one pollutant at the chosen station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentReading {
    /// Formatted value with unit, or "no data".
    pub value_label: String,
    pub band: QualityBand,
}

/// One point of the intraday trend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyPoint {
    /// Local time as `HH:MM`.
    pub label: String,
    pub value: f64,
}

/// The answer to one city query.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AirReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub station: Option<Station>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
    pub current_readings: BTreeMap<String, CurrentReading>,
    pub hourly_series: BTreeMap<String, Vec<HourlyPoint>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region_name: Option<String>,
    pub region_averages: PollutantAverages,
    pub all_region_averages: RegionAverages,
}

impl AirReport {
    /// A report carrying only a terminal error message.
    pub fn failed(err: &LookupError) -> Self {
        Self {
            error: Some(err.to_string()),
            ..Self::default()
        }
    }
}

/// Failure of a single upstream call.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("unexpected HTTP status {0}")]
    Status(u16),
    #[error("invalid response body: {0}")]
    InvalidResponse(String),
    #[error("provider returned no usable data")]
    Empty,
}

impl From<ureq::Error> for ProviderError {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::Status(code, _) => Self::Status(code),
            ureq::Error::Transport(t) => Self::Transport(t.to_string()),
        }
    }
}

/// Terminal outcomes of a city query.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LookupError {
    #[error("could not resolve city coordinates")]
    CityNotFound(String),
    #[error("no station within {radius_km} km radius")]
    NoStationInRadius { radius_km: f64 },
}
