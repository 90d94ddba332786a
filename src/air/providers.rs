//! Upstream providers: geocoding and the GIOS air quality REST API.
//!
//! The traits are the seam the pipeline depends on; the HTTP implementations
//! use a shared `ureq::Agent` with explicit timeouts.

use super::types::{ProviderError, Reading, Sensor, Station};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

/// Resolves free text to coordinates.
pub trait Geocoder: Send + Sync {
    /// `Ok(None)` when the provider answered but found nothing.
    fn geocode(&self, city: &str) -> Result<Option<(f64, f64)>, ProviderError>;
}

/// Station metadata and measurements.
pub trait AirQualityApi: Send + Sync {
    fn stations(&self) -> Result<Vec<Station>, ProviderError>;
    fn sensors(&self, station_id: u64) -> Result<Vec<Sensor>, ProviderError>;
    /// Full reported series, newest first, nulls included.
    fn readings(&self, sensor_id: u64) -> Result<Vec<Reading>, ProviderError>;
}

/// Build the HTTP agent shared by all providers.
pub fn http_agent(timeout: Duration) -> ureq::Agent {
    ureq::AgentBuilder::new()
        .timeout(timeout)
        .user_agent(concat!("smog_watch/", env!("CARGO_PKG_VERSION")))
        .build()
}

fn get_json<T: DeserializeOwned>(request: ureq::Request) -> Result<T, ProviderError> {
    let response = request.call()?;
    if response.status() != 200 {
        return Err(ProviderError::Status(response.status()));
    }
    response
        .into_json()
        .map_err(|e| ProviderError::InvalidResponse(e.to_string()))
}

// ─── Region lookup ───────────────────────────────────────────────

/// Region name lookup rule: the flat `addressVoivodeship` field wins when it
/// is non-empty, otherwise the nested `city.commune.provinceName`.
pub fn resolve_region(voivodeship: Option<&str>, province: Option<&str>) -> Option<String> {
    [voivodeship, province]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

// ─── Wire records ────────────────────────────────────────────────

/// Coordinates arrive as strings ("52.2297") but some mirrors send numbers.
#[derive(Deserialize)]
#[serde(untagged)]
enum Coordinate {
    Number(f64),
    Text(String),
}

impl Coordinate {
    fn parse(&self) -> Option<f64> {
        match self {
            Self::Number(v) => Some(*v),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StationRecord {
    id: u64,
    gegr_lat: Coordinate,
    gegr_lon: Coordinate,
    #[serde(default)]
    station_name: Option<String>,
    #[serde(default)]
    address_voivodeship: Option<String>,
    #[serde(default)]
    city: Option<CityRecord>,
}

#[derive(Deserialize)]
struct CityRecord {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    commune: Option<CommuneRecord>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommuneRecord {
    #[serde(default)]
    province_name: Option<String>,
}

impl StationRecord {
    fn into_station(self) -> Option<Station> {
        let lat = self.gegr_lat.parse()?;
        let lon = self.gegr_lon.parse()?;
        let province = self
            .city
            .as_ref()
            .and_then(|c| c.commune.as_ref())
            .and_then(|c| c.province_name.as_deref());
        let region = resolve_region(self.address_voivodeship.as_deref(), province);
        Some(Station {
            id: self.id,
            lat,
            lon,
            region,
            name: self.station_name,
            city: self.city.and_then(|c| c.name),
        })
    }
}

#[derive(Deserialize)]
struct SensorRecord {
    id: u64,
    param: ParamRecord,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ParamRecord {
    param_name: String,
    #[serde(default)]
    param_code: Option<String>,
}

#[derive(Deserialize)]
struct DataRecord {
    #[serde(default)]
    values: Vec<ValueRecord>,
}

#[derive(Deserialize)]
struct ValueRecord {
    date: String,
    #[serde(default)]
    value: Option<f64>,
}

#[derive(Deserialize)]
struct GeocodeResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    results: Vec<GeocodeResult>,
}

#[derive(Deserialize)]
struct GeocodeResult {
    geometry: Geometry,
}

#[derive(Deserialize)]
struct Geometry {
    location: LatLng,
}

#[derive(Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

/// Parse the station list, skipping records with unusable coordinates.
pub fn parse_stations(body: serde_json::Value) -> Result<Vec<Station>, ProviderError> {
    let records: Vec<serde_json::Value> = serde_json::from_value(body)
        .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

    let mut stations = Vec::with_capacity(records.len());
    for record in records {
        match serde_json::from_value::<StationRecord>(record) {
            Ok(r) => {
                let id = r.id;
                match r.into_station() {
                    Some(s) => stations.push(s),
                    None => tracing::warn!(station_id = id, "skipping station with unparsable coordinates"),
                }
            }
            Err(e) => tracing::warn!(error = %e, "skipping malformed station record"),
        }
    }
    Ok(stations)
}

/// Parse a station's sensor list. Every sensor is attributed to `station_id`.
pub fn parse_sensors(station_id: u64, body: serde_json::Value) -> Result<Vec<Sensor>, ProviderError> {
    let records: Vec<serde_json::Value> = serde_json::from_value(body)
        .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

    let mut sensors = Vec::with_capacity(records.len());
    for record in records {
        match serde_json::from_value::<SensorRecord>(record) {
            Ok(r) => sensors.push(Sensor {
                id: r.id,
                station_id,
                pollutant: r.param.param_name,
                code: r.param.param_code,
            }),
            Err(e) => tracing::warn!(station_id, error = %e, "skipping malformed sensor record"),
        }
    }
    Ok(sensors)
}

pub fn parse_readings(body: serde_json::Value) -> Result<Vec<Reading>, ProviderError> {
    let data: DataRecord = serde_json::from_value(body)
        .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
    Ok(data
        .values
        .into_iter()
        .map(|v| Reading {
            date: v.date,
            value: v.value,
        })
        .collect())
}

/// First result's coordinates, if any. A status other than `OK` yields no
/// result; anything but `ZERO_RESULTS` is logged as a provider problem.
pub fn parse_geocode(body: serde_json::Value) -> Result<Option<(f64, f64)>, ProviderError> {
    let response: GeocodeResponse = serde_json::from_value(body)
        .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
    match response.status.as_deref() {
        None | Some("OK") => {}
        Some("ZERO_RESULTS") => return Ok(None),
        Some(status) => {
            tracing::warn!(
                status,
                message = response.error_message.as_deref().unwrap_or(""),
                "geocoding request rejected"
            );
            return Ok(None);
        }
    }
    Ok(response
        .results
        .into_iter()
        .next()
        .map(|r| (r.geometry.location.lat, r.geometry.location.lng)))
}

// ─── Google geocoding ────────────────────────────────────────────

pub struct GoogleGeocoder {
    agent: ureq::Agent,
    url: String,
    api_key: String,
}

impl GoogleGeocoder {
    pub fn new(agent: ureq::Agent, url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            agent,
            url: url.into(),
            api_key: api_key.into(),
        }
    }
}

impl Geocoder for GoogleGeocoder {
    fn geocode(&self, city: &str) -> Result<Option<(f64, f64)>, ProviderError> {
        tracing::debug!(city, url = %self.url, "geocoding");
        let request = self
            .agent
            .get(&self.url)
            .query("address", city)
            .query("key", &self.api_key);
        parse_geocode(get_json(request)?)
    }
}

// ─── GIOS REST API ───────────────────────────────────────────────

pub struct GiosClient {
    agent: ureq::Agent,
    base_url: String,
}

impl GiosClient {
    pub fn new(agent: ureq::Agent, base_url: impl Into<String>) -> Self {
        Self {
            agent,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn fetch(&self, path: &str) -> Result<serde_json::Value, ProviderError> {
        let url = format!("{}/{}", self.base_url, path);
        tracing::debug!(%url, "GET");
        get_json(self.agent.get(&url))
    }
}

impl AirQualityApi for GiosClient {
    fn stations(&self) -> Result<Vec<Station>, ProviderError> {
        parse_stations(self.fetch("station/findAll")?)
    }

    fn sensors(&self, station_id: u64) -> Result<Vec<Sensor>, ProviderError> {
        parse_sensors(station_id, self.fetch(&format!("station/sensors/{}", station_id))?)
    }

    fn readings(&self, sensor_id: u64) -> Result<Vec<Reading>, ProviderError> {
        parse_readings(self.fetch(&format!("data/getData/{}", sensor_id))?)
    }
}
