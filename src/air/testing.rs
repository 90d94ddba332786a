//! In-memory fakes shared by the unit tests.

use super::cache::Clock;
use super::providers::{AirQualityApi, Geocoder};
use super::types::{ProviderError, Reading, Sensor, Station};
use chrono::{DateTime, TimeZone, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

/// A clock that only moves when told to.
pub struct ManualClock(Mutex<DateTime<Utc>>);

impl ManualClock {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    pub fn epoch() -> Self {
        Self::at(Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap())
    }

    pub fn advance_secs(&self, secs: i64) {
        let mut now = self.0.lock().unwrap();
        *now += chrono::Duration::seconds(secs);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}

pub fn station(id: u64, lat: f64, lon: f64, region: Option<&str>) -> Station {
    Station {
        id,
        lat,
        lon,
        region: region.map(str::to_string),
        name: Some(format!("Station {}", id)),
        city: None,
    }
}

pub fn sensor(id: u64, station_id: u64, pollutant: &str) -> Sensor {
    Sensor {
        id,
        station_id,
        pollutant: pollutant.to_string(),
        code: None,
    }
}

pub fn reading(date: &str, value: Option<f64>) -> Reading {
    Reading {
        date: date.to_string(),
        value,
    }
}

/// Provider backed by maps. Unknown ids answer with HTTP 404.
#[derive(Default)]
pub struct FakeApi {
    pub stations: Vec<Station>,
    pub sensors: HashMap<u64, Vec<Sensor>>,
    pub readings: HashMap<u64, Vec<Reading>>,
    pub stations_down: AtomicBool,
    pub station_calls: AtomicUsize,
    pub sensor_calls: AtomicUsize,
    pub reading_calls: AtomicUsize,
}

impl FakeApi {
    pub fn with_station(mut self, station: Station, sensors: Vec<(Sensor, Vec<Reading>)>) -> Self {
        let id = station.id;
        self.stations.push(station);
        let mut list = Vec::new();
        for (sensor, readings) in sensors {
            self.readings.insert(sensor.id, readings);
            list.push(sensor);
        }
        self.sensors.insert(id, list);
        self
    }

    pub fn station_calls(&self) -> usize {
        self.station_calls.load(Ordering::SeqCst)
    }
}

impl AirQualityApi for FakeApi {
    fn stations(&self) -> Result<Vec<Station>, ProviderError> {
        self.station_calls.fetch_add(1, Ordering::SeqCst);
        if self.stations_down.load(Ordering::SeqCst) {
            return Err(ProviderError::Transport("connection refused".into()));
        }
        Ok(self.stations.clone())
    }

    fn sensors(&self, station_id: u64) -> Result<Vec<Sensor>, ProviderError> {
        self.sensor_calls.fetch_add(1, Ordering::SeqCst);
        self.sensors
            .get(&station_id)
            .cloned()
            .ok_or(ProviderError::Status(404))
    }

    fn readings(&self, sensor_id: u64) -> Result<Vec<Reading>, ProviderError> {
        self.reading_calls.fetch_add(1, Ordering::SeqCst);
        self.readings
            .get(&sensor_id)
            .cloned()
            .ok_or(ProviderError::Status(404))
    }
}

/// Geocoder answering from a fixed table.
#[derive(Default)]
pub struct FakeGeocoder {
    pub places: HashMap<String, (f64, f64)>,
    pub down: bool,
}

impl FakeGeocoder {
    pub fn with(mut self, city: &str, lat: f64, lon: f64) -> Self {
        self.places.insert(city.to_lowercase(), (lat, lon));
        self
    }
}

impl Geocoder for FakeGeocoder {
    fn geocode(&self, city: &str) -> Result<Option<(f64, f64)>, ProviderError> {
        if self.down {
            return Err(ProviderError::Status(503));
        }
        Ok(self.places.get(&city.to_lowercase()).copied())
    }
}
