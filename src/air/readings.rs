//! Sensor lists and measurement series.

use super::cache::Clock;
use super::providers::AirQualityApi;
use super::types::{HourlyPoint, ProviderError, Reading, Sensor};
use chrono::{NaiveDateTime, NaiveTime, Timelike};
use chrono_tz::Tz;
use std::sync::Arc;

/// Timestamp format of the measurement feed (local time, no offset).
const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub struct SensorReadingService {
    api: Arc<dyn AirQualityApi>,
    clock: Arc<dyn Clock>,
    /// Timezone the provider reports local timestamps in.
    tz: Tz,
}

impl SensorReadingService {
    pub fn new(api: Arc<dyn AirQualityApi>, clock: Arc<dyn Clock>, tz: Tz) -> Self {
        Self { api, clock, tz }
    }

    pub fn list_sensors(&self, station_id: u64) -> Vec<Sensor> {
        self.api.sensors(station_id).unwrap_or_else(|e| {
            tracing::warn!(station_id, error = %e, "sensor list unavailable");
            Vec::new()
        })
    }

    pub fn fetch_readings(&self, sensor_id: u64) -> Result<Vec<Reading>, ProviderError> {
        self.api.readings(sensor_id)
    }

    fn readings_or_empty(&self, sensor_id: u64) -> Vec<Reading> {
        self.fetch_readings(sensor_id).unwrap_or_else(|e| {
            tracing::warn!(sensor_id, error = %e, "readings unavailable");
            Vec::new()
        })
    }

    /// Every non-null value, in provider order.
    pub fn all_values(&self, sensor_id: u64) -> Vec<f64> {
        self.readings_or_empty(sensor_id)
            .into_iter()
            .filter_map(|r| r.value)
            .collect()
    }

    /// The most recent non-null value. The feed is newest-first, so this is
    /// the first non-null entry regardless of timestamps.
    pub fn latest_value(&self, sensor_id: u64) -> Option<f64> {
        latest_of(&self.readings_or_empty(sensor_id))
    }

    /// Today's readings up to the current full hour, oldest first.
    pub fn hourly_today(&self, sensor_id: u64) -> Vec<HourlyPoint> {
        hourly_window(&self.readings_or_empty(sensor_id), self.local_now())
    }

    /// `latest_value` and `hourly_today` from a single fetch.
    pub fn latest_and_hourly(&self, sensor_id: u64) -> (Option<f64>, Vec<HourlyPoint>) {
        let readings = self.readings_or_empty(sensor_id);
        (latest_of(&readings), hourly_window(&readings, self.local_now()))
    }

    fn local_now(&self) -> NaiveDateTime {
        self.clock.now().with_timezone(&self.tz).naive_local()
    }
}

pub fn latest_of(readings: &[Reading]) -> Option<f64> {
    readings.iter().find_map(|r| r.value)
}

/// Keep readings in `[start of now's day, now truncated to the hour]`,
/// drop nulls and unparsable dates, sort ascending and label as `HH:MM`.
pub fn hourly_window(readings: &[Reading], now: NaiveDateTime) -> Vec<HourlyPoint> {
    let day_start = now.date().and_time(NaiveTime::MIN);
    let hour_end = day_start + chrono::Duration::hours(i64::from(now.hour()));

    let mut points: Vec<(NaiveDateTime, f64)> = readings
        .iter()
        .filter_map(|r| {
            let value = r.value?;
            let at = NaiveDateTime::parse_from_str(&r.date, DATE_FORMAT).ok()?;
            (day_start <= at && at <= hour_end).then_some((at, value))
        })
        .collect();
    points.sort_by_key(|(at, _)| *at);

    points
        .into_iter()
        .map(|(at, value)| HourlyPoint {
            label: at.format("%H:%M").to_string(),
            value,
        })
        .collect()
}
