//! Composes the pipeline into one report per city query.
//!
//! Flow: geocode → cached station list → nearest station within radius →
//! current readings and hourly trend per sensor → regional averages.
//! Only an unresolved city or an empty radius end the request early; every
//! other failure leaves a gap in the report.

use super::cache::Clock;
use super::geocode::GeoLocator;
use super::providers::{AirQualityApi, Geocoder};
use super::proximity::nearest_within;
use super::quality::{classify_sensor, format_concentration};
use super::readings::SensorReadingService;
use super::regions::{RegionalAggregator, DEFAULT_WORKERS, REGIONS_TTL};
use super::stations::{StationDirectory, STATIONS_TTL};
use super::types::{AirReport, CurrentReading, LookupError, QualityBand, RegionAverages, NO_DATA};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Largest distance at which a station still counts as "nearby".
pub const DEFAULT_RADIUS_KM: f64 = 20.0;

/// Tunables of the pipeline.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub radius_km: f64,
    pub stations_ttl: Duration,
    pub regions_ttl: Duration,
    pub timezone: chrono_tz::Tz,
    pub workers: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            radius_km: DEFAULT_RADIUS_KM,
            stations_ttl: STATIONS_TTL,
            regions_ttl: REGIONS_TTL,
            timezone: chrono_tz::Europe::Warsaw,
            workers: DEFAULT_WORKERS,
        }
    }
}

pub struct RequestOrchestrator {
    locator: GeoLocator,
    stations: Arc<StationDirectory>,
    readings: Arc<SensorReadingService>,
    regions: RegionalAggregator,
    radius_km: f64,
}

impl RequestOrchestrator {
    pub fn new(
        geocoder: Arc<dyn Geocoder>,
        api: Arc<dyn AirQualityApi>,
        settings: &PipelineSettings,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let stations = Arc::new(StationDirectory::new(
            api.clone(),
            settings.stations_ttl,
            clock.clone(),
        ));
        let readings = Arc::new(SensorReadingService::new(api, clock.clone(), settings.timezone));
        let regions = RegionalAggregator::new(
            stations.clone(),
            readings.clone(),
            settings.regions_ttl,
            clock,
        )
        .with_workers(settings.workers);

        Self {
            locator: GeoLocator::new(geocoder),
            stations,
            readings,
            regions,
            radius_km: settings.radius_km,
        }
    }

    /// Build the report for `city`. Terminal failures are reported inline in
    /// `AirReport::error`.
    pub fn report(&self, city: &str) -> AirReport {
        let start = Instant::now();
        let report = self.try_report(city).unwrap_or_else(|e| {
            tracing::info!(city, error = %e, "request ended early");
            AirReport::failed(&e)
        });
        tracing::info!(
            city,
            station = ?report.station.as_ref().map(|s| s.id),
            pollutants = report.current_readings.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "report built"
        );
        report
    }

    pub fn try_report(&self, city: &str) -> Result<AirReport, LookupError> {
        let (lat, lon) = self.locator.locate(city)?;
        let stations = self.stations.list_stations_cached();
        let (station, distance_km) = nearest_within(lat, lon, &stations, self.radius_km)
            .ok_or(LookupError::NoStationInRadius {
                radius_km: self.radius_km,
            })?;
        tracing::debug!(station_id = station.id, distance_km, "nearest station");

        let mut report = AirReport {
            distance_km: Some(distance_km),
            ..AirReport::default()
        };

        for sensor in self.readings.list_sensors(station.id) {
            let (latest, hourly) = self.readings.latest_and_hourly(sensor.id);
            let current = match latest {
                Some(v) => CurrentReading {
                    value_label: format_concentration(v),
                    band: classify_sensor(&sensor.pollutant, sensor.code.as_deref(), v),
                },
                None => CurrentReading {
                    value_label: NO_DATA.to_string(),
                    band: QualityBand::Unknown,
                },
            };
            report.current_readings.insert(sensor.pollutant.clone(), current);
            if !hourly.is_empty() {
                report.hourly_series.insert(sensor.pollutant, hourly);
            }
        }

        if let Some(region) = station.region.clone() {
            report.region_averages = self.regions.averages_for_region(&region);
            report.region_name = Some(region);
        }
        report.all_region_averages = self.regions.averages_for_all_regions_cached();
        report.station = Some(station);

        Ok(report)
    }

    /// The cached all-region averages on their own.
    pub fn all_region_averages(&self) -> RegionAverages {
        self.regions.averages_for_all_regions_cached()
    }
}
