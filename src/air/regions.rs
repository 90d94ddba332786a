//! Per-region, per-pollutant averages.
//!
//! Values are pooled across every station in a region: the mean is the sum
//! of all non-null readings over their count, not a mean of station means.
//! Stations are fetched on a small pool of scoped threads, but the pooled
//! sums are accumulated in station order so the result does not depend on
//! scheduling.

use super::cache::{Clock, TtlCache};
use super::quality::{classify, format_concentration};
use super::readings::SensorReadingService;
use super::stations::StationDirectory;
use super::types::{PollutantAverages, ProviderError, RegionAverages, RegionalAverage, Station};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

pub const REGIONS_TTL: Duration = Duration::from_secs(1800);

/// Upper bound on concurrent station fetches.
pub const DEFAULT_WORKERS: usize = 4;

/// Values of one station grouped by pollutant name.
type StationValues = Vec<(String, Vec<f64>)>;

pub struct RegionalAggregator {
    stations: Arc<StationDirectory>,
    readings: Arc<SensorReadingService>,
    cache: TtlCache<RegionAverages>,
    workers: usize,
}

impl RegionalAggregator {
    pub fn new(
        stations: Arc<StationDirectory>,
        readings: Arc<SensorReadingService>,
        ttl: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            stations,
            readings,
            cache: TtlCache::new(ttl, clock),
            workers: DEFAULT_WORKERS,
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Averages over every station whose region matches `region`
    /// case-insensitively.
    pub fn averages_for_region(&self, region: &str) -> PollutantAverages {
        let members: Vec<Station> = self
            .stations
            .list_stations_cached()
            .into_iter()
            .filter(|s| region_matches(s, region))
            .collect();
        tracing::debug!(region, stations = members.len(), "computing regional averages");
        self.averages_over(&members)
    }

    /// Averages for every resolvable region, computed independently.
    pub fn averages_for_all_regions(&self) -> RegionAverages {
        group_by_region(self.stations.list_stations_cached())
            .into_iter()
            .map(|(name, members)| (name, self.averages_over(&members)))
            .collect()
    }

    /// `averages_for_all_regions` behind the shared TTL cache. An empty
    /// result is not cached.
    pub fn averages_for_all_regions_cached(&self) -> RegionAverages {
        self.cache
            .get_or_try_refresh(|| {
                let all = self.averages_for_all_regions();
                if all.is_empty() {
                    return Err(ProviderError::Empty);
                }
                tracing::info!(regions = all.len(), "refreshed regional averages");
                Ok(all)
            })
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "regional averages unavailable");
                RegionAverages::new()
            })
    }

    fn averages_over(&self, stations: &[Station]) -> PollutantAverages {
        pooled_averages(self.collect_values(stations))
    }

    fn station_values(&self, station: &Station) -> StationValues {
        self.readings
            .list_sensors(station.id)
            .into_iter()
            .map(|sensor| {
                let values = self.readings.all_values(sensor.id);
                (sensor.pollutant, values)
            })
            .collect()
    }

    /// Per-station values in input order.
    fn collect_values(&self, stations: &[Station]) -> Vec<StationValues> {
        if self.workers <= 1 || stations.len() <= 1 {
            return stations.iter().map(|s| self.station_values(s)).collect();
        }

        let chunk = stations.len().div_ceil(self.workers);
        std::thread::scope(|scope| {
            let handles: Vec<_> = stations
                .chunks(chunk)
                .map(|part| {
                    scope.spawn(move || {
                        part.iter()
                            .map(|s| self.station_values(s))
                            .collect::<Vec<_>>()
                    })
                })
                .collect();

            handles
                .into_iter()
                .flat_map(|h| {
                    h.join().unwrap_or_else(|_| {
                        tracing::warn!("station worker panicked; its stations are skipped");
                        Vec::new()
                    })
                })
                .collect()
        })
    }
}

pub fn region_matches(station: &Station, region: &str) -> bool {
    station
        .region
        .as_deref()
        .is_some_and(|r| r.to_lowercase() == region.trim().to_lowercase())
}

/// Group stations by region name, case-insensitively. The first spelling
/// seen names the group; stations without a region are left out.
pub fn group_by_region(stations: Vec<Station>) -> BTreeMap<String, Vec<Station>> {
    let mut spelling: BTreeMap<String, String> = BTreeMap::new();
    let mut groups: BTreeMap<String, Vec<Station>> = BTreeMap::new();
    for station in stations {
        let Some(region) = station.region.clone() else {
            continue;
        };
        let name = spelling
            .entry(region.to_lowercase())
            .or_insert(region)
            .clone();
        groups.entry(name).or_default().push(station);
    }
    groups
}

/// Pool every value by pollutant and turn the totals into averages.
/// Pollutants without observations are omitted.
fn pooled_averages(per_station: Vec<StationValues>) -> PollutantAverages {
    let mut totals: BTreeMap<String, (f64, usize)> = BTreeMap::new();
    for (pollutant, values) in per_station.into_iter().flatten() {
        let entry = totals.entry(pollutant).or_insert((0.0, 0));
        for v in values {
            entry.0 += v;
            entry.1 += 1;
        }
    }

    totals
        .into_iter()
        .filter(|(_, (_, count))| *count > 0)
        .map(|(pollutant, (sum, count))| {
            let mean = sum / count as f64;
            let average = RegionalAverage {
                mean,
                label: format_concentration(mean),
                band: classify(&pollutant, mean),
            };
            (pollutant, average)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::air::stations::STATIONS_TTL;
    use crate::air::testing::{reading, sensor, station, FakeApi, ManualClock};
    use crate::air::types::QualityBand;
    use approx::assert_relative_eq;
    use std::sync::atomic::Ordering;

    fn aggregator(api: FakeApi, clock: Arc<ManualClock>) -> (RegionalAggregator, Arc<FakeApi>) {
        let api = Arc::new(api);
        let dir = Arc::new(StationDirectory::new(api.clone(), STATIONS_TTL, clock.clone()));
        let svc = Arc::new(SensorReadingService::new(
            api.clone(),
            clock.clone(),
            chrono_tz::Europe::Warsaw,
        ));
        (RegionalAggregator::new(dir, svc, REGIONS_TTL, clock), api)
    }

    fn region_fixture() -> FakeApi {
        FakeApi::default()
            .with_station(
                station(1, 52.2, 21.0, Some("MAZOWIECKIE")),
                vec![(
                    sensor(11, 1, "PM10"),
                    vec![
                        reading("2025-01-15 12:00:00", Some(10.0)),
                        reading("2025-01-15 11:00:00", None),
                    ],
                )],
            )
            .with_station(
                station(2, 52.1, 20.9, Some("mazowieckie")),
                vec![(
                    sensor(21, 2, "PM10"),
                    vec![
                        reading("2025-01-15 12:00:00", Some(20.0)),
                        reading("2025-01-15 11:00:00", Some(30.0)),
                    ],
                )],
            )
            .with_station(
                station(3, 50.0, 19.9, Some("MAŁOPOLSKIE")),
                vec![(
                    sensor(31, 3, "PM10"),
                    vec![reading("2025-01-15 12:00:00", Some(500.0))],
                )],
            )
            .with_station(station(4, 51.0, 19.0, None), vec![])
    }

    #[test]
    fn test_region_mean_pooled_and_formatted() {
        let (agg, _) = aggregator(region_fixture(), Arc::new(ManualClock::epoch()));
        let averages = agg.averages_for_region("Mazowieckie");

        assert_eq!(averages.len(), 1);
        let pm10 = &averages["PM10"];
        assert_relative_eq!(pm10.mean, 20.0);
        assert_eq!(pm10.label, "20.00 µg/m³");
        assert_eq!(pm10.band, QualityBand::VeryGood);
    }

    #[test]
    fn test_pooled_not_mean_of_means() {
        // Station means are 10 and 25; pooled mean of {10, 20, 30} is 20.
        let per_station = vec![
            vec![("NO2".to_string(), vec![10.0])],
            vec![("NO2".to_string(), vec![20.0, 30.0])],
        ];
        let averages = pooled_averages(per_station);
        assert_relative_eq!(averages["NO2"].mean, 20.0);
    }

    #[test]
    fn test_pollutant_without_values_omitted() {
        let per_station = vec![vec![
            ("O3".to_string(), vec![]),
            ("SO2".to_string(), vec![42.0]),
        ]];
        let averages = pooled_averages(per_station);
        assert!(!averages.contains_key("O3"));
        assert_eq!(averages["SO2"].band, QualityBand::VeryGood);
    }

    #[test]
    fn test_unknown_region_is_empty() {
        let (agg, _) = aggregator(region_fixture(), Arc::new(ManualClock::epoch()));
        assert!(agg.averages_for_region("ŚLĄSKIE").is_empty());
    }

    #[test]
    fn test_all_regions_grouped_case_insensitively() {
        let (agg, _) = aggregator(region_fixture(), Arc::new(ManualClock::epoch()));
        let all = agg.averages_for_all_regions();

        assert_eq!(all.len(), 2);
        assert_relative_eq!(all["MAZOWIECKIE"]["PM10"].mean, 20.0);
        assert_relative_eq!(all["MAŁOPOLSKIE"]["PM10"].mean, 500.0);
        assert_eq!(all["MAŁOPOLSKIE"]["PM10"].band, QualityBand::VeryPoor);
    }

    #[test]
    fn test_sequential_and_parallel_agree() {
        let clock = Arc::new(ManualClock::epoch());
        let (seq, _) = aggregator(region_fixture(), clock.clone());
        let (par, _) = aggregator(region_fixture(), clock);
        let seq = seq.with_workers(1);
        let par = par.with_workers(3);
        assert_eq!(seq.averages_for_all_regions(), par.averages_for_all_regions());
    }

    #[test]
    fn test_all_regions_cache_ttl() {
        let clock = Arc::new(ManualClock::epoch());
        let (agg, api) = aggregator(region_fixture(), clock.clone());

        agg.averages_for_all_regions_cached();
        let after_first = api.reading_calls.load(Ordering::SeqCst);
        clock.advance_secs(1799);
        agg.averages_for_all_regions_cached();
        assert_eq!(api.reading_calls.load(Ordering::SeqCst), after_first);

        clock.advance_secs(1);
        agg.averages_for_all_regions_cached();
        assert!(api.reading_calls.load(Ordering::SeqCst) > after_first);
    }

    #[test]
    fn test_group_by_region_skips_unresolved() {
        let groups = group_by_region(vec![
            station(1, 0.0, 0.0, Some("Pomorskie")),
            station(2, 0.0, 0.0, None),
            station(3, 0.0, 0.0, Some("POMORSKIE")),
        ]);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups["Pomorskie"].len(), 2);
    }
}
