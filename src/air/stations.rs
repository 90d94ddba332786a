//! Station list retrieval with a process-wide TTL cache.

use super::cache::{Clock, TtlCache};
use super::providers::AirQualityApi;
use super::types::{ProviderError, Station};
use std::sync::Arc;
use std::time::Duration;

pub const STATIONS_TTL: Duration = Duration::from_secs(600);

pub struct StationDirectory {
    api: Arc<dyn AirQualityApi>,
    cache: TtlCache<Vec<Station>>,
}

impl StationDirectory {
    pub fn new(api: Arc<dyn AirQualityApi>, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            api,
            cache: TtlCache::new(ttl, clock),
        }
    }

    /// Uncached fetch. An empty list is reported as `ProviderError::Empty`.
    pub fn fetch_stations(&self) -> Result<Vec<Station>, ProviderError> {
        let stations = self.api.stations()?;
        if stations.is_empty() {
            return Err(ProviderError::Empty);
        }
        Ok(stations)
    }

    /// Uncached fetch, degrading to an empty list on any failure.
    pub fn list_stations(&self) -> Vec<Station> {
        self.fetch_stations().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "station list unavailable");
            Vec::new()
        })
    }

    /// Cached station list. Failures are not cached.
    pub fn list_stations_cached(&self) -> Vec<Station> {
        self.cache
            .get_or_try_refresh(|| {
                let stations = self.fetch_stations()?;
                tracing::info!(count = stations.len(), "refreshed station list");
                Ok::<_, ProviderError>(stations)
            })
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "station list unavailable");
                Vec::new()
            })
    }
}
