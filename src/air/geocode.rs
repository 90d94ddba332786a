//! City name → coordinates.

use super::providers::Geocoder;
use super::types::LookupError;
use std::sync::Arc;

pub struct GeoLocator {
    geocoder: Arc<dyn Geocoder>,
}

impl GeoLocator {
    pub fn new(geocoder: Arc<dyn Geocoder>) -> Self {
        Self { geocoder }
    }

    /// Coordinates of the first geocoding result. Transport errors, bad
    /// statuses and empty result lists all collapse into `CityNotFound`.
    /// No retry.
    pub fn locate(&self, city: &str) -> Result<(f64, f64), LookupError> {
        let city = city.trim();
        if city.is_empty() {
            return Err(LookupError::CityNotFound(String::new()));
        }
        match self.geocoder.geocode(city) {
            Ok(Some(coords)) => Ok(coords),
            Ok(None) => {
                tracing::info!(city, "geocoder returned no results");
                Err(LookupError::CityNotFound(city.to_string()))
            }
            Err(e) => {
                tracing::warn!(city, error = %e, "geocoding failed");
                Err(LookupError::CityNotFound(city.to_string()))
            }
        }
    }
}
