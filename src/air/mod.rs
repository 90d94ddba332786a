//! Air quality pipeline: geocoding, GIOS station metadata and measurements,
//! nearest-station search, quality bands and regional averages.

pub mod cache;
pub mod geocode;
pub mod orchestrator;
pub mod providers;
pub mod proximity;
pub mod quality;
pub mod readings;
pub mod regions;
pub mod stations;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use cache::{Clock, SystemClock, TtlCache};
pub use orchestrator::{PipelineSettings, RequestOrchestrator};
pub use providers::{AirQualityApi, Geocoder, GiosClient, GoogleGeocoder};
pub use types::{AirReport, LookupError, ProviderError, QualityBand, Station};
