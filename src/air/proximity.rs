//! Great-circle ranking of stations.

use super::types::Station;

/// Mean Earth radius in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine distance in kilometres between two points given in degrees.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lon2 - lon1).to_radians();

    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Stations paired with their distance to `(lat, lon)`, nearest first.
/// Equal distances keep input order.
pub fn nearest(lat: f64, lon: f64, stations: &[Station]) -> Vec<(Station, f64)> {
    let mut ranked: Vec<(Station, f64)> = stations
        .iter()
        .map(|s| (s.clone(), haversine_km(lat, lon, s.lat, s.lon)))
        .collect();
    ranked.sort_by(|a, b| a.1.total_cmp(&b.1));
    ranked
}

/// The nearest station no farther than `radius_km`.
pub fn nearest_within(
    lat: f64,
    lon: f64,
    stations: &[Station],
    radius_km: f64,
) -> Option<(Station, f64)> {
    nearest(lat, lon, stations)
        .into_iter()
        .find(|(_, d)| *d <= radius_km)
}
