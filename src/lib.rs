//! Smog Watch: nearest-station air quality reports for Polish cities, built
//! on the GIOS monitoring network and a geocoding provider.

pub mod air;
pub mod config;
pub mod server;
