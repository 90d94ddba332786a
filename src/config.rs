//! Runtime configuration from environment variables, with defaults.
//!
//! CLI flags in `main.rs` override individual values after loading.

use crate::air::orchestrator::{PipelineSettings, DEFAULT_RADIUS_KM};
use crate::air::regions::DEFAULT_WORKERS;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_GIOS_URL: &str = "https://api.gios.gov.pl/pjp-api/rest";
pub const DEFAULT_GEOCODING_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";
pub const DEFAULT_TIMEZONE: &str = "Europe/Warsaw";
pub const DEFAULT_LISTEN: &str = "127.0.0.1:8080";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown timezone '{0}' (use an IANA name such as Europe/Warsaw)")]
    Timezone(String),
    #[error("invalid listen address '{0}'")]
    ListenAddr(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub gios_url: String,
    pub geocoding_url: String,
    pub api_key: String,
    pub http_timeout: Duration,
    pub radius_km: f64,
    pub timezone: String,
    pub stations_ttl: Duration,
    pub regions_ttl: Duration,
    pub listen: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gios_url: DEFAULT_GIOS_URL.into(),
            geocoding_url: DEFAULT_GEOCODING_URL.into(),
            api_key: String::new(),
            http_timeout: Duration::from_secs(10),
            radius_km: DEFAULT_RADIUS_KM,
            timezone: DEFAULT_TIMEZONE.into(),
            stations_ttl: Duration::from_secs(600),
            regions_ttl: Duration::from_secs(1800),
            listen: DEFAULT_LISTEN.into(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source. Unparsable numbers keep
    /// their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let secs = |key: &str, default: Duration| {
            parsed::<u64>(&lookup, key).map(Duration::from_secs).unwrap_or(default)
        };

        Self {
            gios_url: lookup("SMOG_GIOS_URL").unwrap_or(defaults.gios_url),
            geocoding_url: lookup("SMOG_GEOCODING_URL").unwrap_or(defaults.geocoding_url),
            api_key: lookup("GOOGLE_MAPS_API_KEY").unwrap_or(defaults.api_key),
            http_timeout: secs("SMOG_HTTP_TIMEOUT_SECS", defaults.http_timeout),
            radius_km: parsed::<f64>(&lookup, "SMOG_RADIUS_KM").unwrap_or(defaults.radius_km),
            timezone: lookup("SMOG_TIMEZONE").unwrap_or(defaults.timezone),
            stations_ttl: secs("SMOG_STATIONS_TTL_SECS", defaults.stations_ttl),
            regions_ttl: secs("SMOG_REGIONS_TTL_SECS", defaults.regions_ttl),
            listen: lookup("SMOG_LISTEN").unwrap_or(defaults.listen),
        }
    }

    pub fn pipeline(&self) -> Result<PipelineSettings, ConfigError> {
        let timezone: chrono_tz::Tz = self
            .timezone
            .parse()
            .map_err(|_| ConfigError::Timezone(self.timezone.clone()))?;
        Ok(PipelineSettings {
            radius_km: self.radius_km,
            stations_ttl: self.stations_ttl,
            regions_ttl: self.regions_ttl,
            timezone,
            workers: DEFAULT_WORKERS,
        })
    }

    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.listen
            .parse()
            .map_err(|_| ConfigError::ListenAddr(self.listen.clone()))
    }
}

fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparsable setting");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_map(vars: &[(&str, &str)]) -> Config {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = from_map(&[]);
        assert_eq!(config.gios_url, DEFAULT_GIOS_URL);
        assert_eq!(config.radius_km, 20.0);
        assert_eq!(config.stations_ttl, Duration::from_secs(600));
        assert_eq!(config.regions_ttl, Duration::from_secs(1800));
        assert!(config.api_key.is_empty());
    }

    #[test]
    fn test_overrides() {
        let config = from_map(&[
            ("GOOGLE_MAPS_API_KEY", "secret"),
            ("SMOG_RADIUS_KM", "35.5"),
            ("SMOG_HTTP_TIMEOUT_SECS", "3"),
            ("SMOG_STATIONS_TTL_SECS", "60"),
        ]);
        assert_eq!(config.api_key, "secret");
        assert_eq!(config.radius_km, 35.5);
        assert_eq!(config.http_timeout, Duration::from_secs(3));
        assert_eq!(config.stations_ttl, Duration::from_secs(60));
    }

    #[test]
    fn test_bad_number_keeps_default() {
        let config = from_map(&[("SMOG_RADIUS_KM", "far"), ("SMOG_REGIONS_TTL_SECS", "-1")]);
        assert_eq!(config.radius_km, 20.0);
        assert_eq!(config.regions_ttl, Duration::from_secs(1800));
    }

    #[test]
    fn test_pipeline_timezone() {
        let settings = from_map(&[]).pipeline().unwrap();
        assert_eq!(settings.timezone, chrono_tz::Europe::Warsaw);

        let bad = from_map(&[("SMOG_TIMEZONE", "Mars/Olympus")]);
        assert!(matches!(bad.pipeline(), Err(ConfigError::Timezone(_))));
    }

    #[test]
    fn test_listen_addr() {
        assert_eq!(from_map(&[]).listen_addr().unwrap().port(), 8080);
        assert!(from_map(&[("SMOG_LISTEN", "nowhere")]).listen_addr().is_err());
    }
}
