//! Pollutant concentration → quality band.
//!
//! Names are normalized through a synonym table onto the canonical short
//! codes PM10, PM2.5, NO2, SO2 and O3. Each code has six ascending bands
//! (µg/m³). The first band is closed `[0, upper]`, the rest are half-open
//! `(lower, upper]`, and anything that matches no band is very poor. That
//! includes negative values.

use super::types::{QualityBand, UNIT};

/// Lowercased alias → canonical code.
const SYNONYMS: &[(&str, &str)] = &[
    ("pm10", "PM10"),
    ("pył zawieszony pm10", "PM10"),
    ("particulate matter pm10", "PM10"),
    ("pm2.5", "PM2.5"),
    ("pm25", "PM2.5"),
    ("pm2,5", "PM2.5"),
    ("pył zawieszony pm2.5", "PM2.5"),
    ("particulate matter pm2.5", "PM2.5"),
    ("no2", "NO2"),
    ("dwutlenek azotu", "NO2"),
    ("nitrogen dioxide", "NO2"),
    ("so2", "SO2"),
    ("dwutlenek siarki", "SO2"),
    ("sulphur dioxide", "SO2"),
    ("sulfur dioxide", "SO2"),
    ("o3", "O3"),
    ("ozon", "O3"),
    ("ozone", "O3"),
];

/// Upper bounds of very-good, good, fair, moderate and poor; above the last
/// is very poor.
const BREAKPOINTS: &[(&str, [f64; 5])] = &[
    ("PM10", [20.0, 50.0, 80.0, 110.0, 150.0]),
    ("PM2.5", [13.0, 35.0, 55.0, 75.0, 110.0]),
    ("NO2", [40.0, 100.0, 150.0, 200.0, 300.0]),
    ("O3", [70.0, 120.0, 150.0, 180.0, 240.0]),
    ("SO2", [50.0, 100.0, 200.0, 350.0, 500.0]),
];

const BANDS: [QualityBand; 5] = [
    QualityBand::VeryGood,
    QualityBand::Good,
    QualityBand::Fair,
    QualityBand::Moderate,
    QualityBand::Poor,
];

/// Canonical code for a pollutant name, or the trimmed name itself when it
/// is not a known alias.
pub fn normalize(pollutant: &str) -> String {
    let key = pollutant.trim().to_lowercase();
    SYNONYMS
        .iter()
        .find(|(alias, _)| *alias == key)
        .map(|(_, code)| code.to_string())
        .unwrap_or_else(|| pollutant.trim().to_string())
}

pub fn classify(pollutant: &str, value: f64) -> QualityBand {
    let code = normalize(pollutant);
    let Some((_, uppers)) = BREAKPOINTS.iter().find(|(c, _)| *c == code) else {
        return QualityBand::Unknown;
    };

    let mut lower = 0.0;
    for (i, (&upper, band)) in uppers.iter().zip(BANDS).enumerate() {
        let above_lower = if i == 0 { value >= lower } else { value > lower };
        if above_lower && value <= upper {
            return band;
        }
        lower = upper;
    }
    QualityBand::VeryPoor
}

/// Classify a sensor's value by its parameter name, falling back to the
/// provider's formula code when the name is not a known alias.
pub fn classify_sensor(pollutant: &str, code: Option<&str>, value: f64) -> QualityBand {
    match (classify(pollutant, value), code) {
        (QualityBand::Unknown, Some(code)) => classify(code, value),
        (band, _) => band,
    }
}

/// Two-decimal value with unit, e.g. "20.00 µg/m³".
pub fn format_concentration(value: f64) -> String {
    format!("{:.2} {}", value, UNIT)
}
