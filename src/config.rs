//! # Configuration Management
//!
//! This module handles loading and parsing the clock configuration. The file is
//! JSON and is searched at `./config.json` first, then `$HOME/.paperclock`.
//! Any read or parse problem falls back to the built-in defaults so the clock
//! always starts.
//!
//! The raw file shape (`RawConfig`) is resolved into [`Settings`], which is
//! immutable for the life of the process:
//! - named locations are resolved through a small built-in geocoding table
//! - the secondary timezone is parsed into a [`chrono_tz::Tz`]
//! - absent keys take their documented defaults

use chrono_tz::Tz;
use log::{info, warn};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while reading a configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("config JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Geographic position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Position {
    pub lat: f64,
    pub lon: f64,
}

/// Which clock face occupies the top of the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ClockFace {
    #[default]
    Analog,
    Digital,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
pub enum TimeFormat {
    #[default]
    #[serde(rename = "24h")]
    H24,
    #[serde(rename = "12h")]
    H12,
}

impl TimeFormat {
    /// strftime pattern used for every time of day on the panel
    pub fn pattern(self) -> &'static str {
        match self {
            TimeFormat::H24 => "%H:%M",
            TimeFormat::H12 => "%I:%M",
        }
    }
}

/// Unit system requested from the weather API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    #[default]
    Metric,
    Imperial,
}

impl Units {
    pub fn as_query(self) -> &'static str {
        match self {
            Units::Metric => "metric",
            Units::Imperial => "imperial",
        }
    }
}

/// GPIO assignment for the panel HAT (BCM numbering).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct HardwareConfig {
    pub rst_pin: u8,
    pub dc_pin: u8,
    pub busy_pin: u8,
    /// Keys 1-4 on the HAT, top to bottom
    pub buttons: Vec<u8>,
}

impl Default for HardwareConfig {
    fn default() -> Self {
        HardwareConfig {
            rst_pin: 17,
            dc_pin: 25,
            busy_pin: 24,
            buttons: vec![5, 6, 13, 19],
        }
    }
}

/// `location` is either a place name or literal coordinates.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawLocation {
    Named(String),
    Coordinates(Position),
}

/// Configuration file as written on disk.
#[derive(Debug, Deserialize)]
struct RawConfig {
    location: Option<RawLocation>,
    #[serde(rename = "secondTZ", default)]
    second_tz: Option<String>,
    openweathermap_api_key: Option<String>,
    #[serde(default)]
    units: Units,
    #[serde(default)]
    time: TimeFormat,
    #[serde(default)]
    mode: ClockFace,
    data_dir: Option<PathBuf>,
    #[serde(default)]
    hardware: HardwareConfig,
}

/// Resolved, immutable display settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub position: Position,
    pub second_tz: Option<Tz>,
    pub clock_face: ClockFace,
    pub time_format: TimeFormat,
    pub units: Units,
    pub api_key: Option<String>,
    /// Directory holding `weather/*.png`, `sunrise.png` and `sunset.png`
    pub data_dir: PathBuf,
    pub hardware: HardwareConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            position: Position { lat: 0.0, lon: 0.0 },
            second_tz: Some(Tz::UTC),
            clock_face: ClockFace::Analog,
            time_format: TimeFormat::H24,
            units: Units::Metric,
            api_key: None,
            data_dir: PathBuf::from("data"),
            hardware: HardwareConfig::default(),
        }
    }
}

/// Places that can be named in `location` instead of coordinates.
const PLACES: &[(&str, f64, f64)] = &[
    ("Amsterdam", 52.3676, 4.9041),
    ("Berlin", 52.5200, 13.4050),
    ("Chicago", 41.8781, -87.6298),
    ("Helsinki", 60.1699, 24.9384),
    ("Kyiv", 50.4501, 30.5234),
    ("London", 51.5074, -0.1278),
    ("Los Angeles", 34.0522, -118.2437),
    ("Madrid", 40.4168, -3.7038),
    ("Montreal", 45.5017, -73.5673),
    ("New York", 40.7128, -74.0060),
    ("Paris", 48.8566, 2.3522),
    ("San Francisco", 37.7749, -122.4194),
    ("Sydney", -33.8688, 151.2093),
    ("Tokyo", 35.6762, 139.6503),
    ("Toronto", 43.6532, -79.3832),
    ("Vancouver", 49.2827, -123.1207),
    ("Warsaw", 52.2297, 21.0122),
];

/// Look up a named place, ignoring case and surrounding whitespace.
pub fn geocode(name: &str) -> Option<Position> {
    let wanted = name.trim();
    PLACES
        .iter()
        .find(|(place, _, _)| place.eq_ignore_ascii_case(wanted))
        .map(|&(_, lat, lon)| Position { lat, lon })
}

impl Settings {
    /// Load configuration from `./config.json` or `$HOME/.paperclock`.
    /// Falls back to default configuration if neither exists or is invalid.
    pub fn load() -> Self {
        match Self::default_path() {
            Some(path) => Self::load_from_path(path),
            None => {
                warn!("No config file found, using default configuration");
                Self::default()
            }
        }
    }

    /// Load configuration from specified path.
    /// Falls back to default configuration if file doesn't exist or is invalid.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Self {
        match Self::read(path.as_ref()) {
            Ok(settings) => {
                info!(
                    "Loaded configuration from {} ({:.2}, {:.2})",
                    path.as_ref().display(),
                    settings.position.lat,
                    settings.position.lon
                );
                settings
            }
            Err(e) => {
                warn!("Using default configuration: {}", e);
                Self::default()
            }
        }
    }

    fn read(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Parse and resolve a JSON configuration document.
    pub fn from_json_str(contents: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = serde_json::from_str(contents)?;
        Ok(Self::resolve(raw))
    }

    fn resolve(raw: RawConfig) -> Self {
        let defaults = Settings::default();

        let position = match raw.location {
            Some(RawLocation::Coordinates(position)) => position,
            Some(RawLocation::Named(name)) => geocode(&name).unwrap_or_else(|| {
                warn!("Unknown location '{}', using {:?}", name, defaults.position);
                defaults.position
            }),
            None => defaults.position,
        };

        let second_tz = raw
            .second_tz
            .and_then(|name| match name.parse::<Tz>() {
                Ok(tz) => Some(tz),
                Err(_) => {
                    warn!("Unknown timezone '{}', secondary clock disabled", name);
                    None
                }
            });

        Settings {
            position,
            second_tz,
            clock_face: raw.mode,
            time_format: raw.time,
            units: raw.units,
            api_key: raw.openweathermap_api_key.filter(|key| !key.is_empty()),
            data_dir: raw.data_dir.unwrap_or(defaults.data_dir),
            hardware: raw.hardware,
        }
    }

    fn default_path() -> Option<PathBuf> {
        let local = PathBuf::from("config.json");
        if local.is_file() {
            return Some(local);
        }
        dirs_next::home_dir()
            .map(|home| home.join(".paperclock"))
            .filter(|path| path.is_file())
    }

    /// Weather polling is disabled entirely without an API key.
    pub fn weather_enabled(&self) -> bool {
        self.api_key.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let settings = Settings::default();
        assert_eq!(settings.position, Position { lat: 0.0, lon: 0.0 });
        assert_eq!(settings.second_tz, Some(Tz::UTC));
        assert_eq!(settings.clock_face, ClockFace::Analog);
        assert_eq!(settings.time_format, TimeFormat::H24);
        assert_eq!(settings.units, Units::Metric);
        assert!(!settings.weather_enabled());
    }

    #[test]
    fn test_coordinates_and_modes() {
        let settings = Settings::from_json_str(
            r#"{
                "location": {"lat": 43.63, "lon": -80.04},
                "secondTZ": "Europe/Kyiv",
                "openweathermap_api_key": "abc",
                "units": "imperial",
                "time": "12h",
                "mode": "digital"
            }"#,
        )
        .unwrap();
        assert_eq!(
            settings.position,
            Position {
                lat: 43.63,
                lon: -80.04
            }
        );
        assert_eq!(settings.second_tz, Some(chrono_tz::Europe::Kyiv));
        assert_eq!(settings.units, Units::Imperial);
        assert_eq!(settings.time_format, TimeFormat::H12);
        assert_eq!(settings.clock_face, ClockFace::Digital);
        assert_eq!(settings.api_key.as_deref(), Some("abc"));
    }

    #[test]
    fn test_named_location() {
        let settings = Settings::from_json_str(r#"{"location": "toronto"}"#).unwrap();
        assert!((settings.position.lat - 43.6532).abs() < 1e-9);
        assert!((settings.position.lon + 79.3832).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_location_and_timezone() {
        let settings =
            Settings::from_json_str(r#"{"location": "Atlantis", "secondTZ": "Mars/Olympus"}"#)
                .unwrap();
        assert_eq!(settings.position, Position { lat: 0.0, lon: 0.0 });
        assert_eq!(settings.second_tz, None);
    }

    #[test]
    fn test_absent_keys_take_defaults() {
        let settings = Settings::from_json_str("{}").unwrap();
        assert_eq!(settings.second_tz, None);
        assert_eq!(settings.time_format, TimeFormat::H24);
        assert_eq!(settings.hardware, HardwareConfig::default());
        assert_eq!(settings.data_dir, PathBuf::from("data"));
    }

    #[test]
    fn test_file_without_second_tz_has_no_secondary_clock() {
        let settings = Settings::from_json_str(
            r#"{"location": {"lat": 43.63, "lon": -80.04}, "mode": "analog"}"#,
        )
        .unwrap();
        assert_eq!(settings.second_tz, None);
        // only an unreadable file falls back to the UTC clock
        assert_eq!(Settings::default().second_tz, Some(Tz::UTC));
    }

    #[test]
    fn test_empty_api_key_disables_weather() {
        let settings = Settings::from_json_str(r#"{"openweathermap_api_key": ""}"#).unwrap();
        assert!(!settings.weather_enabled());
    }

    #[test]
    fn test_invalid_value_is_an_error() {
        assert!(Settings::from_json_str(r#"{"time": "25h"}"#).is_err());
        assert!(Settings::from_json_str("not json").is_err());
    }

    #[test]
    fn test_load_nonexistent_file() {
        let settings = Settings::load_from_path("/nonexistent/path");
        // Should fallback to default
        assert_eq!(settings.clock_face, ClockFace::Analog);
        assert_eq!(settings.second_tz, Some(Tz::UTC));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"location": {{"lat": 1.5, "lon": 2.5}}, "mode": "digital"}}"#).unwrap();
        let settings = Settings::load_from_path(file.path());
        assert_eq!(settings.position, Position { lat: 1.5, lon: 2.5 });
        assert_eq!(settings.clock_face, ClockFace::Digital);
    }

    #[test]
    fn test_time_patterns() {
        assert_eq!(TimeFormat::H24.pattern(), "%H:%M");
        assert_eq!(TimeFormat::H12.pattern(), "%I:%M");
    }
}
