use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::angles::{deg_to_rad, normalize_angle};
use crate::error::{ConfigError, ConfigResult};
use crate::ingest::DEFAULT_PREAMBLE_LINES;
use crate::types::PanelConfig;

fn default_panel_tilt() -> f64 {
    20.0
}

fn default_panel_azimuth() -> f64 {
    180.0
}

fn default_export_path() -> String {
    "/loggings/exportdata.csv".to_string()
}

fn default_status_path() -> String {
    "/status_trackings/lastirradiance".to_string()
}

fn default_preamble_lines() -> usize {
    DEFAULT_PREAMBLE_LINES
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_interval_pause_ms() -> u64 {
    200
}

fn default_trailing_pause_ms() -> u64 {
    500
}

/// Connection settings for one device.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DeviceConfig {
    /// Host or host:port on the local network.
    pub address: String,
    #[serde(default = "default_export_path")]
    pub export_path: String,
    #[serde(default = "default_status_path")]
    pub status_path: String,
    #[serde(default = "default_preamble_lines")]
    pub preamble_lines: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl DeviceConfig {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            export_path: default_export_path(),
            status_path: default_status_path(),
            preamble_lines: default_preamble_lines(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Pauses taken before filtering freshly fetched rows. Zero disables them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PacingConfig {
    #[serde(default = "default_interval_pause_ms")]
    pub interval_pause_ms: u64,
    #[serde(default = "default_trailing_pause_ms")]
    pub trailing_pause_ms: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            interval_pause_ms: default_interval_pause_ms(),
            trailing_pause_ms: default_trailing_pause_ms(),
        }
    }
}

impl PacingConfig {
    pub fn none() -> Self {
        Self {
            interval_pause_ms: 0,
            trailing_pause_ms: 0,
        }
    }

    pub fn interval_pause(&self) -> Duration {
        Duration::from_millis(self.interval_pause_ms)
    }

    pub fn trailing_pause(&self) -> Duration {
        Duration::from_millis(self.trailing_pause_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SessionConfig {
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    #[serde(default = "default_panel_tilt")]
    pub panel_tilt_deg: f64,
    #[serde(default = "default_panel_azimuth")]
    pub panel_azimuth_deg: f64,
    /// IANA identifier. Resolved from the coordinates when absent.
    #[serde(default)]
    pub timezone: Option<String>,
    pub device: DeviceConfig,
    #[serde(default)]
    pub pacing: PacingConfig,
}

impl SessionConfig {
    pub fn new(latitude_deg: f64, longitude_deg: f64, device: DeviceConfig) -> Self {
        Self {
            latitude_deg,
            longitude_deg,
            panel_tilt_deg: default_panel_tilt(),
            panel_azimuth_deg: default_panel_azimuth(),
            timezone: None,
            device,
            pacing: PacingConfig::default(),
        }
    }

    pub fn from_toml_str(text: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        check_range("latitude_deg", self.latitude_deg, -90.0, 90.0)?;
        check_range("longitude_deg", self.longitude_deg, -180.0, 180.0)?;
        check_range("panel_tilt_deg", self.panel_tilt_deg, 0.0, 90.0)?;
        check_range("panel_azimuth_deg", self.panel_azimuth_deg, 0.0, 360.0)?;
        if self.device.address.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "device.address",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    pub fn panel(&self) -> PanelConfig {
        PanelConfig {
            latitude_rad: deg_to_rad(self.latitude_deg),
            longitude_rad: deg_to_rad(self.longitude_deg),
            tilt_rad: deg_to_rad(self.panel_tilt_deg),
            azimuth_rad: deg_to_rad(normalize_angle(self.panel_azimuth_deg)),
        }
    }
}

fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> ConfigResult<()> {
    if value.is_finite() && (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: format!("{value} is outside [{min}, {max}]"),
        })
    }
}
