//! ==============================================================================
//! config.rs - Runtime Configuration Loader
//! ==============================================================================
//!
//! purpose:
//!     defines the schema for `greenhouse.toml`.
//!     loads configuration from file or falls back to defaults.
//!
//! structure:
//!     - PollingConfig: How often each subsystem loop runs.
//!     - ControlConfig: Hysteresis buffers, shutoff policy, stale-reading cutoff.
//!     - ReportingConfig: Monitoring window length, report timeout, archive dir.
//!     - LightConfig / IrrigationConfig: Subsystem thresholds.
//!     - ServerConfig: Dashboard bind address.
//!     - zones / crops: Static zone -> crop and crop -> optimal range tables.
//!
//! every section is optional; anything left out keeps the built-in greenhouse
//! (five zones, five crops) so an empty file is a valid config.
//!
//! ==============================================================================

use crate::control::ShutoffPolicy;
use crate::domain::Range;
use anyhow::Context;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// env var that points at an explicit config file
pub const CONFIG_ENV: &str = "GREENHOUSE_CONFIG";

/// Root configuration structure
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GreenhouseConfig {
    pub polling: PollingConfig,
    pub control: ControlConfig,
    pub reporting: ReportingConfig,
    pub light: LightConfig,
    pub irrigation: IrrigationConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub runtime: RuntimeConfig,
    /// zone id -> crop name
    pub zones: BTreeMap<String, String>,
    /// crop name -> optimal ranges
    pub crops: BTreeMap<String, CropRanges>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PollingConfig {
    pub climate_seconds: u64,
    pub irrigation_seconds: u64,
    pub light_seconds: u64,
    pub pest_seconds: u64,
    /// how often the simulated sensors take a new sample
    pub sensor_update_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ControlConfig {
    pub temperature_buffer: f64,
    pub humidity_buffer: f64,
    pub shutoff_policy: ShutoffPolicy,
    /// readings older than this are treated as missing
    pub stale_after_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ReportingConfig {
    pub window_seconds: u64,
    pub report_timeout_seconds: u64,
    /// pause between a report and the next window
    pub pause_millis: u64,
    /// where report text files go; unset disables archiving
    pub archive_dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LightConfig {
    pub low_lux: u32,
    pub high_lux: u32,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct IrrigationConfig {
    /// crop name -> minimum soil moisture (%)
    pub thresholds: BTreeMap<String, f64>,
    pub default_threshold: f64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub enabled: bool,
    pub bind: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub show_sensor_data: bool,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct RuntimeConfig {
    /// 0 runs until ctrl-c
    pub run_for_seconds: u64,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct CropRanges {
    pub temp_range: Range,
    pub humidity_range: Range,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("crop {crop}: {axis} range min {min} is above max {max}")]
    InvalidRange {
        crop: String,
        axis: &'static str,
        min: f64,
        max: f64,
    },
    #[error("{0} buffer must not be negative (got {1})")]
    NegativeBuffer(&'static str, f64),
    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),
    #[error("light thresholds inverted: low {low} lux >= high {high} lux")]
    InvertedLightThresholds { low: u32, high: u32 },
}

impl GreenhouseConfig {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("failed to read config file {}", path.as_ref().display()))?;

        let config: GreenhouseConfig =
            toml::from_str(&content).context("failed to parse config")?;
        config.validate()?;

        Ok(config)
    }

    /// Load with default fallback
    pub fn load_or_default() -> Self {
        let mut paths = Vec::new();
        if let Ok(explicit) = std::env::var(CONFIG_ENV) {
            paths.push(PathBuf::from(explicit));
        }
        paths.push(PathBuf::from("config").join("greenhouse.toml"));
        paths.push(PathBuf::from("..").join("config").join("greenhouse.toml"));

        for path in &paths {
            if path.exists() {
                match Self::load(path) {
                    Ok(config) => {
                        info!("[CONFIG] Loaded from {}", path.display());
                        return config;
                    }
                    Err(e) => {
                        warn!("[CONFIG] Failed to load {}: {:#}", path.display(), e);
                    }
                }
            }
        }

        warn!("[CONFIG] No usable config file found - using defaults");
        Self::default()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (crop, ranges) in &self.crops {
            for (axis, range) in [("temperature", ranges.temp_range), ("humidity", ranges.humidity_range)] {
                if range.min > range.max {
                    return Err(ConfigError::InvalidRange {
                        crop: crop.clone(),
                        axis,
                        min: range.min,
                        max: range.max,
                    });
                }
            }
        }

        if self.control.temperature_buffer < 0.0 {
            return Err(ConfigError::NegativeBuffer("temperature", self.control.temperature_buffer));
        }
        if self.control.humidity_buffer < 0.0 {
            return Err(ConfigError::NegativeBuffer("humidity", self.control.humidity_buffer));
        }

        let durations = [
            ("polling.climate_seconds", self.polling.climate_seconds),
            ("polling.irrigation_seconds", self.polling.irrigation_seconds),
            ("polling.light_seconds", self.polling.light_seconds),
            ("polling.pest_seconds", self.polling.pest_seconds),
            ("polling.sensor_update_seconds", self.polling.sensor_update_seconds),
            ("reporting.window_seconds", self.reporting.window_seconds),
            ("reporting.report_timeout_seconds", self.reporting.report_timeout_seconds),
        ];
        if let Some((name, _)) = durations.into_iter().find(|(_, secs)| *secs == 0) {
            return Err(ConfigError::ZeroDuration(name));
        }

        if self.light.low_lux >= self.light.high_lux {
            return Err(ConfigError::InvertedLightThresholds {
                low: self.light.low_lux,
                high: self.light.high_lux,
            });
        }

        Ok(())
    }

    /// Log configuration summary
    pub fn log_summary(&self) {
        info!("┌─────────────────────────────────────────┐");
        info!("│        GREENHOUSE CONFIGURATION         │");
        info!("├─────────────────────────────────────────┤");
        info!("│ Zones: {}", self.zones.len());
        info!("│ Crops: {}", self.crops.len());
        info!("│ Climate Poll: {}s", self.polling.climate_seconds);
        info!("│ Report Window: {}s", self.reporting.window_seconds);
        info!("│ Shutoff Policy: {:?}", self.control.shutoff_policy);
        info!("│ Log Level: {}", self.logging.level);
        info!("└─────────────────────────────────────────┘");
    }
}

impl PollingConfig {
    pub fn climate_interval(&self) -> Duration {
        Duration::from_secs(self.climate_seconds)
    }

    pub fn irrigation_interval(&self) -> Duration {
        Duration::from_secs(self.irrigation_seconds)
    }

    pub fn light_interval(&self) -> Duration {
        Duration::from_secs(self.light_seconds)
    }

    pub fn pest_interval(&self) -> Duration {
        Duration::from_secs(self.pest_seconds)
    }

    pub fn sensor_update_interval(&self) -> Duration {
        Duration::from_secs(self.sensor_update_seconds)
    }
}

impl ReportingConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_seconds)
    }

    pub fn report_timeout(&self) -> Duration {
        Duration::from_secs(self.report_timeout_seconds)
    }

    pub fn pause(&self) -> Duration {
        Duration::from_millis(self.pause_millis)
    }
}

impl IrrigationConfig {
    pub fn threshold_for(&self, crop: &str) -> f64 {
        self.thresholds.get(crop).copied().unwrap_or(self.default_threshold)
    }
}

// ==============================================================================
// defaults - the reference greenhouse
// ==============================================================================

impl Default for GreenhouseConfig {
    fn default() -> Self {
        let zones = [
            ("Zone-A", "Tomatoes"),
            ("Zone-B", "Cucumbers"),
            ("Zone-C", "Peppers"),
            ("Zone-D", "Lettuce"),
            ("Zone-E", "Herbs"),
        ]
        .into_iter()
        .map(|(zone, crop)| (zone.to_string(), crop.to_string()))
        .collect();

        let crops = [
            ("Tomatoes", (21.0, 27.0), (65.0, 80.0)),
            ("Cucumbers", (23.0, 28.0), (70.0, 85.0)),
            ("Peppers", (22.0, 26.0), (65.0, 75.0)),
            ("Lettuce", (15.0, 22.0), (60.0, 70.0)),
            ("Herbs", (18.0, 24.0), (55.0, 70.0)),
        ]
        .into_iter()
        .map(|(crop, (t_min, t_max), (h_min, h_max))| {
            (
                crop.to_string(),
                CropRanges {
                    temp_range: Range::new(t_min, t_max),
                    humidity_range: Range::new(h_min, h_max),
                },
            )
        })
        .collect();

        Self {
            polling: PollingConfig::default(),
            control: ControlConfig::default(),
            reporting: ReportingConfig::default(),
            light: LightConfig::default(),
            irrigation: IrrigationConfig::default(),
            server: ServerConfig::default(),
            logging: LoggingConfig::default(),
            runtime: RuntimeConfig::default(),
            zones,
            crops,
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            climate_seconds: 5,
            irrigation_seconds: 20,
            light_seconds: 30,
            pest_seconds: 30,
            sensor_update_seconds: 10,
        }
    }
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            temperature_buffer: 2.0,
            humidity_buffer: 5.0,
            shutoff_policy: ShutoffPolicy::OuterBoundOnly,
            stale_after_seconds: 60,
        }
    }
}

impl Default for ReportingConfig {
    fn default() -> Self {
        Self {
            window_seconds: 60,
            report_timeout_seconds: 5,
            pause_millis: 100,
            archive_dir: None,
        }
    }
}

impl Default for LightConfig {
    fn default() -> Self {
        Self { low_lux: 300, high_lux: 700 }
    }
}

impl Default for IrrigationConfig {
    fn default() -> Self {
        let thresholds = [
            ("Tomatoes", 45.0),
            ("Cucumbers", 50.0),
            ("Peppers", 40.0),
            ("Lettuce", 55.0),
            ("Herbs", 35.0),
        ]
        .into_iter()
        .map(|(crop, min)| (crop.to_string(), min))
        .collect();

        Self { thresholds, default_threshold: 40.0 }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { enabled: true, bind: "0.0.0.0:3000".to_string() }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), show_sensor_data: true }
    }
}
