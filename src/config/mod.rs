//! Configuration system for stairlight.
//!
//! Configuration is read once at startup from `stairlight.toml`:
//!
//! 1. **`--config DIR`**: `DIR/stairlight.toml`
//! 2. **XDG_CONFIG_HOME**/stairlight/stairlight.toml otherwise
//!
//! A commented default file is written on first run. Every key is optional;
//! missing keys fall back to the defaults in [`crate::common::constants`].
//!
//! ```toml
//! #[Segments]
//! segments = [17, 18, 27, 22]   # GPIO per tread, bottom to top
//! active_low = true             # Relay boards switch on a low level
//! driver = "sysfs"              # "sysfs" or "simulated"
//!
//! #[Timing]
//! step_delay = 250              # Delay between treads (1-60000) ms
//! hold_duration = 20000         # Time fully lit before switching off (1-3600000) ms
//! poll_interval = 60000         # Day/night re-evaluation (1000-3600000) ms
//!
//! #[Daylight]
//! latitude = 51.5
//! longitude = -0.1
//! cutoff = "23:00"              # Hybrid mode stops holding at this time
//! startup_mode = "motion-when-dark"
//!
//! [[motion]]
//! location = "top"
//! pin = 21
//! ```
//!
//! Out-of-range or malformed values are fatal: see [`validation`].

pub mod loading;
pub mod validation;

#[cfg(test)]
mod tests;

use anyhow::{Context, Result};
use chrono::NaiveTime;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::common::constants::*;
use crate::core::{MotionLocation, OperatingMode};

// Re-export public API
pub use loading::{
    create_default_config, get_config_path, get_custom_config_dir, load, load_from_path,
    set_config_dir,
};

/// Segment driver selection.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DriverKind {
    /// Linux sysfs GPIO
    #[default]
    Sysfs,
    /// Log-only driver for machines without GPIO
    Simulated,
}

impl DriverKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DriverKind::Sysfs => "sysfs",
            DriverKind::Simulated => "simulated",
        }
    }
}

/// One `[[motion]]` table.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct MotionSourceConfig {
    pub location: MotionLocation,
    pub pin: u32,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub segments: Option<Vec<u32>>,
    pub active_low: Option<bool>,
    pub driver: Option<DriverKind>,
    pub gpio_root: Option<PathBuf>,
    pub step_delay: Option<u64>,            // milliseconds between treads
    pub hold_duration: Option<u64>,         // milliseconds fully lit
    pub poll_interval: Option<u64>,         // milliseconds between day/night ticks
    pub diagnostic_step_delay: Option<u64>, // milliseconds between treads in test sweeps
    pub motion_poll_interval: Option<u64>,  // milliseconds between sensor reads
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub startup_mode: Option<String>,
    pub cutoff: Option<String>, // "HH:MM"
    pub motion: Option<Vec<MotionSourceConfig>>,
}

impl Config {
    pub fn load() -> Result<Self> {
        load()
    }

    pub fn segments(&self) -> Vec<u32> {
        self.segments
            .clone()
            .unwrap_or_else(|| DEFAULT_SEGMENTS.to_vec())
    }

    pub fn active_low(&self) -> bool {
        self.active_low.unwrap_or(DEFAULT_ACTIVE_LOW)
    }

    pub fn driver(&self) -> DriverKind {
        self.driver.unwrap_or_default()
    }

    pub fn gpio_root(&self) -> PathBuf {
        self.gpio_root
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_GPIO_ROOT))
    }

    pub fn step_delay(&self) -> Duration {
        Duration::from_millis(self.step_delay.unwrap_or(DEFAULT_STEP_DELAY))
    }

    pub fn hold_duration(&self) -> Duration {
        Duration::from_millis(self.hold_duration.unwrap_or(DEFAULT_HOLD_DURATION))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval.unwrap_or(DEFAULT_POLL_INTERVAL))
    }

    pub fn diagnostic_step_delay(&self) -> Duration {
        Duration::from_millis(
            self.diagnostic_step_delay
                .unwrap_or(DEFAULT_DIAGNOSTIC_STEP_DELAY),
        )
    }

    pub fn motion_poll_interval(&self) -> Duration {
        Duration::from_millis(
            self.motion_poll_interval
                .unwrap_or(DEFAULT_MOTION_POLL_INTERVAL),
        )
    }

    pub fn latitude(&self) -> f64 {
        self.latitude.unwrap_or(DEFAULT_LATITUDE)
    }

    pub fn longitude(&self) -> f64 {
        self.longitude.unwrap_or(DEFAULT_LONGITUDE)
    }

    pub fn startup_mode(&self) -> Result<OperatingMode> {
        let requested = self.startup_mode.as_deref().unwrap_or(DEFAULT_STARTUP_MODE);
        OperatingMode::parse(requested).context("Invalid startup_mode")
    }

    pub fn cutoff(&self) -> Result<NaiveTime> {
        validation::parse_cutoff(self.cutoff.as_deref().unwrap_or(DEFAULT_CUTOFF))
    }

    /// Configured sensors; both default pins when no `[[motion]]` table is given.
    pub fn motion_sources(&self) -> Vec<MotionSourceConfig> {
        self.motion.clone().unwrap_or_else(|| {
            vec![
                MotionSourceConfig {
                    location: MotionLocation::Top,
                    pin: DEFAULT_TOP_MOTION_PIN,
                },
                MotionSourceConfig {
                    location: MotionLocation::Bottom,
                    pin: DEFAULT_BOTTOM_MOTION_PIN,
                },
            ]
        })
    }

    pub fn log_config(&self) {
        log_block_start!("Loaded configuration");
        if let Some(custom_dir) = get_custom_config_dir() {
            log_indented!("Config directory: {}", custom_dir.display());
        }

        let segments = self.segments();
        log_indented!(
            "Segments: {} ({}, active {})",
            segments.len(),
            segments
                .iter()
                .map(u32::to_string)
                .collect::<Vec<_>>()
                .join(", "),
            if self.active_low() { "low" } else { "high" }
        );
        log_indented!("Driver: {}", self.driver().as_str());
        log_indented!(
            "Sweep: {}ms steps, {}s hold",
            self.step_delay().as_millis(),
            self.hold_duration().as_secs()
        );

        let lat = self.latitude();
        let lon = self.longitude();
        log_indented!(
            "Location: {:.3}°{}, {:.3}°{}",
            lat.abs(),
            if lat >= 0.0 { "N" } else { "S" },
            lon.abs(),
            if lon >= 0.0 { "E" } else { "W" }
        );
        log_indented!(
            "Cutoff: {}",
            self.cutoff.as_deref().unwrap_or(DEFAULT_CUTOFF)
        );

        let sources = self.motion_sources();
        if sources.is_empty() {
            log_indented!("Motion sensors: none");
        }
        for source in sources {
            log_indented!("Motion sensor: {} on GPIO {}", source.location, source.pin);
        }
    }
}
