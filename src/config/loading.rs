//! Configuration loading functionality.
//!
//! Resolves the configuration path, writes the default file on first run and
//! parses + validates the TOML content.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use super::Config;
use super::validation::validate_config;
use crate::common::constants::*;

/// Global configuration directory, set once at startup
static CONFIG_DIR: OnceLock<Option<PathBuf>> = OnceLock::new();

/// Set the configuration directory for the current process.
/// This can only be called once, typically at startup.
pub fn set_config_dir(dir: Option<String>) -> Result<()> {
    CONFIG_DIR
        .set(dir.map(PathBuf::from))
        .map_err(|_| anyhow::anyhow!("Configuration directory already set"))
}

/// Get the custom configuration directory if one was set.
pub fn get_custom_config_dir() -> Option<PathBuf> {
    CONFIG_DIR.get().and_then(|d| d.clone())
}

/// Get the configuration file path.
pub fn get_config_path() -> Result<PathBuf> {
    if let Some(custom_dir) = get_custom_config_dir() {
        return Ok(custom_dir.join(CONFIG_FILE_NAME));
    }

    let config_dir = dirs::config_dir().context("Could not determine config directory")?;
    Ok(config_dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Load configuration using automatic path detection.
///
/// Creates a default configuration file if none exists.
pub fn load() -> Result<Config> {
    let config_path = get_config_path()?;

    if !config_path.exists() {
        create_default_config(&config_path)
            .context("Failed to create default config during load")?;
        log_block_start!("Created default configuration");
        log_indented!("{}", config_path.display());
    }

    load_from_path(&config_path)
        .with_context(|| format!("Failed to load configuration from {}", config_path.display()))
}

/// Load configuration from a specific path.
///
/// Does not create a default config if the path doesn't exist.
pub fn load_from_path(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config from {}", path.display()))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config from {}", path.display()))?;

    validate_config(&config)?;

    Ok(config)
}

/// Write the commented default configuration to `path`.
pub fn create_default_config(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config directory {}", parent.display()))?;
    }

    fs::write(path, default_config_content())
        .with_context(|| format!("Failed to write default config to {}", path.display()))
}

fn default_config_content() -> String {
    let segments = DEFAULT_SEGMENTS
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        r#"#[Segments]
segments = [{segments}] # GPIO per tread, bottom to top
active_low = {DEFAULT_ACTIVE_LOW}        # Relay boards switch on a low level
driver = "sysfs"         # "sysfs" or "simulated" (log only)
gpio_root = "{DEFAULT_GPIO_ROOT}"

#[Timing]
step_delay = {DEFAULT_STEP_DELAY}          # Delay between treads ({MINIMUM_STEP_DELAY}-{MAXIMUM_STEP_DELAY}) ms
hold_duration = {DEFAULT_HOLD_DURATION}     # Time fully lit before switching off ({MINIMUM_HOLD_DURATION}-{MAXIMUM_HOLD_DURATION}) ms
poll_interval = {DEFAULT_POLL_INTERVAL}     # Day/night re-evaluation ({MINIMUM_POLL_INTERVAL}-{MAXIMUM_POLL_INTERVAL}) ms
diagnostic_step_delay = {DEFAULT_DIAGNOSTIC_STEP_DELAY} # Delay between treads for `stairlight test` ms
motion_poll_interval = {DEFAULT_MOTION_POLL_INTERVAL}     # Sensor read interval ({MINIMUM_MOTION_POLL_INTERVAL}-{MAXIMUM_MOTION_POLL_INTERVAL}) ms

#[Daylight]
latitude = {DEFAULT_LATITUDE:?}
longitude = {DEFAULT_LONGITUDE:?}
cutoff = "{DEFAULT_CUTOFF}"        # "dark-then-motion" stops holding at this time
startup_mode = "{DEFAULT_STARTUP_MODE}"
# Modes: off, motion, motion-when-dark, always-on, always-on-when-dark,
#        dark-then-motion, diagnostic

#[Motion sensors]
[[motion]]
location = "top"
pin = {DEFAULT_TOP_MOTION_PIN}

[[motion]]
location = "bottom"
pin = {DEFAULT_BOTTOM_MOTION_PIN}
"#
    )
}
