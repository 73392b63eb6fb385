//! Configuration validation functionality.
//!
//! Rejects configurations the engine cannot run safely: missing or duplicated
//! segment outputs, timing values outside their limits, impossible coordinates
//! and motion inputs that collide with a segment.

use anyhow::{Context, Result};
use chrono::NaiveTime;
use std::collections::HashSet;

use super::Config;
use crate::common::constants::*;
use crate::core::OperatingMode;

/// Validate every key that was set. Missing keys use defaults that are always valid.
pub fn validate_config(config: &Config) -> Result<()> {
    if let Some(segments) = &config.segments {
        validate_segments(segments)?;
    }

    validate_range(
        config.step_delay,
        "step_delay",
        MINIMUM_STEP_DELAY,
        MAXIMUM_STEP_DELAY,
    )?;
    validate_range(
        config.hold_duration,
        "hold_duration",
        MINIMUM_HOLD_DURATION,
        MAXIMUM_HOLD_DURATION,
    )?;
    validate_range(
        config.poll_interval,
        "poll_interval",
        MINIMUM_POLL_INTERVAL,
        MAXIMUM_POLL_INTERVAL,
    )?;
    validate_range(
        config.diagnostic_step_delay,
        "diagnostic_step_delay",
        MINIMUM_STEP_DELAY,
        MAXIMUM_STEP_DELAY,
    )?;
    validate_range(
        config.motion_poll_interval,
        "motion_poll_interval",
        MINIMUM_MOTION_POLL_INTERVAL,
        MAXIMUM_MOTION_POLL_INTERVAL,
    )?;

    if let Some(lat) = config.latitude
        && !(-90.0..=90.0).contains(&lat)
    {
        anyhow::bail!("latitude must be between -90 and 90 degrees (got {})", lat);
    }

    if let Some(lon) = config.longitude
        && !(-180.0..=180.0).contains(&lon)
    {
        anyhow::bail!(
            "longitude must be between -180 and 180 degrees (got {})",
            lon
        );
    }

    if let Some(mode) = &config.startup_mode {
        OperatingMode::parse(mode).context("Invalid startup_mode")?;
    }

    if let Some(cutoff) = &config.cutoff {
        parse_cutoff(cutoff)?;
    }

    if let Some(sources) = &config.motion {
        let mut locations = HashSet::new();
        let mut pins = HashSet::new();
        for source in sources {
            if !locations.insert(source.location) {
                anyhow::bail!(
                    "Only one motion sensor may be configured for location '{}'",
                    source.location
                );
            }
            if !pins.insert(source.pin) {
                anyhow::bail!("Motion pin {} is configured more than once", source.pin);
            }
        }
    }

    // Effective values: a default sensor pin may still clash with a custom segment list
    let segments = config.segments();
    for source in config.motion_sources() {
        if segments.contains(&source.pin) {
            anyhow::bail!(
                "Motion pin {} ({}) is also listed in segments",
                source.pin,
                source.location
            );
        }
    }

    Ok(())
}

fn validate_segments(segments: &[u32]) -> Result<()> {
    if segments.is_empty() {
        anyhow::bail!("segments must list at least one GPIO pin");
    }

    if segments.len() > MAXIMUM_SEGMENTS {
        anyhow::bail!(
            "segments lists {} pins, at most {} are supported",
            segments.len(),
            MAXIMUM_SEGMENTS
        );
    }

    let mut seen = HashSet::new();
    for pin in segments {
        if !seen.insert(pin) {
            anyhow::bail!("segments lists GPIO {} more than once", pin);
        }
    }

    Ok(())
}

fn validate_range(value: Option<u64>, key: &str, min: u64, max: u64) -> Result<()> {
    if let Some(ms) = value
        && !(min..=max).contains(&ms)
    {
        anyhow::bail!(
            "{} ({} ms) must be between {} and {} milliseconds",
            key,
            ms,
            min,
            max
        );
    }
    Ok(())
}

/// Parse a cutoff time given as `HH:MM` or `HH:MM:SS`.
pub fn parse_cutoff(value: &str) -> Result<NaiveTime> {
    let trimmed = value.trim();
    NaiveTime::parse_from_str(trimmed, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M:%S"))
        .with_context(|| format!("Invalid cutoff time '{}' (expected HH:MM)", value))
}
