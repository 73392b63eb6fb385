//! Implementation of the simulate command for observing day/night behaviour.
//!
//! Sets up a simulated wall clock so the scheduler can be watched across a
//! whole night in a few seconds. The daemon then runs as usual but with the
//! log-only segment driver, no motion inputs and no control socket.

use anyhow::Result;
use std::sync::Arc;

use crate::common::constants::DEFAULT_SIMULATION_MULTIPLIER;
use crate::time_source::{self, SimulatedTimeSource};

/// Prepare the simulated clock and install it as the global time source.
///
/// # Arguments
/// * `start_time` - Start time in format "YYYY-MM-DD HH:MM:SS"
/// * `end_time` - End time in format "YYYY-MM-DD HH:MM:SS"
/// * `multiplier` - Time acceleration factor (0 = default)
pub fn handle_simulate_command(
    start_time: &str,
    end_time: &str,
    multiplier: f64,
    debug_enabled: bool,
) -> Result<Arc<SimulatedTimeSource>> {
    let start = time_source::parse_datetime(start_time)
        .map_err(|e| anyhow::anyhow!("Invalid start time: {}", e))?;
    let end = time_source::parse_datetime(end_time)
        .map_err(|e| anyhow::anyhow!("Invalid end time: {}", e))?;

    if end <= start {
        anyhow::bail!("End time must be after start time");
    }

    let source = Arc::new(SimulatedTimeSource::new(start, end, multiplier));
    // Install before any logging so every line carries the simulated timestamp
    time_source::init_time_source(source.clone());

    log_version!();
    log_block_start!("Simulation Mode");

    let duration = end.signed_duration_since(start);
    log_decorated!(
        "Simulating from {} to {}",
        start.format("%Y-%m-%d %H:%M:%S"),
        end.format("%Y-%m-%d %H:%M:%S")
    );
    log_indented!(
        "Total simulated time: {} hours {} minutes",
        duration.num_hours(),
        duration.num_minutes() % 60
    );

    let actual_multiplier = source.multiplier();
    let real_duration_secs = duration.num_seconds() as f64 / actual_multiplier;
    log_indented!(
        "Time acceleration: {}x (will complete in ~{:.1} seconds)",
        actual_multiplier as u64,
        real_duration_secs
    );
    if multiplier <= 0.0 && debug_enabled {
        log_pipe!();
        log_debug!(
            "Using default acceleration of {}x",
            DEFAULT_SIMULATION_MULTIPLIER as u64
        );
    }
    log_indented!("Segments are simulated and motion sensors are not read");

    Ok(source)
}
